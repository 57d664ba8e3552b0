// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! RGB color type with HSV conversion.
//!
//! zigbee2mqtt encodes RGB colors as `{"r": 255, "g": 147, "b": 41}`. The
//! continuous-move remote adjusts hue and saturation of such colors, which
//! goes through [`Hsv`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// RGB color with 8-bit channels (0-255).
///
/// # Examples
///
/// ```
/// use light_bridge::types::RgbColor;
///
/// let candle = RgbColor::new(255, 147, 41);
/// assert_eq!(candle.to_string(), "#FF9329");
///
/// let hsv = RgbColor::new(255, 0, 0).to_hsv();
/// assert_eq!(hsv.hue, 0.0);
/// assert_eq!(hsv.saturation, 1.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RgbColor {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

/// HSV color with floating point components.
///
/// `hue` is in degrees (0-360), `saturation` and `value` are fractions (0-1).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Hsv {
    /// Hue in degrees.
    pub hue: f64,
    /// Saturation fraction.
    pub saturation: f64,
    /// Value (brightness) fraction.
    pub value: f64,
}

impl RgbColor {
    /// Creates a new RGB color.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Creates a white color.
    #[must_use]
    pub const fn white() -> Self {
        Self::new(255, 255, 255)
    }

    /// Parses `#RRGGBB` or `#RGB` (the `#` is optional).
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidHexColor` for any other input.
    pub fn from_hex(hex: &str) -> Result<Self, ValueError> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        let invalid = || ValueError::InvalidHexColor(hex.to_string());
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16).map_err(|_| invalid())
        };
        match digits.len() {
            6 => Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
            3 => Ok(Self::new(
                channel(0..1)? * 17,
                channel(1..2)? * 17,
                channel(2..3)? * 17,
            )),
            _ => Err(invalid()),
        }
    }

    /// Converts this color to HSV.
    #[must_use]
    pub fn to_hsv(&self) -> Hsv {
        rgb_to_hsv(self.r, self.g, self.b)
    }

    /// Creates an RGB color from HSV components.
    ///
    /// Out-of-range inputs are wrapped (hue) or clamped (saturation, value).
    #[must_use]
    pub fn from_hsv(hsv: Hsv) -> Self {
        let (r, g, b) = hsv_to_rgb(hsv.hue, hsv.saturation, hsv.value);
        Self::new(r, g, b)
    }
}

impl Hsv {
    /// Creates a new HSV color.
    #[must_use]
    pub const fn new(hue: f64, saturation: f64, value: f64) -> Self {
        Self {
            hue,
            saturation,
            value,
        }
    }

    /// Returns a copy with a different hue.
    #[must_use]
    pub const fn with_hue(self, hue: f64) -> Self {
        Self { hue, ..self }
    }

    /// Returns a copy with a different saturation.
    #[must_use]
    pub const fn with_saturation(self, saturation: f64) -> Self {
        Self { saturation, ..self }
    }
}

impl fmt::Display for RgbColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl FromStr for RgbColor {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<(u8, u8, u8)> for RgbColor {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Self::new(r, g, b)
    }
}

impl From<RgbColor> for serde_json::Value {
    fn from(color: RgbColor) -> Self {
        serde_json::json!({ "r": color.r, "g": color.g, "b": color.b })
    }
}

#[allow(clippy::many_single_char_names)]
fn rgb_to_hsv(r: u8, g: u8, b: u8) -> Hsv {
    let r = f64::from(r) / 255.0;
    let g = f64::from(g) / 255.0;
    let b = f64::from(b) / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let saturation = if max == 0.0 { 0.0 } else { delta / max };

    let hue = if delta < f64::EPSILON {
        0.0
    } else if (max - r).abs() < f64::EPSILON {
        (60.0 * ((g - b) / delta)).rem_euclid(360.0)
    } else if (max - g).abs() < f64::EPSILON {
        60.0 * (((b - r) / delta) + 2.0)
    } else {
        60.0 * (((r - g) / delta) + 4.0)
    };

    Hsv::new(hue, saturation, max)
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::many_single_char_names
)]
fn hsv_to_rgb(h: f64, s: f64, v: f64) -> (u8, u8, u8) {
    let h = h.rem_euclid(360.0);
    let s = s.clamp(0.0, 1.0);
    let v = v.clamp(0.0, 1.0);

    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = if h < 60.0 {
        (c, x, 0.0)
    } else if h < 120.0 {
        (x, c, 0.0)
    } else if h < 180.0 {
        (0.0, c, x)
    } else if h < 240.0 {
        (0.0, x, c)
    } else if h < 300.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };

    (
        ((r + m) * 255.0).round() as u8,
        ((g + m) * 255.0).round() as u8,
        ((b + m) * 255.0).round() as u8,
    )
}
