// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-light-family command strategies for the continuous-move remote.
//!
//! A [`LightStrategy`] turns an abstract control operation ("one step
//! brighter", "saturation 40%") into a patch for one kind of light. Every
//! method takes the current state and returns the patch to write.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::binding::level;
use crate::state::LightState;
use crate::types::{Hsv, PowerState, RgbColor};

/// Command strategy of one light family.
pub trait LightStrategy: fmt::Debug + Send + Sync {
    /// Switches the light on or off.
    fn set_on_off(&self, current: &LightState, on: bool) -> LightState;

    /// One brightness step up.
    fn increment_brightness(&self, current: &LightState) -> LightState;

    /// One brightness step down.
    fn decrement_brightness(&self, current: &LightState) -> LightState;

    /// Sets the brightness to a fraction (0-1) of the maximum.
    fn set_brightness_percent(&self, current: &LightState, brightness: f64) -> LightState;

    /// Switches to white and sets the color temperature fraction (0 cold, 1 warm).
    fn set_color_temp_percent(&self, current: &LightState, color_temp: f64) -> LightState;

    /// Switches to color and sets the hue in degrees.
    fn set_hue(&self, current: &LightState, hue: f64) -> LightState;

    /// Sets the color saturation fraction (0-1).
    fn set_saturation(&self, current: &LightState, saturation: f64) -> LightState;
}

/// Built-in strategies selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Zigbee color bulbs driven through zigbee2mqtt's hue/saturation and
    /// `color_temp_percent` fields.
    #[default]
    ZigbeeColor,
    /// RGB strips that only understand an RGB `color`.
    RgbStrip,
}

impl StrategyKind {
    /// Instantiates the strategy with default parameters.
    #[must_use]
    pub fn build(self) -> Arc<dyn LightStrategy> {
        match self {
            Self::ZigbeeColor => Arc::new(ZigbeeColorLight::default()),
            Self::RgbStrip => Arc::new(RgbStrip::default()),
        }
    }
}

fn power(on: bool) -> LightState {
    LightState::new().with("state", PowerState::from(on).as_str())
}

fn step(current: &LightState, max: f64, delta: f64) -> LightState {
    let brightness = current.brightness().unwrap_or(max);
    LightState::new().with("brightness", level((brightness + delta).clamp(1.0, max)))
}

// ========== Zigbee color bulb ==========

/// Strategy for zigbee2mqtt color bulbs.
///
/// Colors are written as `{"hue", "saturation"}` (degrees and percent);
/// white is written as `color_temp_percent`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZigbeeColorLight {
    /// Maximum brightness.
    pub max_brightness: f64,
    /// Brightness change per move step.
    pub step: f64,
}

impl Default for ZigbeeColorLight {
    fn default() -> Self {
        Self {
            max_brightness: 254.0,
            step: 25.0,
        }
    }
}

impl ZigbeeColorLight {
    fn hue_saturation(current: &LightState) -> (Option<f64>, Option<f64>) {
        let color = current.get("color");
        let field = |name: &str| color.and_then(|c| c.get(name)).and_then(Value::as_f64);
        (field("hue"), field("saturation"))
    }

    fn color(hue: f64, saturation: f64) -> LightState {
        LightState::new()
            .with("color", json!({ "hue": hue, "saturation": saturation }))
            .with("color_temp", Value::Null)
            .with("color_temp_percent", Value::Null)
    }
}

impl LightStrategy for ZigbeeColorLight {
    fn set_on_off(&self, _current: &LightState, on: bool) -> LightState {
        power(on)
    }

    fn increment_brightness(&self, current: &LightState) -> LightState {
        step(current, self.max_brightness, self.step)
    }

    fn decrement_brightness(&self, current: &LightState) -> LightState {
        step(current, self.max_brightness, -self.step)
    }

    fn set_brightness_percent(&self, _current: &LightState, brightness: f64) -> LightState {
        LightState::new().with(
            "brightness",
            level(brightness.clamp(0.0, 1.0) * self.max_brightness),
        )
    }

    fn set_color_temp_percent(&self, _current: &LightState, color_temp: f64) -> LightState {
        LightState::new()
            .with("color_temp_percent", level(color_temp.clamp(0.0, 1.0) * 100.0))
            .with("color_temp", Value::Null)
            .with("color", Value::Null)
    }

    fn set_hue(&self, current: &LightState, hue: f64) -> LightState {
        let (_, saturation) = Self::hue_saturation(current);
        Self::color(hue.rem_euclid(360.0).round(), saturation.unwrap_or(100.0))
    }

    fn set_saturation(&self, current: &LightState, saturation: f64) -> LightState {
        let (hue, _) = Self::hue_saturation(current);
        Self::color(
            hue.unwrap_or(0.0),
            (saturation.clamp(0.0, 1.0) * 100.0).round(),
        )
    }
}

// ========== RGB strip ==========

/// Strategy for RGB strips.
///
/// Hue and saturation changes are applied to the current RGB color through
/// HSV; white is approximated by blending cold and warm white.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RgbStrip {
    /// Maximum brightness.
    pub max_brightness: f64,
    /// Brightness change per move step.
    pub step: f64,
    /// Color used for `color_temp_percent` 0.
    pub cold_white: RgbColor,
    /// Color used for `color_temp_percent` 1.
    pub warm_white: RgbColor,
}

impl Default for RgbStrip {
    fn default() -> Self {
        Self {
            max_brightness: 255.0,
            step: 25.0,
            cold_white: RgbColor::white(),
            warm_white: RgbColor::new(255, 147, 41),
        }
    }
}

impl RgbStrip {
    fn current_hsv(current: &LightState) -> Hsv {
        current.color().unwrap_or_else(RgbColor::white).to_hsv()
    }

    fn color(hsv: Hsv) -> LightState {
        LightState::new().with("color", RgbColor::from_hsv(hsv))
    }
}

impl LightStrategy for RgbStrip {
    fn set_on_off(&self, _current: &LightState, on: bool) -> LightState {
        power(on)
    }

    fn increment_brightness(&self, current: &LightState) -> LightState {
        step(current, self.max_brightness, self.step)
    }

    fn decrement_brightness(&self, current: &LightState) -> LightState {
        step(current, self.max_brightness, -self.step)
    }

    fn set_brightness_percent(&self, _current: &LightState, brightness: f64) -> LightState {
        LightState::new().with(
            "brightness",
            level(brightness.clamp(0.0, 1.0) * self.max_brightness),
        )
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn set_color_temp_percent(&self, _current: &LightState, color_temp: f64) -> LightState {
        let t = color_temp.clamp(0.0, 1.0);
        let blend = |cold: u8, warm: u8| {
            (f64::from(cold) + (f64::from(warm) - f64::from(cold)) * t).round() as u8
        };
        let color = RgbColor::new(
            blend(self.cold_white.r, self.warm_white.r),
            blend(self.cold_white.g, self.warm_white.g),
            blend(self.cold_white.b, self.warm_white.b),
        );
        LightState::new().with("color", color)
    }

    fn set_hue(&self, current: &LightState, hue: f64) -> LightState {
        let hsv = Self::current_hsv(current);
        // a grey or black color has no visible hue
        let saturation = if hsv.saturation > 0.0 { hsv.saturation } else { 1.0 };
        let value = if hsv.value > 0.0 { hsv.value } else { 1.0 };
        Self::color(Hsv::new(hue, saturation, value))
    }

    fn set_saturation(&self, current: &LightState, saturation: f64) -> LightState {
        Self::color(Self::current_hsv(current).with_saturation(saturation.clamp(0.0, 1.0)))
    }
}
