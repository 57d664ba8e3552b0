// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Built-in color presets.
//!
//! These are the defaults for remotes configured without presets. They are
//! plain data: the configuration can replace them with any list of partial
//! light states.

use serde_json::Value;

use crate::state::LightState;
use crate::types::RgbColor;

/// Fields of the color family. A light keeps stale color fields unless they
/// are cleared, and color temperature and RGB color are mutually exclusive.
pub const COLOR_FIELDS: [&str; 3] = ["color", "color_temp", "color_temp_percent"];

/// White presets, as `color_temp_percent` (cold to warm is 0 to 100).
const WHITE_PRESETS: [u8; 3] = [100, 50, 0];

/// RGB presets.
const COLOR_PRESETS: [RgbColor; 9] = [
    RgbColor::new(255, 147, 41),  // candle
    RgbColor::new(255, 179, 102), // candle 2
    RgbColor::new(255, 134, 41),  // candle 3
    RgbColor::new(255, 117, 107), // apricot
    RgbColor::new(255, 216, 77),  // lemon
    RgbColor::new(97, 255, 121),  // gloom
    RgbColor::new(108, 148, 122), // green/gray
    RgbColor::new(191, 102, 255), // lilac
    RgbColor::new(64, 156, 255),  // blue sky
];

/// Returns the twelve default presets: three whites, then nine colors.
///
/// # Examples
///
/// ```
/// use light_bridge::remote::templates::default_presets;
///
/// let presets = default_presets();
/// assert_eq!(presets.len(), 12);
/// assert_eq!(presets[0].number("color_temp_percent"), Some(100.0));
/// ```
#[must_use]
pub fn default_presets() -> Vec<LightState> {
    let whites = WHITE_PRESETS
        .iter()
        .map(|percent| LightState::new().with("color_temp_percent", *percent));
    let colors = COLOR_PRESETS
        .iter()
        .map(|color| LightState::new().with("color", *color));
    whites.chain(colors).collect()
}

/// Returns a patch deleting every color-family field.
#[must_use]
pub fn color_reset() -> LightState {
    COLOR_FIELDS
        .iter()
        .map(|field| ((*field).to_string(), Value::Null))
        .collect()
}
