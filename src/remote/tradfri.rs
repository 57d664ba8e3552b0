// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IKEA Tradfri remote controlling a single light.

use super::binding::{cycle, level};
use super::templates::{color_reset, default_presets};
use super::{Effect, RemoteEvent, RemoteHandler};
use crate::state::LightState;
use crate::types::{PowerState, Provenance};

const MAX_BRIGHTNESS: f64 = 255.0;
const MIN_BRIGHTNESS: f64 = 5.0;
const BRIGHTNESS_STEP: f64 = 25.0;
const HOLD_LEVEL: f64 = 80.0;
const TRANSITION: f64 = 0.2;

/// Tradfri remote for one light.
///
/// | Action | Command |
/// |---|---|
/// | `toggle` | flip `state` (absent counts as `OFF`) |
/// | `brightness_up_click` / `brightness_down_click` | brightness ±25 within 5..=255 |
/// | `brightness_up_hold` | 80 if below 80, else 255 |
/// | `brightness_down_hold` | 80 if above 80, else 5 |
/// | `arrow_right_click` / `arrow_left_click` | next / previous color preset |
/// | `arrow_left_hold` | first color preset |
///
/// Every command carries `transition: 0.2` unless it sets one, and is tagged
/// as coming from a control.
#[derive(Debug, Clone)]
pub struct TradfriRemote {
    light: String,
    presets: Vec<LightState>,
    color_index: usize,
}

impl TradfriRemote {
    /// Creates a remote cycling the default color presets.
    #[must_use]
    pub fn new(light: impl Into<String>) -> Self {
        Self::with_presets(light, default_presets())
    }

    /// Creates a remote cycling the given presets.
    #[must_use]
    pub fn with_presets(light: impl Into<String>, presets: Vec<LightState>) -> Self {
        Self {
            light: light.into(),
            presets,
            color_index: 0,
        }
    }

    /// Returns the index of the current color preset.
    #[must_use]
    pub fn color_index(&self) -> usize {
        self.color_index
    }

    fn command(command: &LightState) -> LightState {
        LightState::new()
            .with("transition", TRANSITION)
            .overlaid(command)
            .with_provenance(Provenance::Control)
    }

    fn preset_effects(&self, binding: usize) -> Vec<Effect> {
        tracing::debug!(color_index = self.color_index, "Selecting color preset");
        self.presets
            .get(self.color_index)
            .map(|preset| Effect::merge(binding, Self::command(&color_reset().overlaid(preset))))
            .into_iter()
            .collect()
    }
}

impl RemoteHandler for TradfriRemote {
    fn lights(&self) -> Vec<String> {
        vec![self.light.clone()]
    }

    fn select(&self, _event: &RemoteEvent) -> Option<usize> {
        Some(0)
    }

    fn handle(&mut self, binding: usize, event: &RemoteEvent, current: &LightState) -> Vec<Effect> {
        let brightness = current.brightness().unwrap_or(MAX_BRIGHTNESS);
        let command = match event.action() {
            "toggle" => {
                let state = current.power().unwrap_or(PowerState::Off).toggled();
                Some(LightState::new().with("state", state.as_str()))
            }
            "brightness_up_click" => {
                let value = (brightness + BRIGHTNESS_STEP).min(MAX_BRIGHTNESS);
                Some(LightState::new().with("brightness", level(value)))
            }
            "brightness_down_click" => {
                let value = (brightness - BRIGHTNESS_STEP).max(MIN_BRIGHTNESS);
                Some(LightState::new().with("brightness", level(value)))
            }
            "brightness_up_hold" => {
                let value = if brightness < HOLD_LEVEL { HOLD_LEVEL } else { MAX_BRIGHTNESS };
                Some(LightState::new().with("brightness", level(value)))
            }
            "brightness_down_hold" => {
                let value = if brightness > HOLD_LEVEL { HOLD_LEVEL } else { MIN_BRIGHTNESS };
                Some(LightState::new().with("brightness", level(value)))
            }
            "arrow_left_click" => {
                self.color_index = cycle(self.color_index, self.presets.len(), false);
                return self.preset_effects(binding);
            }
            "arrow_right_click" => {
                self.color_index = cycle(self.color_index, self.presets.len(), true);
                return self.preset_effects(binding);
            }
            "arrow_left_hold" => {
                self.color_index = 0;
                return self.preset_effects(binding);
            }
            other => {
                tracing::debug!(action = %other, "Ignoring remote action");
                None
            }
        };
        command
            .map(|command| Effect::merge(binding, Self::command(&command)))
            .into_iter()
            .collect()
    }
}
