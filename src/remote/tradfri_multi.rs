// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IKEA Tradfri remote cycling through several lights and templates.

use super::binding::{LightDeviceBinding, cycle};
use super::{Effect, RemoteEvent, RemoteHandler};
use crate::state::LightState;
use crate::types::Provenance;

/// Tradfri remote driving a list of [`LightDeviceBinding`]s.
///
/// Actions apply to the binding selected by the device cursor:
///
/// - `toggle`: `off_state` if the light matches `on_state`, else `on_state`
/// - `brightness_up_click` / `brightness_down_click`: ±1/10 of the maximum
/// - `brightness_up_hold`: 1/3 of the maximum if below it, else the maximum
/// - `brightness_down_hold`: 1/3 of the maximum if above it, else near zero
/// - `arrow_right_click` / `arrow_left_click`: next / previous template
/// - `arrow_left_hold`: first template
/// - `toggle_hold`: select the next light, without sending anything
#[derive(Debug, Clone)]
pub struct TradfriMultiRemote {
    bindings: Vec<LightDeviceBinding>,
    template_indices: Vec<usize>,
    device_index: usize,
}

impl TradfriMultiRemote {
    /// Creates a remote for the given bindings.
    #[must_use]
    pub fn new(bindings: Vec<LightDeviceBinding>) -> Self {
        Self {
            template_indices: vec![0; bindings.len()],
            bindings,
            device_index: 0,
        }
    }

    /// Returns the index of the selected light.
    #[must_use]
    pub fn device_index(&self) -> usize {
        self.device_index
    }

    /// Returns the template cursor of a binding.
    #[must_use]
    pub fn template_index(&self, binding: usize) -> Option<usize> {
        self.template_indices.get(binding).copied()
    }

    fn cycle_template(&mut self, binding: usize, forward: Option<bool>) -> Option<LightState> {
        let light = self.bindings.get(binding)?;
        let index = self.template_indices.get_mut(binding)?;
        *index = match forward {
            Some(forward) => cycle(*index, light.templates.len(), forward),
            None => 0,
        };
        tracing::debug!(record = %light.record, template_index = *index, "Selecting template");
        Some(light.template_command(*index))
    }
}

/// Brightness value of a non-zero near-off level.
fn near_zero(max: f64) -> f64 {
    (max * 0.02).round().max(1.0)
}

impl RemoteHandler for TradfriMultiRemote {
    fn lights(&self) -> Vec<String> {
        self.bindings.iter().map(|b| b.record.clone()).collect()
    }

    fn select(&self, _event: &RemoteEvent) -> Option<usize> {
        (self.device_index < self.bindings.len()).then_some(self.device_index)
    }

    fn handle(&mut self, binding: usize, event: &RemoteEvent, current: &LightState) -> Vec<Effect> {
        let Some(light) = self.bindings.get(binding) else {
            return Vec::new();
        };
        let max = light.brightness.max();
        let brightness = light.current_brightness(current);
        let third = max / 3.0;

        let command = match event.action() {
            "toggle" => Some(if light.is_on(current) {
                light.off_state.clone()
            } else {
                light.on_state.clone()
            }),
            "brightness_up_click" => {
                Some(light.brightness_command((brightness + max / 10.0).min(max)))
            }
            "brightness_down_click" => {
                Some(light.brightness_command((brightness - max / 10.0).max(0.0)))
            }
            "brightness_up_hold" => {
                let value = if brightness < third { third } else { max };
                Some(light.brightness_command(value))
            }
            "brightness_down_hold" => {
                let value = if brightness > third { third } else { near_zero(max) };
                Some(light.brightness_command(value))
            }
            "arrow_right_click" => self.cycle_template(binding, Some(true)),
            "arrow_left_click" => self.cycle_template(binding, Some(false)),
            "arrow_left_hold" => self.cycle_template(binding, None),
            "toggle_hold" => {
                self.device_index = cycle(self.device_index, self.bindings.len(), true);
                tracing::debug!(
                    device_index = self.device_index,
                    record = %self.bindings[self.device_index].record,
                    "Selecting next light"
                );
                None
            }
            other => {
                tracing::debug!(action = %other, "Ignoring remote action");
                None
            }
        };

        let Some(command) = command else {
            return Vec::new();
        };
        let light = &self.bindings[binding];
        let command = light.finish(command).with_provenance(Provenance::Control);
        vec![Effect::merge(binding, command)]
    }
}
