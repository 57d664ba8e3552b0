// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Binding of a remote to one light.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::state::LightState;
use crate::types::PowerState;

/// Brightness field descriptor of a light.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrightnessConfig {
    /// Name of the brightness field.
    #[serde(default = "default_brightness_property")]
    pub property: String,
    /// Maximum brightness value.
    pub steps: u32,
}

impl Default for BrightnessConfig {
    fn default() -> Self {
        Self {
            property: default_brightness_property(),
            steps: 255,
        }
    }
}

impl BrightnessConfig {
    /// Returns `steps` as a float.
    #[must_use]
    pub fn max(&self) -> f64 {
        f64::from(self.steps)
    }
}

fn default_brightness_property() -> String {
    "brightness".to_string()
}

fn default_transition_state() -> LightState {
    LightState::new().with("transition", 0.2)
}

fn default_no_transition_state() -> LightState {
    LightState::new().with("transition", 0)
}

/// One light a remote can control, with its canonical states and presets.
///
/// # Examples
///
/// ```
/// use light_bridge::remote::LightDeviceBinding;
/// use light_bridge::state::LightState;
///
/// let binding = LightDeviceBinding::new("light-control/devices/TV Light")
///     .template(LightState::new().with("color_temp_percent", 100))
///     .template(LightState::new().with("color_temp_percent", 0));
///
/// let on = LightState::new().with("state", "ON").with("brightness", 80);
/// assert!(binding.is_on(&on));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightDeviceBinding {
    /// Store path of the light; the remote reads `<record>/is` and writes
    /// `<record>/set`.
    pub record: String,
    /// Brightness field descriptor.
    #[serde(default)]
    pub brightness: BrightnessConfig,
    /// Canonical on state.
    pub on_state: LightState,
    /// Canonical off state.
    pub off_state: LightState,
    /// Transition fields the low-brightness guard looks for.
    #[serde(default = "default_transition_state")]
    pub transition_state: LightState,
    /// Fields replacing `transition_state` at low brightness.
    #[serde(default = "default_no_transition_state")]
    pub no_transition_state: LightState,
    /// Applied before a template to clear template-only fields.
    #[serde(default)]
    pub reset_template: Option<LightState>,
    /// Fields stamped on every command unless the command sets them.
    #[serde(default)]
    pub command_template: Option<LightState>,
    /// Presets cycled by the remote.
    pub templates: Vec<LightState>,
}

impl LightDeviceBinding {
    /// Creates a binding with `state: ON`/`state: OFF` canonical states and
    /// no templates.
    #[must_use]
    pub fn new(record: impl Into<String>) -> Self {
        Self {
            record: record.into(),
            brightness: BrightnessConfig::default(),
            on_state: LightState::new().with("state", PowerState::On.as_str()),
            off_state: LightState::new().with("state", PowerState::Off.as_str()),
            transition_state: default_transition_state(),
            no_transition_state: default_no_transition_state(),
            reset_template: None,
            command_template: None,
            templates: Vec::new(),
        }
    }

    /// Sets the brightness descriptor.
    #[must_use]
    pub fn brightness(mut self, property: impl Into<String>, steps: u32) -> Self {
        self.brightness = BrightnessConfig {
            property: property.into(),
            steps,
        };
        self
    }

    /// Sets the canonical on and off states.
    #[must_use]
    pub fn on_off(mut self, on_state: LightState, off_state: LightState) -> Self {
        self.on_state = on_state;
        self.off_state = off_state;
        self
    }

    /// Sets the transition and no-transition states.
    #[must_use]
    pub fn transitions(
        mut self,
        transition_state: LightState,
        no_transition_state: LightState,
    ) -> Self {
        self.transition_state = transition_state;
        self.no_transition_state = no_transition_state;
        self
    }

    /// Sets the reset template.
    #[must_use]
    pub fn reset_template(mut self, reset: LightState) -> Self {
        self.reset_template = Some(reset);
        self
    }

    /// Sets the command template.
    #[must_use]
    pub fn command_template(mut self, stamp: LightState) -> Self {
        self.command_template = Some(stamp);
        self
    }

    /// Appends a template.
    #[must_use]
    pub fn template(mut self, template: LightState) -> Self {
        self.templates.push(template);
        self
    }

    /// Returns true if `current` matches the canonical on state.
    #[must_use]
    pub fn is_on(&self, current: &LightState) -> bool {
        current.matches(&self.on_state)
    }

    /// Returns the brightness of `current`, or the maximum when absent.
    #[must_use]
    pub fn current_brightness(&self, current: &LightState) -> f64 {
        current
            .number(&self.brightness.property)
            .unwrap_or_else(|| self.brightness.max())
    }

    /// Builds a brightness command.
    #[must_use]
    pub fn brightness_command(&self, value: f64) -> LightState {
        LightState::new().with(self.brightness.property.clone(), level(value))
    }

    /// Returns the reset template followed by template `index`.
    ///
    /// The result keeps `null`s so stale template-only fields are deleted
    /// when it is merged into the light's record.
    #[must_use]
    pub fn template_command(&self, index: usize) -> LightState {
        let mut command = self.reset_template.clone().unwrap_or_default();
        if let Some(template) = self.templates.get(index) {
            command.overlay(template);
        }
        command
    }

    /// Applies the low-brightness transition guard.
    ///
    /// Some lights switch off instead of dimming when a transition is given
    /// with a small brightness. If the command's brightness is below 20% of
    /// the maximum and its transition fields equal `transition_state`, they
    /// are replaced by `no_transition_state`.
    pub fn guard_transition(&self, command: &mut LightState) {
        let low = command
            .number(&self.brightness.property)
            .is_some_and(|value| value < self.brightness.max() * 0.2);
        if low && command.matches(&self.transition_state) {
            tracing::debug!(record = %self.record, "Dropping transition at low brightness");
            command.overlay(&self.no_transition_state);
        }
    }

    /// Stamps the command template under `command` and applies the
    /// transition guard.
    #[must_use]
    pub fn finish(&self, command: LightState) -> LightState {
        let mut command = match &self.command_template {
            Some(stamp) => stamp.clone().overlaid(&command),
            None => command,
        };
        self.guard_transition(&mut command);
        command
    }
}

/// Converts a computed brightness into an integer JSON value.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn level(value: f64) -> Value {
    Value::from(value.round() as i64)
}

/// Advances a cursor over `len` entries, wrapping around.
pub(crate) fn cycle(index: usize, len: usize, forward: bool) -> usize {
    match (len, forward) {
        (0, _) => 0,
        (_, true) => (index + 1) % len,
        (_, false) => (index + len - 1) % len,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn state(value: Value) -> LightState {
        LightState::from_value(value).unwrap()
    }

    #[test]
    fn low_brightness_drops_transition() {
        let binding = LightDeviceBinding::new("lights/tv");
        let mut command = state(json!({ "brightness": 30, "transition": 0.2 }));
        binding.guard_transition(&mut command);
        assert_eq!(command, state(json!({ "brightness": 30, "transition": 0 })));
    }

    #[test]
    fn guard_ignores_bright_commands_and_other_transitions() {
        let binding = LightDeviceBinding::new("lights/tv");

        let mut bright = state(json!({ "brightness": 51, "transition": 0.2 }));
        binding.guard_transition(&mut bright);
        assert_eq!(bright.number("transition"), Some(0.2));

        let mut slow = state(json!({ "brightness": 10, "transition": 3 }));
        binding.guard_transition(&mut slow);
        assert_eq!(slow.number("transition"), Some(3.0));

        let mut no_brightness = state(json!({ "transition": 0.2 }));
        binding.guard_transition(&mut no_brightness);
        assert_eq!(no_brightness.number("transition"), Some(0.2));
    }

    #[test]
    fn guard_uses_configured_property() {
        let binding = LightDeviceBinding::new("lights/strip").brightness("white_level", 100);
        let mut command = state(json!({ "white_level": 19, "transition": 0.2 }));
        binding.guard_transition(&mut command);
        assert_eq!(command.number("transition"), Some(0.0));
    }

    #[test]
    fn template_command_resets_first() {
        let binding = LightDeviceBinding::new("lights/tv")
            .reset_template(state(json!({ "effect": null, "color": null })))
            .template(state(json!({ "effect": "candle" })))
            .template(state(json!({ "color": { "hue": 30, "saturation": 100 } })));

        assert_eq!(
            binding.template_command(1).to_value(),
            json!({ "effect": null, "color": { "hue": 30, "saturation": 100 } })
        );
    }

    #[test]
    fn finish_stamps_under_command() {
        let binding = LightDeviceBinding::new("lights/tv")
            .command_template(state(json!({ "transition": 0.2, "color_mode": "hs" })));
        let command = binding.finish(state(json!({ "brightness": 200, "color_mode": "xy" })));
        assert_eq!(
            command,
            state(json!({ "transition": 0.2, "color_mode": "xy", "brightness": 200 }))
        );
    }

    #[test]
    fn cycle_wraps_both_ways() {
        assert_eq!(cycle(2, 3, true), 0);
        assert_eq!(cycle(0, 3, false), 2);
        assert_eq!(cycle(0, 0, true), 0);
    }

    #[test]
    fn binding_from_minimal_json() {
        let binding: LightDeviceBinding = serde_json::from_value(json!({
            "record": "light-control/devices/Desk",
            "on_state": { "state": "ON" },
            "off_state": { "state": "OFF" },
            "templates": [{ "color_temp": 250 }]
        }))
        .unwrap();
        assert_eq!(binding.brightness, BrightnessConfig::default());
        assert_eq!(binding.transition_state, default_transition_state());
        assert_eq!(binding.templates.len(), 1);
    }
}
