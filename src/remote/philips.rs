// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Philips Hue dimmer switch (4 buttons, click and hold).

use super::binding::{LightDeviceBinding, cycle};
use super::{Effect, RemoteEvent, RemoteHandler, WriteMode};
use crate::state::LightState;

const BRIGHTNESS_STEP: i64 = 25;
const BRIGHTNESS_MOVE: i64 = 80;

/// Philips dimmer switch driving a list of [`LightDeviceBinding`]s.
///
/// | Action | Effect |
/// |---|---|
/// | `on-press` | light on: next template; light off: `on_state` |
/// | `on-hold` | first template |
/// | `off-press` | first press: `off_state`; repeated press: select next light |
/// | `up-press` / `down-press` | `brightness_step` ±25 |
/// | `up-hold` / `down-hold` | `brightness_move` ±80, ramped by the device |
/// | `up-hold-release` / `down-hold-release` | `brightness_move` 0 |
///
/// Template commands are `reset_template`, `on_state`, `no_transition_state`
/// and the template, applied in that order. Every command replaces the
/// light's desired-state record.
#[derive(Debug, Clone)]
pub struct PhilipsDimmerSwitch {
    bindings: Vec<LightDeviceBinding>,
    template_indices: Vec<usize>,
    device_index: usize,
}

impl PhilipsDimmerSwitch {
    /// Creates a switch for the given bindings.
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

    fn template_command(&self, binding: usize) -> LightState {
        let light = &self.bindings[binding];
        let mut command = light.reset_template.clone().unwrap_or_default();
        command.overlay(&light.on_state);
        command.overlay(&light.no_transition_state);
        if let Some(template) = light.templates.get(self.template_indices[binding]) {
            command.overlay(template);
        }
        command
    }
}

impl RemoteHandler for PhilipsDimmerSwitch {
    fn lights(&self) -> Vec<String> {
        self.bindings.iter().map(|b| b.record.clone()).collect()
    }

    fn select(&self, _event: &RemoteEvent) -> Option<usize> {
        (self.device_index < self.bindings.len()).then_some(self.device_index)
    }

    fn handle(&mut self, binding: usize, event: &RemoteEvent, current: &LightState) -> Vec<Effect> {
        if binding >= self.bindings.len() {
            return Vec::new();
        }

        let command = match event.action() {
            "on-press" => {
                if self.bindings[binding].is_on(current) {
                    let templates = self.bindings[binding].templates.len();
                    let index = &mut self.template_indices[binding];
                    *index = cycle(*index, templates, true);
                    tracing::debug!(template_index = *index, "Light is on, cycling template");
                    Some(self.template_command(binding))
                } else {
                    tracing::debug!("Light is off, turning on");
                    Some(self.bindings[binding].on_state.clone())
                }
            }
            "on-hold" => {
                self.template_indices[binding] = 0;
                tracing::debug!("Resetting template");
                Some(self.template_command(binding))
            }
            "off-press" => {
                if event.counter == Some(1) {
                    Some(self.bindings[binding].off_state.clone())
                } else {
                    self.device_index = cycle(self.device_index, self.bindings.len(), true);
                    tracing::debug!(
                        device_index = self.device_index,
                        record = %self.bindings[self.device_index].record,
                        "Selecting next light"
                    );
                    None
                }
            }
            "up-press" => Some(LightState::new().with("brightness_step", BRIGHTNESS_STEP)),
            "down-press" => Some(LightState::new().with("brightness_step", -BRIGHTNESS_STEP)),
            "up-hold" => Some(LightState::new().with("brightness_move", BRIGHTNESS_MOVE)),
            "down-hold" => Some(LightState::new().with("brightness_move", -BRIGHTNESS_MOVE)),
            "up-hold-release" | "down-hold-release" => {
                Some(LightState::new().with("brightness_move", 0))
            }
            other => {
                tracing::debug!(action = %other, "Ignoring remote action");
                None
            }
        };

        let Some(command) = command else {
            return Vec::new();
        };
        let command = self.bindings[binding].finish(command.without_nulls());
        vec![Effect::Write {
            binding,
            command,
            mode: WriteMode::Replace,
        }]
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    fn state(value: Value) -> LightState {
        LightState::from_value(value).unwrap()
    }

    fn binding(record: &str) -> LightDeviceBinding {
        LightDeviceBinding::new(record)
            .on_off(
                state(json!({ "state": "ON" })),
                state(json!({ "state": "OFF", "transition": 0.2 })),
            )
            .reset_template(state(json!({ "effect": null, "color_temp": null })))
            .template(state(json!({ "brightness": 254, "color_temp": 370 })))
            .template(state(json!({ "brightness": 30, "transition": 0.2, "effect": "candle" })))
            .template(state(json!({ "brightness": 150, "color_temp": 200 })))
    }

    fn switch() -> PhilipsDimmerSwitch {
        PhilipsDimmerSwitch::new(vec![binding("lights/hall"), binding("lights/kitchen")])
    }

    fn run(
        switch: &mut PhilipsDimmerSwitch,
        event: &RemoteEvent,
        current: Value,
    ) -> Option<LightState> {
        let binding = switch.select(event)?;
        match switch.handle(binding, event, &state(current)).as_slice() {
            [] => None,
            [Effect::Write { command, mode, .. }] => {
                assert_eq!(*mode, WriteMode::Replace);
                Some(command.clone())
            }
            other => panic!("unexpected effects {other:?}"),
        }
    }

    #[test]
    fn on_press_turns_light_on() {
        let mut switch = switch();
        let command = run(&mut switch, &RemoteEvent::new("on-press"), json!({ "state": "OFF" }));
        assert_eq!(command, Some(state(json!({ "state": "ON" }))));
        assert_eq!(switch.template_index(0), Some(0));
    }

    #[test]
    fn on_press_while_on_cycles_template() {
        let mut switch = switch();
        let command = run(
            &mut switch,
            &RemoteEvent::new("on-press"),
            json!({ "state": "ON" }),
        )
        .unwrap();
        assert_eq!(switch.template_index(0), Some(1));
        // transition 0 comes from no_transition_state and is overridden by
        // the template, then the low-brightness guard drops it again
        assert_eq!(
            command,
            state(json!({ "state": "ON", "transition": 0, "brightness": 30, "effect": "candle" }))
        );
    }

    #[test]
    fn cycling_templates_wraps_and_drops_nulls() {
        let mut switch = switch();
        for _ in 0..2 {
            run(&mut switch, &RemoteEvent::new("on-press"), json!({ "state": "ON" }));
        }
        let command = run(
            &mut switch,
            &RemoteEvent::new("on-press"),
            json!({ "state": "ON" }),
        )
        .unwrap();
        assert_eq!(switch.template_index(0), Some(0));
        assert_eq!(
            command,
            state(json!({ "state": "ON", "transition": 0, "brightness": 254, "color_temp": 370 }))
        );
    }

    #[test]
    fn on_hold_resets_template() {
        let mut switch = switch();
        run(&mut switch, &RemoteEvent::new("on-press"), json!({ "state": "ON" }));
        let command = run(&mut switch, &RemoteEvent::new("on-hold"), json!({})).unwrap();
        assert_eq!(switch.template_index(0), Some(0));
        assert_eq!(command.number("color_temp"), Some(370.0));
    }

    #[test]
    fn off_press_counter_selects_behavior() {
        let mut switch = switch();
        let off = run(
            &mut switch,
            &RemoteEvent::new("off-press").with_counter(1),
            json!({ "state": "ON" }),
        );
        assert_eq!(off, Some(state(json!({ "state": "OFF", "transition": 0.2 }))));

        let cycled = run(
            &mut switch,
            &RemoteEvent::new("off-press").with_counter(2),
            json!({ "state": "OFF" }),
        );
        assert!(cycled.is_none());
        assert_eq!(switch.device_index(), 1);

        run(&mut switch, &RemoteEvent::new("off-press"), json!({}));
        assert_eq!(switch.device_index(), 0);
    }

    #[test]
    fn command_template_is_stamped() {
        let light = binding("lights/hall").command_template(state(json!({ "transition": 0.5 })));
        let mut switch = PhilipsDimmerSwitch::new(vec![light]);

        let on = run(&mut switch, &RemoteEvent::new("on-press"), json!({ "state": "OFF" }));
        assert_eq!(on, Some(state(json!({ "state": "ON", "transition": 0.5 }))));

        let step = run(&mut switch, &RemoteEvent::new("up-press"), json!({})).unwrap();
        assert_eq!(
            step.to_value(),
            json!({ "transition": 0.5, "brightness_step": 25 })
        );

        // the template's own transition wins, then the guard applies
        let cycled = run(&mut switch, &RemoteEvent::new("on-press"), json!({ "state": "ON" }));
        assert_eq!(cycled.and_then(|c| c.number("transition")), Some(0.0));
    }

    #[test]
    fn dimming_commands() {
        let mut switch = switch();
        let cases = [
            ("up-press", json!({ "brightness_step": 25 })),
            ("down-press", json!({ "brightness_step": -25 })),
            ("up-hold", json!({ "brightness_move": 80 })),
            ("down-hold", json!({ "brightness_move": -80 })),
            ("up-hold-release", json!({ "brightness_move": 0 })),
            ("down-hold-release", json!({ "brightness_move": 0 })),
        ];
        for (action, expected) in cases {
            let command = run(&mut switch, &RemoteEvent::new(action), json!({})).unwrap();
            assert_eq!(command.to_value(), expected, "{action}");
        }
    }
}
