// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Paulmann 5-button remote with continuous moves and RGB/white modes.

use std::sync::Arc;

use super::strategy::LightStrategy;
use super::{Effect, MoveDirection, RemoteEvent, RemoteHandler};
use crate::state::LightState;

/// Raw color temperature the remote emits twice when switching to white.
const MODE_SWITCH_SENTINEL: f64 = 286.0;

/// Color temperature substituted after a mode switch.
const MODE_SWITCH_VALUE: f64 = 370.0;

/// Native range of `action_color_temperature`.
const COLOR_TEMP_MIN: f64 = 153.0;
const COLOR_TEMP_MAX: f64 = 370.0;

/// Which control the color-temperature slider drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LightMode {
    /// The slider sets saturation.
    Rgb,
    /// The slider sets color temperature.
    #[default]
    White,
}

/// One light of a Paulmann remote.
#[derive(Debug, Clone)]
pub struct PaulmannBinding {
    light: String,
    strategy: Arc<dyn LightStrategy>,
    mode: LightMode,
}

impl PaulmannBinding {
    /// Creates a binding in white mode.
    #[must_use]
    pub fn new(light: impl Into<String>, strategy: Arc<dyn LightStrategy>) -> Self {
        Self {
            light: light.into(),
            strategy,
            mode: LightMode::White,
        }
    }

    /// Returns the store path of the light.
    #[must_use]
    pub fn light(&self) -> &str {
        &self.light
    }

    /// Returns the current mode.
    #[must_use]
    pub fn mode(&self) -> LightMode {
        self.mode
    }
}

/// Paulmann remote.
///
/// `action_group` (1-based) selects the binding; events for unconfigured
/// groups are ignored. Commands come from the binding's [`LightStrategy`]
/// and are merged into the light's record.
///
/// `brightness_move_up`/`brightness_move_down` start a repeating move that
/// the [`RemoteRunner`](super::RemoteRunner) drives until `brightness_stop`
/// or its safety cutoff.
///
/// The remote reports `color_temperature_move` with value 286 twice in a
/// row when switching back to white. The first occurrence is swallowed;
/// the second switches the binding to white at full warmth. A single 286
/// followed by anything else is a normal slider value that was lost.
#[derive(Debug, Clone)]
pub struct PaulmannRemote {
    bindings: Vec<PaulmannBinding>,
    mode_switch_pending: bool,
}

impl PaulmannRemote {
    /// Creates a remote for the given bindings, in group order.
    #[must_use]
    pub fn new(bindings: Vec<PaulmannBinding>) -> Self {
        Self {
            bindings,
            mode_switch_pending: false,
        }
    }

    /// Returns the mode of a binding.
    #[must_use]
    pub fn mode(&self, binding: usize) -> Option<LightMode> {
        self.bindings.get(binding).map(PaulmannBinding::mode)
    }

    fn color_temperature_move(
        &mut self,
        binding: usize,
        raw: f64,
        current: &LightState,
    ) -> Option<LightState> {
        let mut value = raw;
        if (raw - MODE_SWITCH_SENTINEL).abs() < f64::EPSILON {
            if !self.mode_switch_pending {
                self.mode_switch_pending = true;
                return None;
            }
            self.mode_switch_pending = false;
            self.bindings[binding].mode = LightMode::White;
            tracing::debug!(light = %self.bindings[binding].light, "Switching to white mode");
            value = MODE_SWITCH_VALUE;
        } else {
            self.mode_switch_pending = false;
        }

        let light = &self.bindings[binding];
        let fraction = (value - COLOR_TEMP_MIN) / (COLOR_TEMP_MAX - COLOR_TEMP_MIN);
        Some(match light.mode {
            LightMode::Rgb => light.strategy.set_saturation(current, fraction),
            LightMode::White => light.strategy.set_color_temp_percent(current, fraction),
        })
    }
}

impl RemoteHandler for PaulmannRemote {
    fn lights(&self) -> Vec<String> {
        self.bindings.iter().map(|b| b.light.clone()).collect()
    }

    fn select(&self, event: &RemoteEvent) -> Option<usize> {
        let index = event
            .action_group
            .and_then(|group| usize::try_from(group).ok())
            .and_then(|group| group.checked_sub(1))
            .filter(|index| *index < self.bindings.len());
        if index.is_none() {
            tracing::debug!(group = ?event.action_group, "No light configured for action group");
        }
        index
    }

    fn handle(&mut self, binding: usize, event: &RemoteEvent, current: &LightState) -> Vec<Effect> {
        let Some(light) = self.bindings.get(binding) else {
            return Vec::new();
        };
        let strategy = Arc::clone(&light.strategy);

        let command = match event.action() {
            "on" => Some(strategy.set_on_off(current, true)),
            "off" => Some(strategy.set_on_off(current, false)),
            "brightness_move_up" => {
                return vec![Effect::StartMove {
                    binding,
                    direction: MoveDirection::Up,
                }];
            }
            "brightness_move_down" => {
                return vec![Effect::StartMove {
                    binding,
                    direction: MoveDirection::Down,
                }];
            }
            "brightness_stop" => return vec![Effect::StopMove],
            "brightness_move_to_level" => event
                .action_level
                .map(|level| strategy.set_brightness_percent(current, level / 255.0)),
            "color_temperature_move" => match event.action_color_temperature {
                Some(raw) => self.color_temperature_move(binding, raw, current),
                None => None,
            },
            "enhanced_move_to_hue_and_saturation" => event.action_hue.map(|hue| {
                let command = strategy.set_hue(current, hue);
                self.bindings[binding].mode = LightMode::Rgb;
                command
            }),
            other => {
                tracing::debug!(action = %other, "Ignoring remote action");
                None
            }
        };

        command
            .map(|command| Effect::merge(binding, command))
            .into_iter()
            .collect()
    }

    fn move_step(
        &mut self,
        binding: usize,
        direction: MoveDirection,
        current: &LightState,
    ) -> Option<LightState> {
        let light = self.bindings.get(binding)?;
        Some(match direction {
            MoveDirection::Up => light.strategy.increment_brightness(current),
            MoveDirection::Down => light.strategy.decrement_brightness(current),
        })
    }
}
