// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Remote-control state machines.
//!
//! Each remote family implements [`RemoteHandler`]: given a button event and
//! the current state of the selected light, it updates its cursors and
//! returns the [`Effect`]s to apply. Handlers are synchronous and
//! deterministic; the [`RemoteRunner`] owns the records and the move timers.
//!
//! | Family | Handler | Selects light by |
//! |---|---|---|
//! | IKEA Tradfri, one light | [`TradfriRemote`] | - |
//! | IKEA Tradfri, several lights | [`TradfriMultiRemote`] | device cursor |
//! | Paulmann 5-button | [`PaulmannRemote`] | `action_group` |
//! | Philips Hue dimmer | [`PhilipsDimmerSwitch`] | device cursor |
//!
//! # Examples
//!
//! ```
//! use light_bridge::remote::{Effect, RemoteEvent, RemoteHandler, TradfriRemote};
//! use light_bridge::state::LightState;
//! use light_bridge::types::PowerState;
//!
//! let mut remote = TradfriRemote::new("light-control/devices/TV Light");
//! let event = RemoteEvent::new("toggle");
//!
//! let binding = remote.select(&event).unwrap();
//! let effects = remote.handle(binding, &event, &LightState::new());
//! let Effect::Write { command, .. } = &effects[0] else { unreachable!() };
//! assert_eq!(command.power(), Some(PowerState::On));
//! ```

mod binding;
mod event;
mod paulmann;
mod philips;
mod runner;
mod strategy;
pub mod templates;
mod tradfri;
mod tradfri_multi;

pub use binding::{BrightnessConfig, LightDeviceBinding};
pub use event::RemoteEvent;
pub use paulmann::{LightMode, PaulmannBinding, PaulmannRemote};
pub use philips::PhilipsDimmerSwitch;
pub use runner::{MoveTiming, RemoteRunner};
pub use strategy::{LightStrategy, RgbStrip, StrategyKind, ZigbeeColorLight};
pub use tradfri::TradfriRemote;
pub use tradfri_multi::TradfriMultiRemote;

use crate::state::LightState;

/// How a command is written to the desired-state record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Merge into the record; `null` fields delete.
    Merge,
    /// Empty the record, then write the command.
    Replace,
}

/// Direction of a continuous brightness move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    /// Brighter.
    Up,
    /// Darker.
    Down,
}

/// Side effect requested by a remote handler.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Write a command to the desired-state record of a binding.
    Write {
        /// Binding index.
        binding: usize,
        /// The command.
        command: LightState,
        /// Write mode.
        mode: WriteMode,
    },
    /// Start a repeating brightness move, replacing any running move.
    StartMove {
        /// Binding index.
        binding: usize,
        /// Direction.
        direction: MoveDirection,
    },
    /// Stop the running brightness move.
    StopMove,
}

impl Effect {
    /// Shorthand for a merge write.
    #[must_use]
    pub fn merge(binding: usize, command: LightState) -> Self {
        Self::Write {
            binding,
            command,
            mode: WriteMode::Merge,
        }
    }
}

/// Behavior of one remote family.
pub trait RemoteHandler: Send {
    /// Store paths of the lights this remote controls, by binding index.
    fn lights(&self) -> Vec<String>;

    /// Returns the binding an event applies to, or `None` to ignore it.
    fn select(&self, event: &RemoteEvent) -> Option<usize>;

    /// Handles an event for the selected binding.
    ///
    /// `current` is the last state reported by that light. Unknown actions
    /// return no effects.
    fn handle(&mut self, binding: usize, event: &RemoteEvent, current: &LightState) -> Vec<Effect>;

    /// Computes one step of a running brightness move.
    fn move_step(
        &mut self,
        _binding: usize,
        _direction: MoveDirection,
        _current: &LightState,
    ) -> Option<LightState> {
        None
    }
}
