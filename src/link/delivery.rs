// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Resend-until-acknowledged delivery of desired light states.

use crate::state::LightState;
use crate::types::{PowerState, Provenance};

/// Default number of resends before delivery is given up.
pub const MAX_RESENDS: u32 = 10;

/// Delivery phase of one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Nothing in flight.
    #[default]
    Ready,
    /// A command was published and is awaiting a device report.
    Sending,
    /// The retry budget was exhausted; only a new desired state recovers.
    Degraded,
}

/// What the driver must do when the resend timer fires.
#[derive(Debug, Clone, PartialEq)]
pub enum Resend {
    /// Publish the command again and re-arm the timer.
    Publish(LightState),
    /// The retry budget is exhausted. Nothing is published.
    Exceeded,
    /// Nothing is in flight; the firing is ignored.
    Idle,
}

/// Per-device delivery state.
///
/// Pure and synchronous: the driver owns the timer and the transport, and
/// feeds this machine the three inputs it reacts to.
///
/// # Examples
///
/// ```
/// use light_bridge::link::{Delivery, Phase};
/// use light_bridge::state::LightState;
///
/// let mut delivery = Delivery::new(2);
/// let command = delivery
///     .accept(&LightState::new().with("state", "ON"))
///     .unwrap();
/// assert_eq!(delivery.phase(), Phase::Sending);
///
/// assert!(delivery.acknowledge());
/// assert_eq!(delivery.phase(), Phase::Ready);
/// # let _ = command;
/// ```
#[derive(Debug, Clone, Default)]
pub struct Delivery {
    phase: Phase,
    last_command: Option<LightState>,
    retries: u32,
    max_resends: u32,
}

impl Delivery {
    /// Creates an idle machine allowing `max_resends` resends per command.
    #[must_use]
    pub fn new(max_resends: u32) -> Self {
        Self {
            max_resends,
            ..Self::default()
        }
    }

    /// Returns the current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Returns the number of resends of the current command.
    #[must_use]
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Returns the command last sent to the device.
    #[must_use]
    pub fn last_command(&self) -> Option<&LightState> {
        self.last_command.as_ref()
    }

    /// Accepts a new desired state.
    ///
    /// Returns the command to publish, or `None` when the state came from
    /// the device itself or holds no fields. Accepting resets the retry
    /// counter.
    pub fn accept(&mut self, desired: &LightState) -> Option<LightState> {
        if desired.provenance() == Some(Provenance::Device) || desired.is_empty() {
            return None;
        }
        let command = command_payload(desired);
        self.last_command = Some(command.clone());
        self.retries = 0;
        self.phase = Phase::Sending;
        Some(command)
    }

    /// Handles a device report. Returns true if a command was in flight.
    ///
    /// The retry counter is left alone; only a new desired state resets it.
    pub fn acknowledge(&mut self) -> bool {
        if self.phase == Phase::Sending {
            self.phase = Phase::Ready;
            true
        } else {
            false
        }
    }

    /// Handles a resend timer firing.
    pub fn resend_due(&mut self) -> Resend {
        if self.phase != Phase::Sending {
            return Resend::Idle;
        }
        let Some(command) = &self.last_command else {
            return Resend::Idle;
        };
        self.retries += 1;
        if self.retries > self.max_resends {
            self.phase = Phase::Degraded;
            Resend::Exceeded
        } else {
            Resend::Publish(command.clone())
        }
    }
}

/// Builds the device command for a desired state.
///
/// The provenance tag is never sent. A state commanding `OFF` is reduced to
/// the `state` field alone, since any other field makes the device switch
/// the light back on.
///
/// # Examples
///
/// ```
/// use light_bridge::link::command_payload;
/// use light_bridge::state::LightState;
///
/// let desired = LightState::new().with("state", "OFF").with("brightness", 120);
/// assert_eq!(command_payload(&desired), LightState::new().with("state", "OFF"));
/// ```
#[must_use]
pub fn command_payload(desired: &LightState) -> LightState {
    if desired.is_off() {
        return LightState::new().with("state", PowerState::Off.as_str());
    }
    let mut command = desired.without_nulls();
    command.set_provenance(None);
    command
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn state(value: serde_json::Value) -> LightState {
        LightState::from_value(value).unwrap()
    }

    #[test]
    fn accept_returns_command_and_enters_sending() {
        let mut delivery = Delivery::new(MAX_RESENDS);
        let command = delivery
            .accept(&state(json!({ "brightness": 30, "from": "control" })))
            .unwrap();
        assert_eq!(command, state(json!({ "brightness": 30 })));
        assert_eq!(delivery.phase(), Phase::Sending);
        assert_eq!(delivery.last_command(), Some(&command));
    }

    #[test]
    fn device_states_are_never_accepted() {
        let mut delivery = Delivery::new(MAX_RESENDS);
        assert!(
            delivery
                .accept(&state(json!({ "state": "ON", "from": "device" })))
                .is_none()
        );
        assert_eq!(delivery.phase(), Phase::Ready);
    }

    #[test]
    fn empty_states_are_not_accepted() {
        let mut delivery = Delivery::new(MAX_RESENDS);
        assert!(delivery.accept(&LightState::new()).is_none());
    }

    #[test]
    fn off_command_carries_only_state() {
        let desired = state(json!({
            "state": "OFF",
            "brightness": 200,
            "color": { "r": 1, "g": 2, "b": 3 },
            "transition": 0.2,
            "from": "control"
        }));
        assert_eq!(
            serde_json::to_value(command_payload(&desired)).unwrap(),
            json!({ "state": "OFF" })
        );
    }

    #[test]
    fn resend_budget_is_exhausted_on_the_eleventh_firing() {
        let mut delivery = Delivery::new(MAX_RESENDS);
        delivery.accept(&state(json!({ "state": "ON" })));

        for attempt in 1..=MAX_RESENDS {
            assert!(matches!(delivery.resend_due(), Resend::Publish(_)));
            assert_eq!(delivery.retries(), attempt);
        }
        assert_eq!(delivery.resend_due(), Resend::Exceeded);
        assert_eq!(delivery.phase(), Phase::Degraded);
        assert_eq!(delivery.resend_due(), Resend::Idle);
    }

    #[test]
    fn acknowledge_keeps_retry_count() {
        let mut delivery = Delivery::new(MAX_RESENDS);
        delivery.accept(&state(json!({ "state": "ON" })));
        delivery.resend_due();
        delivery.resend_due();

        assert!(delivery.acknowledge());
        assert_eq!(delivery.retries(), 2);
        assert!(!delivery.acknowledge());
        assert_eq!(delivery.resend_due(), Resend::Idle);
    }

    #[test]
    fn new_command_recovers_from_degraded() {
        let mut delivery = Delivery::new(0);
        delivery.accept(&state(json!({ "state": "ON" })));
        assert_eq!(delivery.resend_due(), Resend::Exceeded);
        assert!(!delivery.acknowledge());
        assert_eq!(delivery.phase(), Phase::Degraded);

        delivery.accept(&state(json!({ "state": "OFF" })));
        assert_eq!(delivery.phase(), Phase::Sending);
        assert_eq!(delivery.retries(), 0);
    }
}
