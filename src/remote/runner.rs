// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Event loop of one remote.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use super::{Effect, MoveDirection, RemoteEvent, RemoteHandler, WriteMode};
use crate::service::{Health, HealthReporter};
use crate::state::LightState;
use crate::store::{LightRecords, StateStore};
use crate::timer::Timer;

/// Timing of continuous brightness moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveTiming {
    /// Period between move steps.
    pub interval: Duration,
    /// A move is stopped after this long even without a stop action.
    pub cutoff: Duration,
}

impl Default for MoveTiming {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            cutoff: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ActiveMove {
    binding: usize,
    direction: MoveDirection,
}

/// Runs a [`RemoteHandler`] against the state store.
///
/// Events are handled one at a time: the selected light's report record is
/// read, the handler computes its effects, and commands are written to the
/// light's desired-state record before the next event is looked at.
///
/// A brightness move invokes the handler's move step once immediately, then
/// every [`MoveTiming::interval`], until it is stopped or
/// [`MoveTiming::cutoff`] elapses. Starting a move cancels the previous one.
#[derive(Debug)]
pub struct RemoteRunner<H> {
    name: String,
    handler: H,
    lights: Vec<LightRecords>,
    health: HealthReporter,
    timing: MoveTiming,
    active: Option<ActiveMove>,
    repeat: Timer,
    safety: Timer,
}

impl<H: RemoteHandler> RemoteRunner<H> {
    /// Creates a runner, looking up the records of every light of `handler`.
    pub fn new(
        name: impl Into<String>,
        handler: H,
        store: &StateStore,
        health: HealthReporter,
    ) -> Self {
        let lights = handler.lights().iter().map(|path| store.light(path)).collect();
        Self {
            name: name.into(),
            handler,
            lights,
            health,
            timing: MoveTiming::default(),
            active: None,
            repeat: Timer::new(),
            safety: Timer::new(),
        }
    }

    /// Overrides the move timing.
    #[must_use]
    pub fn with_timing(mut self, timing: MoveTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Returns the remote name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handles a raw event payload. Malformed payloads are logged and dropped.
    pub fn handle_payload(&mut self, payload: &[u8]) {
        match RemoteEvent::from_slice(payload) {
            Ok(event) => self.handle_event(&event),
            Err(e) => tracing::error!(
                remote = %self.name,
                error = %e,
                payload = %String::from_utf8_lossy(payload),
                "Unable to parse remote message"
            ),
        }
    }

    /// Handles one event.
    pub fn handle_event(&mut self, event: &RemoteEvent) {
        tracing::debug!(remote = %self.name, action = %event.action(), "Received action");
        let Some(binding) = self.handler.select(event) else {
            return;
        };
        let Some(light) = self.lights.get(binding) else {
            return;
        };
        let current = light.report.get();
        let effects = self.handler.handle(binding, event, &current);
        for effect in effects {
            self.apply(effect);
        }
    }

    /// Runs until `stop` fires (or its sender is dropped) or the event
    /// channel closes.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<Vec<u8>>,
        mut stop: oneshot::Receiver<()>,
    ) -> H {
        for light in &self.lights {
            light.report.when_ready().await;
        }
        self.health.set(Health::ok());

        loop {
            tokio::select! {
                biased;
                _ = &mut stop => break,
                () = self.safety.expired() => {
                    tracing::debug!(remote = %self.name, "Move cut off");
                    self.stop_move();
                }
                () = self.repeat.expired() => {
                    self.repeat.rearm(self.timing.interval);
                    self.step_move();
                }
                payload = events.recv() => match payload {
                    Some(payload) => self.handle_payload(&payload),
                    None => break,
                },
            }
        }

        self.stop_move();
        tracing::debug!(remote = %self.name, "Remote stopped");
        self.health.set(Health::inactive());
        self.handler
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::Write {
                binding,
                command,
                mode,
            } => self.write(binding, &command, mode),
            Effect::StartMove { binding, direction } => {
                self.stop_move();
                self.active = Some(ActiveMove { binding, direction });
                self.step_move();
                self.repeat.arm(self.timing.interval);
                self.safety.arm(self.timing.cutoff);
            }
            Effect::StopMove => self.stop_move(),
        }
    }

    fn step_move(&mut self) {
        let Some(ActiveMove { binding, direction }) = self.active else {
            return;
        };
        let Some(light) = self.lights.get(binding) else {
            return;
        };
        let current = light.report.get();
        if let Some(command) = self.handler.move_step(binding, direction, &current) {
            self.write(binding, &command, WriteMode::Merge);
        }
    }

    fn stop_move(&mut self) {
        self.active = None;
        self.repeat.cancel();
        self.safety.cancel();
    }

    fn write(&self, binding: usize, command: &LightState, mode: WriteMode) {
        let Some(light) = self.lights.get(binding) else {
            return;
        };
        match mode {
            WriteMode::Merge => light.desired.set(command),
            WriteMode::Replace => {
                light.desired.clear();
                light.desired.set(&command.without_nulls());
            }
        }
    }
}
