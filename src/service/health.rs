// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Coarse health status of a running service.

use std::fmt;

use tokio::sync::watch;

use super::event_bus::{HealthBus, HealthEvent};

/// Coarse status reported to the service registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Connecting and loading initial data.
    Starting,
    /// Running, nothing in flight.
    Ok,
    /// Running, waiting for a device acknowledgement.
    Busy,
    /// Running, but delivery to the device has failed persistently.
    Degraded,
    /// Stopped or failed to start.
    Inactive,
}

impl Status {
    /// Returns the lower-case name used in logs and by registries.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Ok => "ok",
            Self::Busy => "busy",
            Self::Degraded => "degraded",
            Self::Inactive => "inactive",
        }
    }
}

/// Status plus an optional human-readable reason.
///
/// # Examples
///
/// ```
/// use light_bridge::service::{Health, Status};
///
/// let health = Health::degraded("no acknowledgement after 10 resends");
/// assert_eq!(health.status(), Status::Degraded);
/// assert_eq!(health.to_string(), "degraded: no acknowledgement after 10 resends");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Health {
    status: Status,
    reason: Option<String>,
}

impl Health {
    /// Creates a health value without a reason.
    #[must_use]
    pub const fn new(status: Status) -> Self {
        Self {
            status,
            reason: None,
        }
    }

    /// `starting`
    #[must_use]
    pub const fn starting() -> Self {
        Self::new(Status::Starting)
    }

    /// `ok`
    #[must_use]
    pub const fn ok() -> Self {
        Self::new(Status::Ok)
    }

    /// `busy`
    #[must_use]
    pub const fn busy() -> Self {
        Self::new(Status::Busy)
    }

    /// `degraded` with a reason.
    #[must_use]
    pub fn degraded(reason: impl Into<String>) -> Self {
        Self {
            status: Status::Degraded,
            reason: Some(reason.into()),
        }
    }

    /// `inactive`
    #[must_use]
    pub const fn inactive() -> Self {
        Self::new(Status::Inactive)
    }

    /// `inactive` with a reason, used when startup failed.
    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            status: Status::Inactive,
            reason: Some(reason.into()),
        }
    }

    /// Returns the coarse status.
    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }

    /// Returns the reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }
}

impl Default for Health {
    fn default() -> Self {
        Self::starting()
    }
}

impl fmt::Display for Health {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            Some(reason) => write!(f, "{}: {reason}", self.status.as_str()),
            None => f.write_str(self.status.as_str()),
        }
    }
}

/// Publishes the health of one service.
///
/// The current value is kept in a `watch` channel; every transition is also
/// broadcast on the registry's [`HealthBus`] when one is attached.
#[derive(Debug)]
pub struct HealthReporter {
    service: String,
    tx: watch::Sender<Health>,
    bus: Option<HealthBus>,
}

impl HealthReporter {
    /// Creates a standalone reporter in the `starting` state.
    #[must_use]
    pub fn new(service: impl Into<String>) -> Self {
        let (tx, _) = watch::channel(Health::starting());
        Self {
            service: service.into(),
            tx,
            bus: None,
        }
    }

    pub(crate) fn with_bus(service: impl Into<String>, bus: HealthBus) -> Self {
        Self {
            bus: Some(bus),
            ..Self::new(service)
        }
    }

    /// Returns the service name.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Returns the current health.
    #[must_use]
    pub fn current(&self) -> Health {
        self.tx.borrow().clone()
    }

    /// Returns a receiver observing every transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Health> {
        self.tx.subscribe()
    }

    /// Sets the health. Returns true if it changed.
    pub fn set(&self, health: Health) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == health {
                false
            } else {
                *current = health.clone();
                true
            }
        });
        if changed {
            tracing::debug!(service = %self.service, health = %health, "Health changed");
            if let Some(bus) = &self.bus {
                bus.publish(HealthEvent {
                    service: self.service.clone(),
                    health,
                });
            }
        }
        changed
    }
}
