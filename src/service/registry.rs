// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Registry of running services and their health.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use tokio::sync::{broadcast, watch};

use super::event_bus::{HealthBus, HealthEvent};
use super::health::{Health, HealthReporter};

/// Collects the health of every link and remote in the process.
///
/// # Examples
///
/// ```
/// use light_bridge::service::{Health, ServiceRegistry, Status};
///
/// let registry = ServiceRegistry::new();
/// let reporter = registry.register("link/TV Light");
/// reporter.set(Health::ok());
///
/// assert_eq!(registry.status("link/TV Light").unwrap().status(), Status::Ok);
/// ```
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    services: RwLock<BTreeMap<String, watch::Receiver<Health>>>,
    bus: HealthBus,
}

impl ServiceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a service and returns the reporter it publishes through.
    ///
    /// Registering an existing name replaces the previous entry.
    pub fn register(&self, service: impl Into<String>) -> HealthReporter {
        let service = service.into();
        let reporter = HealthReporter::with_bus(service.clone(), self.bus.clone());
        tracing::debug!(service = %service, "Registering service");
        self.services.write().insert(service, reporter.subscribe());
        reporter
    }

    /// Returns the current health of a service.
    #[must_use]
    pub fn status(&self, service: &str) -> Option<Health> {
        self.services
            .read()
            .get(service)
            .map(|rx| rx.borrow().clone())
    }

    /// Returns the health of every registered service, sorted by name.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(String, Health)> {
        self.services
            .read()
            .iter()
            .map(|(name, rx)| (name.clone(), rx.borrow().clone()))
            .collect()
    }

    /// Subscribes to health transitions of all services.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<HealthEvent> {
        self.bus.subscribe()
    }

    /// Returns the number of registered services.
    #[must_use]
    pub fn service_count(&self) -> usize {
        self.services.read().len()
    }
}
