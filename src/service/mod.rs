// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Service lifecycle and health reporting.
//!
//! Every device link and remote is a service with a coarse [`Status`]
//! (`starting|ok|busy|degraded|inactive`) and an optional reason. Services
//! publish through a [`HealthReporter`]; the [`ServiceRegistry`] collects them
//! and re-broadcasts transitions as [`HealthEvent`]s.
//!
//! # Examples
//!
//! ```
//! use light_bridge::service::{Health, ServiceRegistry};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let registry = ServiceRegistry::new();
//! let mut events = registry.subscribe();
//!
//! let reporter = registry.register("link/TV Light");
//! reporter.set(Health::ok());
//!
//! let event = events.recv().await.unwrap();
//! assert_eq!(event.health, Health::ok());
//! # }
//! ```

mod event_bus;
mod health;
mod registry;

pub use event_bus::{HealthBus, HealthEvent};
pub use health::{Health, HealthReporter, Status};
pub use registry::ServiceRegistry;
