// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared State Store.
//!
//! The store holds one mutable document per key and is the rendezvous point
//! between remotes and device links. Each light has two records:
//!
//! - `<lightPath>/set` - the desired state, written by remotes and read by
//!   the device link
//! - `<lightPath>/is` - the state last reported by the device, written only
//!   by the device link
//!
//! # Examples
//!
//! ```
//! use light_bridge::state::LightState;
//! use light_bridge::store::StateStore;
//!
//! let store = StateStore::new();
//! let light = store.light("light-control/devices/TV Light");
//! assert_eq!(light.desired.name(), "light-control/devices/TV Light/set");
//!
//! light.desired.set(&LightState::new().with("state", "ON"));
//! let same = store.record("light-control/devices/TV Light/set");
//! assert!(same.get().contains_key("state"));
//! ```

mod record;

use std::collections::HashMap;

use parking_lot::RwLock;

pub use record::{Record, RecordSubscription};

/// Returns the key of a light's report record.
#[must_use]
pub fn report_key(light_path: &str) -> String {
    format!("{light_path}/is")
}

/// Returns the key of a light's desired-state record.
#[must_use]
pub fn desired_key(light_path: &str) -> String {
    format!("{light_path}/set")
}

/// The pair of records belonging to one light.
#[derive(Debug, Clone)]
pub struct LightRecords {
    /// Device-authoritative state (`<path>/is`).
    pub report: Record,
    /// Desired state (`<path>/set`).
    pub desired: Record,
}

/// In-process Shared State Store.
#[derive(Debug, Default)]
pub struct StateStore {
    records: RwLock<HashMap<String, Record>>,
}

impl StateStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the record for a key, creating an empty one on first use.
    pub fn record(&self, name: &str) -> Record {
        if let Some(record) = self.records.read().get(name) {
            return record.clone();
        }
        self.records
            .write()
            .entry(name.to_string())
            .or_insert_with(|| Record::new(name))
            .clone()
    }

    /// Returns the report and desired-state records of a light.
    pub fn light(&self, light_path: &str) -> LightRecords {
        LightRecords {
            report: self.record(&report_key(light_path)),
            desired: self.record(&desired_key(light_path)),
        }
    }

    /// Returns the keys of all records, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.records.read().keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::LightState;

    #[test]
    fn same_key_returns_same_record() {
        let store = StateStore::new();
        let a = store.record("x");
        let b = store.record("x");
        a.set(&LightState::new().with("brightness", 3));
        assert_eq!(b.get().brightness(), Some(3.0));
    }

    #[test]
    fn light_records_use_is_and_set_keys() {
        let store = StateStore::new();
        let light = store.light("lights/desk");
        assert_eq!(light.report.name(), "lights/desk/is");
        assert_eq!(light.desired.name(), "lights/desk/set");
        assert_eq!(store.keys(), vec!["lights/desk/is", "lights/desk/set"]);
    }

    #[test]
    fn key_helpers() {
        assert_eq!(report_key("a/b"), "a/b/is");
        assert_eq!(desired_key("a/b"), "a/b/set");
    }
}
