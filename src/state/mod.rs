// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Light state documents exchanged between remotes, the store and devices.
//!
//! [`LightState`] is used both for whole records and for patches. A patch
//! is merged into a record field by field, and a `null` field deletes.
//!
//! # Examples
//!
//! ```
//! use light_bridge::state::LightState;
//!
//! let mut record = LightState::new().with("state", "ON").with("color_temp", 300);
//! let patch = LightState::new()
//!     .with("color_temp", serde_json::Value::Null)
//!     .with("color", serde_json::json!({ "r": 255, "g": 147, "b": 41 }));
//! record.merge(&patch);
//!
//! assert!(!record.contains_key("color_temp"));
//! assert!(record.color().is_some());
//! ```

mod light_state;

pub use light_state::LightState;
