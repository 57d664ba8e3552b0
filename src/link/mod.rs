// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device Link: command delivery to one physical light.
//!
//! ```text
//! <path>/set ──debounce──▶ Delivery ──publish──▶ zigbee2mqtt/<device>/set
//!                              ▲                          │
//!                              │ ack             physical device
//!                              │                          ▼
//! <path>/is ◀──from: device── report ◀──────── zigbee2mqtt/<device>
//! ```
//!
//! [`Delivery`] is the synchronous state machine (`Ready ⇄ Sending →
//! Degraded`); [`DeviceLink`] drives it with the debounce and resend timers.

mod delivery;
mod device_link;

pub use delivery::{Delivery, MAX_RESENDS, Phase, Resend, command_payload};
pub use device_link::{DeviceLink, LinkTiming};
