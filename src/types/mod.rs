// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types shared by the device link and the remotes.
//!
//! # Types
//!
//! - [`PowerState`] - `ON`/`OFF`/`TOGGLE` light state
//! - [`Provenance`] - Whether a state document came from the device or a control
//! - [`RgbColor`] / [`Hsv`] - Colors and the conversion between them

mod power;
mod provenance;
mod rgb_color;

pub use power::PowerState;
pub use provenance::Provenance;
pub use rgb_color::{Hsv, RgbColor};
