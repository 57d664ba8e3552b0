// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Provenance tag carried by light state documents.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// Where a light state document came from.
///
/// A document tagged [`Provenance::Device`] was written because the physical
/// light reported it and must never be sent back to the light as a command.
///
/// # Examples
///
/// ```
/// use light_bridge::types::Provenance;
///
/// assert_eq!(Provenance::Device.as_str(), "device");
/// assert_eq!("control".parse::<Provenance>().unwrap(), Provenance::Control);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Reported by the physical device.
    Device,
    /// Requested by a remote or another control input.
    Control,
}

impl Provenance {
    /// Name of the field holding the tag in a serialized document.
    pub const FIELD: &'static str = "from";

    /// Returns the wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Device => "device",
            Self::Control => "control",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provenance {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "device" => Ok(Self::Device),
            "control" => Ok(Self::Control),
            _ => Err(ValueError::InvalidProvenance(s.to_string())),
        }
    }
}
