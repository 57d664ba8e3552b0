// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bridge configuration file.
//!
//! The bridge is configured from a single JSON document listing the device
//! links and the remotes to start.
//!
//! # Examples
//!
//! ```
//! use light_bridge::config::{BridgeConfig, RemoteFamily};
//!
//! let config = BridgeConfig::from_json(r#"{
//!     "links": [{
//!         "mqtt_url": "mqtt://helios4.local",
//!         "device_name": "TV Light",
//!         "record": "light-control/devices/TV Light"
//!     }],
//!     "remotes": [{
//!         "mqtt_url": "mqtt://helios4.local",
//!         "remote_name": "Tradfri Remote 1",
//!         "family": "tradfri",
//!         "record": "light-control/devices/TV Light"
//!     }]
//! }"#)?;
//!
//! assert_eq!(config.links[0].device_name, "TV Light");
//! assert!(matches!(config.remotes[0].family, RemoteFamily::Tradfri { .. }));
//! # Ok::<(), light_bridge::error::ConfigError>(())
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::link::{LinkTiming, MAX_RESENDS};
use crate::remote::{LightDeviceBinding, StrategyKind};
use crate::state::LightState;

/// Default configuration file name.
pub const DEFAULT_CONFIG_PATH: &str = "light-bridge.json";

/// Root of the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Device links to start.
    #[serde(default)]
    pub links: Vec<LinkConfig>,
    /// Remotes to start.
    #[serde(default)]
    pub remotes: Vec<RemoteConfig>,
}

impl BridgeConfig {
    /// Reads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read, is not valid JSON
    /// for this model, or fails [`validate`](Self::validate).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "Loading configuration");
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parses and validates a configuration document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the document is not valid JSON for this
    /// model or fails [`validate`](Self::validate).
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks constraints serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming the first offending entry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for link in &self.links {
            if link.device_name.is_empty() {
                return Err(invalid("link with empty device_name"));
            }
            if link.record.is_empty() {
                return Err(invalid(format!("link {}: empty record", link.device_name)));
            }
        }
        for remote in &self.remotes {
            remote.validate()?;
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}

/// Broker credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MqttCredentials {
    /// User name.
    pub username: String,
    /// Password.
    pub password: String,
}

// ========== Device links ==========

/// One device link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Broker URL, e.g. `mqtt://helios4.local`.
    pub mqtt_url: String,
    /// zigbee2mqtt friendly name of the light.
    pub device_name: String,
    /// Store path of the light's records.
    pub record: String,
    /// Delivery timing.
    #[serde(default)]
    pub timing: TimingConfig,
    /// Optional broker credentials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<MqttCredentials>,
}

/// Delivery timing of a link, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Coalescing window for desired-state changes.
    pub debounce_ms: u64,
    /// Delay before resending an unacknowledged command.
    pub resend_ms: u64,
    /// Resends per command before the link is degraded.
    pub max_resends: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 50,
            resend_ms: 2000,
            max_resends: MAX_RESENDS,
        }
    }
}

impl From<TimingConfig> for LinkTiming {
    fn from(timing: TimingConfig) -> Self {
        Self {
            debounce: Duration::from_millis(timing.debounce_ms),
            resend: Duration::from_millis(timing.resend_ms),
            max_resends: timing.max_resends,
        }
    }
}

// ========== Remotes ==========

/// One remote control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Broker URL.
    pub mqtt_url: String,
    /// zigbee2mqtt friendly name of the remote.
    pub remote_name: String,
    /// Optional broker credentials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<MqttCredentials>,
    /// Family-specific settings, tagged by `family`.
    #[serde(flatten)]
    pub family: RemoteFamily,
}

impl RemoteConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let name = &self.remote_name;
        if name.is_empty() {
            return Err(invalid("remote with empty remote_name"));
        }
        match &self.family {
            RemoteFamily::Tradfri { record, presets } => {
                if record.is_empty() {
                    return Err(invalid(format!("remote {name}: empty record")));
                }
                if presets.as_ref().is_some_and(Vec::is_empty) {
                    return Err(invalid(format!("remote {name}: empty presets")));
                }
            }
            RemoteFamily::TradfriMulti { bindings } | RemoteFamily::Philips { bindings } => {
                if bindings.is_empty() {
                    return Err(invalid(format!("remote {name}: no bindings")));
                }
                for binding in bindings {
                    if binding.templates.is_empty() {
                        return Err(invalid(format!(
                            "remote {name}: binding {} has no templates",
                            binding.record
                        )));
                    }
                    if binding.brightness.steps == 0 {
                        return Err(invalid(format!(
                            "remote {name}: binding {} has zero brightness steps",
                            binding.record
                        )));
                    }
                }
            }
            RemoteFamily::Paulmann { bindings } => {
                if bindings.is_empty() {
                    return Err(invalid(format!("remote {name}: no bindings")));
                }
            }
        }
        Ok(())
    }
}

/// Remote family with its bindings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum RemoteFamily {
    /// Tradfri remote for one light, cycling color presets.
    Tradfri {
        /// Store path of the light.
        record: String,
        /// Color presets; the built-in twelve when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        presets: Option<Vec<LightState>>,
    },
    /// Tradfri remote cycling several lights and their templates.
    TradfriMulti {
        /// Lights in selection order.
        bindings: Vec<LightDeviceBinding>,
    },
    /// Paulmann remote, one binding per action group.
    Paulmann {
        /// Lights in group order.
        bindings: Vec<PaulmannBindingConfig>,
    },
    /// Philips Hue dimmer switch.
    Philips {
        /// Lights in selection order.
        bindings: Vec<LightDeviceBinding>,
    },
}

impl RemoteFamily {
    /// Returns the family name as written in the configuration.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Tradfri { .. } => "tradfri",
            Self::TradfriMulti { .. } => "tradfri_multi",
            Self::Paulmann { .. } => "paulmann",
            Self::Philips { .. } => "philips",
        }
    }
}

/// One light of a Paulmann remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaulmannBindingConfig {
    /// Store path of the light.
    pub record: String,
    /// Command strategy of the light.
    #[serde(default)]
    pub strategy: StrategyKind,
}
