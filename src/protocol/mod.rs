// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Message broker plumbing.
//!
//! Devices and remotes are reached through zigbee2mqtt topics:
//!
//! - Device reports: `zigbee2mqtt/<deviceName>`
//! - Device commands: `zigbee2mqtt/<deviceName>/set`
//! - Remote events: `zigbee2mqtt/<remoteName>`
//!
//! Outbound messages go through the [`Publisher`] trait so the device link
//! can run against a real [`MqttSession`] or an in-memory recorder.

#[cfg(feature = "mqtt")]
mod mqtt;

use std::sync::Arc;

#[cfg(feature = "mqtt")]
pub use mqtt::{MqttSession, MqttSessionBuilder};

use crate::error::ProtocolError;

/// Topic prefix used by zigbee2mqtt.
pub const BASE_TOPIC: &str = "zigbee2mqtt";

/// Returns the topic a device publishes its reports on.
///
/// # Examples
///
/// ```
/// assert_eq!(light_bridge::protocol::device_topic("TV Light"), "zigbee2mqtt/TV Light");
/// ```
#[must_use]
pub fn device_topic(device_name: &str) -> String {
    format!("{BASE_TOPIC}/{device_name}")
}

/// Returns the topic a device accepts commands on.
///
/// # Examples
///
/// ```
/// assert_eq!(light_bridge::protocol::command_topic("TV Light"), "zigbee2mqtt/TV Light/set");
/// ```
#[must_use]
pub fn command_topic(device_name: &str) -> String {
    format!("{BASE_TOPIC}/{device_name}/set")
}

/// Returns the topic a remote publishes its button events on.
#[must_use]
pub fn remote_topic(remote_name: &str) -> String {
    device_topic(remote_name)
}

/// Sink for outbound broker messages.
///
/// Publishing is synchronous: implementations enqueue the message and
/// return, so state machines can publish without yielding.
pub trait Publisher: Send + Sync {
    /// Enqueues a message for `topic`.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the message cannot be enqueued.
    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), ProtocolError>;
}

impl<P: Publisher + ?Sized> Publisher for Arc<P> {
    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), ProtocolError> {
        (**self).publish(topic, payload)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use parking_lot::Mutex;

    use super::Publisher;
    use crate::error::ProtocolError;

    /// Publisher recording every message, for tests.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingPublisher {
        messages: Mutex<Vec<(String, serde_json::Value)>>,
    }

    impl RecordingPublisher {
        pub(crate) fn messages(&self) -> Vec<(String, serde_json::Value)> {
            self.messages.lock().clone()
        }

        pub(crate) fn count(&self) -> usize {
            self.messages.lock().len()
        }
    }

    impl Publisher for RecordingPublisher {
        fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), ProtocolError> {
            let value = serde_json::from_slice(&payload)
                .map_err(|e| ProtocolError::ConnectionFailed(e.to_string()))?;
            self.messages.lock().push((topic.to_string(), value));
            Ok(())
        }
    }
}
