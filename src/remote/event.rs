// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Button events published by remotes.

use serde::Deserialize;

use crate::error::ParseError;

/// A remote-control event as published by zigbee2mqtt.
///
/// Only `action` is common to all families; the other fields are present
/// for some actions of some remotes. Unknown fields (battery, link quality,
/// ...) are ignored.
///
/// # Examples
///
/// ```
/// use light_bridge::remote::RemoteEvent;
///
/// let event = RemoteEvent::from_slice(
///     br#"{"action":"color_temperature_move","action_group":1,"action_color_temperature":286,"linkquality":120}"#,
/// )
/// .unwrap();
/// assert_eq!(event.action(), "color_temperature_move");
/// assert_eq!(event.action_group, Some(1));
/// assert_eq!(event.action_color_temperature, Some(286.0));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RemoteEvent {
    /// Button action name.
    #[serde(default)]
    pub action: Option<String>,
    /// 1-based group selected on multi-group remotes.
    #[serde(default)]
    pub action_group: Option<u32>,
    /// Consecutive press counter.
    #[serde(default)]
    pub counter: Option<u32>,
    /// Raw color temperature of a `color_temperature_move`.
    #[serde(default)]
    pub action_color_temperature: Option<f64>,
    /// Hue of an `enhanced_move_to_hue_and_saturation`.
    #[serde(default)]
    pub action_hue: Option<f64>,
    /// Target level of a `brightness_move_to_level`.
    #[serde(default)]
    pub action_level: Option<f64>,
}

impl RemoteEvent {
    /// Creates an event with only an action.
    #[must_use]
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: Some(action.into()),
            ..Self::default()
        }
    }

    /// Parses an event from a raw JSON payload.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the payload is not a JSON object of the
    /// expected shape.
    pub fn from_slice(payload: &[u8]) -> Result<Self, ParseError> {
        Ok(serde_json::from_slice(payload)?)
    }

    /// Returns the action name, or `""` when the event carries none.
    #[must_use]
    pub fn action(&self) -> &str {
        self.action.as_deref().unwrap_or_default()
    }

    /// Sets the action group.
    #[must_use]
    pub fn with_group(mut self, group: u32) -> Self {
        self.action_group = Some(group);
        self
    }

    /// Sets the press counter.
    #[must_use]
    pub fn with_counter(mut self, counter: u32) -> Self {
        self.counter = Some(counter);
        self
    }

    /// Sets the raw color temperature.
    #[must_use]
    pub fn with_color_temperature(mut self, value: f64) -> Self {
        self.action_color_temperature = Some(value);
        self
    }

    /// Sets the hue.
    #[must_use]
    pub fn with_hue(mut self, hue: f64) -> Self {
        self.action_hue = Some(hue);
        self
    }

    /// Sets the target level.
    #[must_use]
    pub fn with_level(mut self, level: f64) -> Self {
        self.action_level = Some(level);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_philips_event() {
        let event =
            RemoteEvent::from_slice(br#"{"action":"off-press","counter":2,"battery":90}"#)
                .unwrap();
        assert_eq!(event, RemoteEvent::new("off-press").with_counter(2));
    }

    #[test]
    fn event_without_action() {
        let event = RemoteEvent::from_slice(br#"{"battery":90,"linkquality":30}"#).unwrap();
        assert_eq!(event.action(), "");
    }

    #[test]
    fn null_action_is_absent() {
        let event = RemoteEvent::from_slice(br#"{"action":null}"#).unwrap();
        assert!(event.action.is_none());
    }

    #[test]
    fn rejects_non_objects() {
        assert!(RemoteEvent::from_slice(b"\"toggle\"").is_err());
        assert!(RemoteEvent::from_slice(b"{").is_err());
    }
}
