// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Light state documents.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ParseError;
use crate::types::{PowerState, Provenance, RgbColor};

/// A (possibly partial) light state document.
///
/// The schema is open: which fields exist depends on the light family
/// (`state`, `brightness`, `color`, `color_temp`, `color_temp_percent`,
/// `transition`, pattern descriptors, ...). Well-known fields have typed
/// accessors; everything else is reached through [`get`](Self::get).
///
/// The same type is used for full records and for patches. Merging a patch
/// is last-write-wins per field, and a JSON `null` in a patch deletes the
/// field.
///
/// # Examples
///
/// ```
/// use light_bridge::state::LightState;
/// use light_bridge::types::{PowerState, Provenance};
///
/// let mut state = LightState::new()
///     .with("state", "ON")
///     .with("brightness", 120);
///
/// let patch = LightState::new()
///     .with("brightness", 80)
///     .with_provenance(Provenance::Control);
/// state.merge(&patch);
///
/// assert_eq!(state.power(), Some(PowerState::On));
/// assert_eq!(state.brightness(), Some(80.0));
/// assert_eq!(state.provenance(), Some(Provenance::Control));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LightState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    from: Option<Provenance>,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl LightState {
    /// Creates an empty document without provenance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a document from a raw JSON payload.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the payload is not a JSON object.
    pub fn from_slice(payload: &[u8]) -> Result<Self, ParseError> {
        let value: Value = serde_json::from_slice(payload)?;
        Self::from_value(value)
    }

    /// Builds a document from a JSON value.
    ///
    /// A `from` field is lifted into the provenance tag when it holds a
    /// known tag; an unknown tag is dropped.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::UnexpectedFormat` if the value is not an object.
    pub fn from_value(value: Value) -> Result<Self, ParseError> {
        let Value::Object(mut fields) = value else {
            return Err(ParseError::UnexpectedFormat(
                "expected a JSON object".to_string(),
            ));
        };
        let from = fields
            .remove(Provenance::FIELD)
            .and_then(|tag| tag.as_str().and_then(|s| s.parse().ok()));
        Ok(Self { from, fields })
    }

    /// Adds a field, builder style.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Sets the provenance tag, builder style.
    #[must_use]
    pub fn with_provenance(mut self, from: Provenance) -> Self {
        self.from = Some(from);
        self
    }

    /// Returns the provenance tag.
    #[must_use]
    pub fn provenance(&self) -> Option<Provenance> {
        self.from
    }

    /// Sets or clears the provenance tag.
    pub fn set_provenance(&mut self, from: Option<Provenance>) {
        self.from = from;
    }

    /// Returns a field value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Inserts or replaces a field.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Removes a field, returning its previous value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.remove(key)
    }

    /// Returns true if the field is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Returns the fields (without the provenance tag).
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Returns true if the document has no fields. The provenance tag is
    /// not counted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    // ========== Well-known fields ==========

    /// Returns the `state` field, if it holds a valid power state.
    #[must_use]
    pub fn power(&self) -> Option<PowerState> {
        self.get("state")?.as_str()?.parse().ok()
    }

    /// Returns true if the document commands or reports `state: OFF`.
    #[must_use]
    pub fn is_off(&self) -> bool {
        self.power() == Some(PowerState::Off)
    }

    /// Returns the `brightness` field.
    #[must_use]
    pub fn brightness(&self) -> Option<f64> {
        self.number("brightness")
    }

    /// Returns a numeric field.
    #[must_use]
    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key)?.as_f64()
    }

    /// Returns the `color` field when it is an RGB object, a `{"hex": ..}`
    /// object or a hex string.
    #[must_use]
    pub fn color(&self) -> Option<RgbColor> {
        let color = self.get("color")?;
        let hex = color
            .as_str()
            .or_else(|| color.get("hex").and_then(Value::as_str));
        match hex {
            Some(hex) => hex.parse().ok(),
            None => serde_json::from_value(color.clone()).ok(),
        }
    }

    // ========== Merging and comparison ==========

    /// Merges a patch into this document.
    ///
    /// Each field of the patch replaces the field of the same name; `null`
    /// removes it. The patch's provenance tag, if any, replaces this one.
    pub fn merge(&mut self, patch: &LightState) {
        for (key, value) in &patch.fields {
            if value.is_null() {
                self.fields.remove(key);
            } else {
                self.fields.insert(key.clone(), value.clone());
            }
        }
        if patch.from.is_some() {
            self.from = patch.from;
        }
    }

    /// Copies every field of `patch` over this document, keeping `null`s.
    ///
    /// Used to build commands: a `null` survives until the command is merged
    /// into a record, where it deletes the field.
    pub fn overlay(&mut self, patch: &LightState) {
        for (key, value) in &patch.fields {
            self.fields.insert(key.clone(), value.clone());
        }
        if patch.from.is_some() {
            self.from = patch.from;
        }
    }

    /// Returns this document with `patch` overlaid.
    #[must_use]
    pub fn overlaid(mut self, patch: &LightState) -> Self {
        self.overlay(patch);
        self
    }

    /// Returns a copy without `null` fields.
    #[must_use]
    pub fn without_nulls(&self) -> Self {
        let fields = self
            .fields
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Self {
            from: self.from,
            fields,
        }
    }

    /// Returns true if this document, restricted to the keys of `reference`,
    /// deep-equals `reference`.
    ///
    /// A key missing here never matches. Numbers compare by value, so `1`
    /// matches `1.0`. An empty reference always matches.
    ///
    /// # Examples
    ///
    /// ```
    /// use light_bridge::state::LightState;
    ///
    /// let state = LightState::new().with("state", "ON").with("brightness", 30);
    /// assert!(state.matches(&LightState::new().with("state", "ON")));
    /// assert!(!state.matches(&LightState::new().with("state", "OFF")));
    /// assert!(!state.matches(&LightState::new().with("transition", 0.2)));
    /// ```
    #[must_use]
    pub fn matches(&self, reference: &LightState) -> bool {
        reference.fields.iter().all(|(key, expected)| {
            self.fields
                .get(key)
                .is_some_and(|actual| values_equal(actual, expected))
        })
    }

    /// Serializes the document, including the provenance tag.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut fields = self.fields.clone();
        if let Some(from) = self.from {
            fields.insert(Provenance::FIELD.to_string(), Value::from(from.as_str()));
        }
        Value::Object(fields)
    }
}

impl TryFrom<Value> for LightState {
    type Error = ParseError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl FromIterator<(String, Value)> for LightState {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            from: None,
            fields: iter.into_iter().collect(),
        }
    }
}

/// Deep equality where numbers compare by numeric value.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => (x - y).abs() < f64::EPSILON,
            _ => x == y,
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(key, x)| ys.get(key).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}
