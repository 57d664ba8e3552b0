// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A single shared record.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::state::LightState;

/// Writes buffered per subscriber before it is considered lagging.
const WRITE_CAPACITY: usize = 64;

/// Handle to one record of the [`StateStore`](super::StateStore).
///
/// Handles are cheap to clone; every clone refers to the same document.
/// Every write is also broadcast to subscribers, so a subscriber sees what
/// was written rather than only the merged result.
#[derive(Clone)]
pub struct Record {
    name: Arc<str>,
    state: Arc<RwLock<LightState>>,
    writes: broadcast::Sender<LightState>,
}

impl Record {
    pub(crate) fn new(name: &str) -> Self {
        let (writes, _) = broadcast::channel(WRITE_CAPACITY);
        Self {
            name: Arc::from(name),
            state: Arc::new(RwLock::new(LightState::new())),
            writes,
        }
    }

    /// Returns the record key.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a snapshot of the document.
    #[must_use]
    pub fn get(&self) -> LightState {
        self.state.read().clone()
    }

    /// Merges a patch into the document and notifies subscribers.
    pub fn set(&self, patch: &LightState) {
        tracing::debug!(record = %self.name, patch = ?patch, "Updating record");
        let mut state = self.state.write();
        state.merge(patch);
        // sent under the lock so subscribers observe writes in order
        let _ = self.writes.send(patch.clone());
    }

    /// Replaces the whole document and notifies subscribers.
    pub fn replace(&self, document: LightState) {
        tracing::debug!(record = %self.name, state = ?document, "Replacing record");
        let mut state = self.state.write();
        *state = document.clone();
        let _ = self.writes.send(document);
    }

    /// Empties the document.
    pub fn clear(&self) {
        self.replace(LightState::new());
    }

    /// Subscribes to writes.
    ///
    /// With `emit_initial` the first [`RecordSubscription::next`] yields the
    /// current document immediately.
    #[must_use]
    pub fn subscribe(&self, emit_initial: bool) -> RecordSubscription {
        // subscribe before the snapshot so no write falls in between
        let rx = self.writes.subscribe();
        let initial = emit_initial.then(|| self.get());
        RecordSubscription {
            record: self.clone(),
            rx,
            initial,
        }
    }

    /// Resolves once the initial data of the record is loaded.
    ///
    /// Records of the in-process store are always loaded.
    pub async fn when_ready(&self) {}

    /// Returns the number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.writes.receiver_count()
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// A write subscription on one record.
#[derive(Debug)]
pub struct RecordSubscription {
    record: Record,
    rx: broadcast::Receiver<LightState>,
    initial: Option<LightState>,
}

impl RecordSubscription {
    /// Returns the record key.
    #[must_use]
    pub fn name(&self) -> &str {
        self.record.name()
    }

    /// Waits for the next write and returns it: the patch passed to
    /// [`Record::set`], or the whole document passed to [`Record::replace`].
    ///
    /// A subscriber that fell more than 64 writes behind skips the backlog
    /// and receives the current document instead.
    pub async fn next(&mut self) -> Option<LightState> {
        if let Some(initial) = self.initial.take() {
            return Some(initial);
        }
        match self.rx.recv().await {
            Ok(write) => Some(write),
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(record = %self.record.name, skipped, "Subscriber lagged");
                self.rx = self.rx.resubscribe();
                Some(self.record.get())
            }
            Err(RecvError::Closed) => None,
        }
    }

    /// Ends the subscription.
    pub fn discard(self) {
        tracing::trace!(record = %self.record.name, "Discarding subscription");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::types::Provenance;

    fn state(value: serde_json::Value) -> LightState {
        LightState::from_value(value).unwrap()
    }

    #[test]
    fn set_merges_patches() {
        let record = Record::new("light/set");
        record.set(&state(json!({ "state": "ON", "brightness": 10 })));
        record.set(&state(json!({ "brightness": 20, "from": "control" })));

        let current = record.get();
        assert_eq!(current.brightness(), Some(20.0));
        assert_eq!(current.provenance(), Some(Provenance::Control));
        assert!(current.contains_key("state"));
    }

    #[test]
    fn clear_then_set_leaves_only_the_patch() {
        let record = Record::new("light/set");
        record.set(&state(json!({ "state": "ON", "brightness": 10 })));
        record.clear();
        record.set(&state(json!({ "brightness_step": 25 })));
        assert_eq!(record.get(), state(json!({ "brightness_step": 25 })));
    }

    #[tokio::test]
    async fn subscription_with_initial_value() {
        let record = Record::new("light/set");
        record.set(&state(json!({ "brightness": 1 })));

        let mut sub = record.subscribe(true);
        let first = sub.next().await.unwrap();
        assert_eq!(first.brightness(), Some(1.0));
    }

    #[tokio::test]
    async fn subscription_without_initial_value_waits_for_change() {
        let record = Record::new("light/set");
        record.set(&state(json!({ "brightness": 1 })));

        let mut sub = record.subscribe(false);
        let pending = tokio::time::timeout(Duration::from_millis(10), sub.next()).await;
        assert!(pending.is_err());

        record.set(&state(json!({ "brightness": 2 })));
        assert_eq!(sub.next().await.unwrap().brightness(), Some(2.0));
    }

    #[tokio::test]
    async fn subscription_yields_patches_not_documents() {
        let record = Record::new("light/set");
        record.set(&state(json!({ "state": "OFF", "transition": 0.2 })));

        let mut sub = record.subscribe(false);
        record.set(&state(json!({ "brightness": 225 })));
        record.clear();
        record.set(&state(json!({ "color_temp": 370 })));

        assert_eq!(sub.next().await.unwrap(), state(json!({ "brightness": 225 })));
        assert_eq!(sub.next().await.unwrap(), LightState::new());
        assert_eq!(sub.next().await.unwrap(), state(json!({ "color_temp": 370 })));
    }

    #[tokio::test]
    async fn lagging_subscriber_gets_current_document() {
        let record = Record::new("light/set");
        let mut sub = record.subscribe(false);
        for brightness in 0..100 {
            record.set(&state(json!({ "brightness": brightness, "state": "ON" })));
        }

        let current = sub.next().await.unwrap();
        assert_eq!(current, state(json!({ "brightness": 99, "state": "ON" })));

        let pending = tokio::time::timeout(Duration::from_millis(10), sub.next()).await;
        assert!(pending.is_err());
    }

    #[test]
    fn discard_drops_subscription() {
        let record = Record::new("light/set");
        let sub = record.subscribe(false);
        assert_eq!(record.subscriber_count(), 1);
        sub.discard();
        assert_eq!(record.subscriber_count(), 0);
    }
}
