// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Event loop connecting one light's records to its broker topics.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use super::delivery::{Delivery, MAX_RESENDS, Phase, Resend};
use crate::protocol::{Publisher, command_topic};
use crate::service::{Health, HealthReporter};
use crate::state::LightState;
use crate::store::{LightRecords, RecordSubscription};
use crate::timer::Timer;
use crate::types::Provenance;

/// Timing parameters of a device link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkTiming {
    /// Window in which desired-state changes are coalesced.
    pub debounce: Duration,
    /// Delay before an unacknowledged command is sent again.
    pub resend: Duration,
    /// Resends allowed per command before the link is degraded.
    pub max_resends: u32,
}

impl Default for LinkTiming {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(50),
            resend: Duration::from_millis(2000),
            max_resends: MAX_RESENDS,
        }
    }
}

/// Device Link for one physical light.
///
/// Watches the writes to the light's desired-state record, publishes the
/// latest write of each debounce window to the device until a report
/// acknowledges it, and writes every report into the report record tagged
/// as coming from the device.
///
/// Only the written patch is sent, never the accumulated record, so fields
/// left in the record by earlier commands are not replayed.
#[cfg_attr(
    feature = "mqtt",
    doc = r#"
# Examples

```no_run
use light_bridge::link::{DeviceLink, LinkTiming};
use light_bridge::protocol::{MqttSession, device_topic};
use light_bridge::service::HealthReporter;
use light_bridge::store::StateStore;

# async fn example() -> Result<(), light_bridge::Error> {
let store = StateStore::new();
let (session, reports) = MqttSession::connect("mqtt://broker", device_topic("TV Light")).await?;

let link = DeviceLink::new(
    "TV Light",
    store.light("light-control/devices/TV Light"),
    session,
    HealthReporter::new("link/TV Light"),
    LinkTiming::default(),
);
let (_stop, stop_rx) = tokio::sync::oneshot::channel();
link.run(reports, stop_rx).await;
# Ok(())
# }
```
"#
)]
#[derive(Debug)]
pub struct DeviceLink<P> {
    device_name: String,
    command_topic: String,
    records: LightRecords,
    desired: RecordSubscription,
    publisher: P,
    health: HealthReporter,
    timing: LinkTiming,
    delivery: Delivery,
    resend: Timer,
}

impl<P: Publisher> DeviceLink<P> {
    /// Creates a link and subscribes to the desired-state record.
    ///
    /// The current desired state is picked up when [`run`](Self::run) starts.
    pub fn new(
        device_name: impl Into<String>,
        records: LightRecords,
        publisher: P,
        health: HealthReporter,
        timing: LinkTiming,
    ) -> Self {
        let device_name = device_name.into();
        let desired = records.desired.subscribe(true);
        Self {
            command_topic: command_topic(&device_name),
            device_name,
            records,
            desired,
            publisher,
            health,
            timing,
            delivery: Delivery::new(timing.max_resends),
            resend: Timer::new(),
        }
    }

    /// Returns the device name.
    #[must_use]
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Runs the link until `stop` fires (or its sender is dropped), the report
    /// channel closes, or the desired record goes away.
    ///
    /// Returns the publisher so the caller can close the session.
    pub async fn run(
        mut self,
        mut reports: mpsc::Receiver<Vec<u8>>,
        mut stop: oneshot::Receiver<()>,
    ) -> P {
        self.records.desired.when_ready().await;
        self.health.set(Health::ok());

        let mut debounce = Timer::new();
        let mut pending: Option<LightState> = None;

        loop {
            tokio::select! {
                biased;
                _ = &mut stop => break,
                report = reports.recv() => match report {
                    Some(payload) => self.handle_report(&payload),
                    None => break,
                },
                () = self.resend.expired() => {
                    self.resend.cancel();
                    self.handle_resend();
                }
                () = debounce.expired() => {
                    debounce.cancel();
                    if let Some(desired) = pending.take() {
                        self.handle_desired(&desired);
                    }
                }
                change = self.desired.next() => match change {
                    Some(desired) => {
                        pending = Some(desired);
                        if !debounce.is_armed() {
                            debounce.arm(self.timing.debounce);
                        }
                    }
                    None => break,
                },
            }
        }

        tracing::debug!(device = %self.device_name, "Device link stopped");
        self.desired.discard();
        self.health.set(Health::inactive());
        self.publisher
    }

    fn handle_desired(&mut self, desired: &LightState) {
        let Some(command) = self.delivery.accept(desired) else {
            tracing::trace!(device = %self.device_name, "Ignoring desired state from device");
            return;
        };
        self.health.set(Health::busy());
        self.send(&command);
    }

    fn handle_report(&mut self, payload: &[u8]) {
        let report = match LightState::from_slice(payload) {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(
                    device = %self.device_name,
                    error = %e,
                    payload = %String::from_utf8_lossy(payload),
                    "Unable to parse device message"
                );
                return;
            }
        };

        self.resend.cancel();
        if self.delivery.acknowledge() {
            self.health.set(Health::ok());
        }
        self.records
            .report
            .set(&report.with_provenance(Provenance::Device));
    }

    fn handle_resend(&mut self) {
        match self.delivery.resend_due() {
            Resend::Publish(command) => {
                tracing::warn!(
                    device = %self.device_name,
                    attempt = self.delivery.retries(),
                    "Resending command"
                );
                self.send(&command);
            }
            Resend::Exceeded => {
                tracing::error!(
                    device = %self.device_name,
                    max_resends = self.timing.max_resends,
                    "Device did not acknowledge command, giving up"
                );
                self.health.set(Health::degraded(format!(
                    "no acknowledgement after {} resends",
                    self.timing.max_resends
                )));
            }
            Resend::Idle => {}
        }
    }

    fn send(&mut self, command: &LightState) {
        debug_assert_eq!(self.delivery.phase(), Phase::Sending);
        match serde_json::to_vec(command) {
            Ok(payload) => {
                tracing::debug!(
                    topic = %self.command_topic,
                    payload = %String::from_utf8_lossy(&payload),
                    "Publishing command"
                );
                if let Err(e) = self.publisher.publish(&self.command_topic, payload) {
                    tracing::error!(topic = %self.command_topic, error = %e, "Publish failed");
                }
            }
            Err(e) => {
                tracing::error!(device = %self.device_name, error = %e, "Unable to encode command");
            }
        }
        self.resend.arm(self.timing.resend);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use tokio::sync::watch;
    use tokio::task::JoinHandle;

    use super::*;
    use crate::protocol::testing::RecordingPublisher;
    use crate::service::Status;
    use crate::store::StateStore;

    struct Harness {
        records: LightRecords,
        publisher: Arc<RecordingPublisher>,
        health: watch::Receiver<Health>,
        reports: mpsc::Sender<Vec<u8>>,
        stop: Option<oneshot::Sender<()>>,
        task: JoinHandle<Arc<RecordingPublisher>>,
    }

    impl Harness {
        fn start() -> Self {
            let store = StateStore::new();
            let records = store.light("lights/tv");
            let publisher = Arc::new(RecordingPublisher::default());
            let reporter = HealthReporter::new("link/TV Light");
            let health = reporter.subscribe();
            let (reports, reports_rx) = mpsc::channel(16);
            let (stop, stop_rx) = oneshot::channel();

            let link = DeviceLink::new(
                "TV Light",
                records.clone(),
                Arc::clone(&publisher),
                reporter,
                LinkTiming::default(),
            );
            let task = tokio::spawn(link.run(reports_rx, stop_rx));

            Self {
                records,
                publisher,
                health,
                reports,
                stop: Some(stop),
                task,
            }
        }

        fn desire(&self, value: serde_json::Value) {
            self.records
                .desired
                .set(&LightState::from_value(value).unwrap());
        }

        async fn report(&self, value: serde_json::Value) {
            self.reports
                .send(serde_json::to_vec(&value).unwrap())
                .await
                .unwrap();
        }

        fn status(&self) -> Status {
            self.health.borrow().status()
        }
    }

    async fn sleep_ms(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn publishes_within_one_debounce_window() {
        let h = Harness::start();
        sleep_ms(1).await;
        assert_eq!(h.status(), Status::Ok);

        h.desire(json!({ "state": "ON", "brightness": 30, "from": "control" }));
        sleep_ms(60).await;

        let messages = h.publisher.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].0, "zigbee2mqtt/TV Light/set");
        assert_eq!(messages[0].1, json!({ "state": "ON", "brightness": 30 }));
        assert_eq!(h.status(), Status::Busy);
    }

    #[tokio::test(start_paused = true)]
    async fn burst_collapses_to_latest_value() {
        let h = Harness::start();
        sleep_ms(1).await;

        for brightness in [10, 20, 30, 40] {
            h.desire(json!({ "brightness": brightness }));
            sleep_ms(5).await;
        }
        sleep_ms(100).await;

        let messages = h.publisher.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].1, json!({ "brightness": 40 }));
    }

    #[tokio::test(start_paused = true)]
    async fn report_cancels_resend() {
        let h = Harness::start();
        sleep_ms(1).await;

        h.desire(json!({ "state": "ON" }));
        sleep_ms(60).await;
        h.report(json!({ "state": "ON", "brightness": 254 })).await;
        sleep_ms(10_000).await;

        assert_eq!(h.publisher.count(), 1);
        assert_eq!(h.status(), Status::Ok);
        let reported = h.records.report.get();
        assert_eq!(reported.provenance(), Some(Provenance::Device));
        assert_eq!(reported.brightness(), Some(254.0));
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_reports_do_not_resend() {
        let h = Harness::start();
        sleep_ms(1).await;

        h.desire(json!({ "state": "ON" }));
        sleep_ms(60).await;
        for _ in 0..3 {
            h.report(json!({ "state": "ON" })).await;
            sleep_ms(500).await;
        }
        sleep_ms(10_000).await;

        assert_eq!(h.publisher.count(), 1);
        assert_eq!(h.status(), Status::Ok);
    }

    #[tokio::test(start_paused = true)]
    async fn unacknowledged_command_is_resent_until_budget_exhausted() {
        let h = Harness::start();
        sleep_ms(1).await;

        h.desire(json!({ "state": "ON", "brightness": 100 }));
        sleep_ms(60).await;
        sleep_ms(2000 * 5).await;
        assert_eq!(h.publisher.count(), 6);
        assert_eq!(h.status(), Status::Busy);

        sleep_ms(2000 * 6 + 500).await;
        assert_eq!(h.publisher.count(), 11);
        assert_eq!(h.status(), Status::Degraded);
        let expected = json!({ "state": "ON", "brightness": 100 });
        assert!(h.publisher.messages().iter().all(|(_, m)| *m == expected));

        sleep_ms(60_000).await;
        assert_eq!(h.publisher.count(), 11);

        h.desire(json!({ "brightness": 50 }));
        sleep_ms(60).await;
        assert_eq!(h.publisher.count(), 12);
        assert_eq!(h.status(), Status::Busy);

        h.report(json!({ "state": "ON", "brightness": 50 })).await;
        sleep_ms(1).await;
        assert_eq!(h.status(), Status::Ok);
    }

    #[tokio::test(start_paused = true)]
    async fn report_while_degraded_keeps_degraded() {
        let h = Harness::start();
        sleep_ms(1).await;

        h.desire(json!({ "state": "ON" }));
        sleep_ms(60 + 2000 * 11 + 500).await;
        assert_eq!(h.status(), Status::Degraded);

        h.report(json!({ "state": "ON" })).await;
        sleep_ms(1).await;
        assert_eq!(h.status(), Status::Degraded);
        assert_eq!(h.records.report.get().power(), Some(crate::types::PowerState::On));
    }

    #[tokio::test(start_paused = true)]
    async fn off_command_is_published_alone() {
        let h = Harness::start();
        sleep_ms(1).await;

        h.desire(json!({
            "state": "OFF",
            "brightness": 200,
            "color_temp": 300,
            "transition": 0.2
        }));
        sleep_ms(60).await;

        assert_eq!(h.publisher.messages()[0].1, json!({ "state": "OFF" }));
    }

    #[tokio::test(start_paused = true)]
    async fn only_the_written_patch_is_published() {
        let h = Harness::start();
        sleep_ms(1).await;

        h.desire(json!({ "state": "OFF", "from": "control" }));
        sleep_ms(60).await;
        h.report(json!({ "state": "OFF" })).await;
        sleep_ms(10).await;

        h.desire(json!({ "brightness": 120, "from": "control" }));
        sleep_ms(60).await;

        let messages = h.publisher.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].1, json!({ "brightness": 120 }));
        assert!(h.records.desired.get().is_off());
    }

    #[tokio::test(start_paused = true)]
    async fn device_provenance_is_not_sent_back() {
        let h = Harness::start();
        sleep_ms(1).await;

        h.desire(json!({ "state": "ON", "from": "device" }));
        sleep_ms(5000).await;

        assert_eq!(h.publisher.count(), 0);
        assert_eq!(h.status(), Status::Ok);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_report_is_dropped() {
        let h = Harness::start();
        sleep_ms(1).await;

        h.desire(json!({ "state": "ON" }));
        sleep_ms(60).await;
        h.reports.send(b"{oops".to_vec()).await.unwrap();
        sleep_ms(2000).await;

        assert_eq!(h.publisher.count(), 2);
        assert!(h.records.report.get().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_marks_link_inactive() {
        let mut h = Harness::start();
        sleep_ms(1).await;

        h.stop.take().unwrap().send(()).unwrap();
        let publisher = (&mut h.task).await.unwrap();

        assert_eq!(publisher.count(), 0);
        assert_eq!(h.status(), Status::Inactive);
        assert_eq!(h.records.desired.subscriber_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn initial_desired_state_is_delivered() {
        let store = StateStore::new();
        let records = store.light("lights/desk");
        records
            .desired
            .set(&LightState::new().with("state", "ON").with_provenance(Provenance::Control));

        let publisher = Arc::new(RecordingPublisher::default());
        let link = DeviceLink::new(
            "Desk",
            records,
            Arc::clone(&publisher),
            HealthReporter::new("link/Desk"),
            LinkTiming::default(),
        );
        let (_reports, reports_rx) = mpsc::channel(1);
        let (_stop, stop_rx) = oneshot::channel();
        tokio::spawn(link.run(reports_rx, stop_rx));

        sleep_ms(60).await;
        assert_eq!(publisher.messages()[0].1, json!({ "state": "ON" }));
    }
}
