// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end tests: remote event -> desired record -> device command ->
//! device report -> report record.

use std::sync::Arc;
use std::time::Duration;

use light_bridge::error::ProtocolError;
use light_bridge::link::{DeviceLink, LinkTiming};
use light_bridge::protocol::Publisher;
use light_bridge::remote::{
    LightDeviceBinding, PaulmannBinding, PaulmannRemote, PhilipsDimmerSwitch, RemoteHandler,
    RemoteRunner, StrategyKind, TradfriRemote,
};
use light_bridge::service::{Health, HealthReporter, Status};
use light_bridge::store::StateStore;
use light_bridge::types::{PowerState, Provenance};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;

const LIGHT: &str = "light-control/devices/TV Light";
const COMMAND_TOPIC: &str = "zigbee2mqtt/TV Light/set";

/// Publisher keeping every message in memory.
#[derive(Debug, Default)]
struct Recorder {
    messages: Mutex<Vec<(String, Value)>>,
}

impl Recorder {
    fn payloads(&self) -> Vec<Value> {
        self.messages
            .lock()
            .iter()
            .map(|(topic, payload)| {
                assert_eq!(topic, COMMAND_TOPIC);
                payload.clone()
            })
            .collect()
    }
}

impl Publisher for Recorder {
    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), ProtocolError> {
        let payload = serde_json::from_slice(&payload).expect("commands are JSON");
        self.messages.lock().push((topic.to_string(), payload));
        Ok(())
    }
}

/// One light with its device link and a remote driving it.
struct Pipeline {
    store: Arc<StateStore>,
    recorder: Arc<Recorder>,
    link_health: watch::Receiver<Health>,
    reports: mpsc::Sender<Vec<u8>>,
    events: mpsc::Sender<Vec<u8>>,
    _stop_link: oneshot::Sender<()>,
    _stop_remote: oneshot::Sender<()>,
    _tasks: Vec<JoinHandle<()>>,
}

impl Pipeline {
    fn start<H: RemoteHandler + 'static>(handler: H) -> Self {
        let store = Arc::new(StateStore::new());
        let recorder = Arc::new(Recorder::default());

        let health = HealthReporter::new("link/TV Light");
        let link_health = health.subscribe();
        let link = DeviceLink::new(
            "TV Light",
            store.light(LIGHT),
            Arc::clone(&recorder),
            health,
            LinkTiming::default(),
        );
        let runner = RemoteRunner::new(
            "Remote",
            handler,
            &store,
            HealthReporter::new("remote/Remote"),
        );

        let (reports, reports_rx) = mpsc::channel(16);
        let (events, events_rx) = mpsc::channel(16);
        let (stop_link, stop_link_rx) = oneshot::channel();
        let (stop_remote, stop_remote_rx) = oneshot::channel();
        let tasks = vec![
            tokio::spawn(async move {
                link.run(reports_rx, stop_link_rx).await;
            }),
            tokio::spawn(async move {
                runner.run(events_rx, stop_remote_rx).await;
            }),
        ];

        Self {
            store,
            recorder,
            link_health,
            reports,
            events,
            _stop_link: stop_link,
            _stop_remote: stop_remote,
            _tasks: tasks,
        }
    }

    async fn press(&self, event: Value) {
        self.events.send(event.to_string().into_bytes()).await.unwrap();
    }

    async fn report(&self, state: Value) {
        self.reports.send(state.to_string().into_bytes()).await.unwrap();
    }

    fn link_status(&self) -> Status {
        self.link_health.borrow().status()
    }
}

#[tokio::test(start_paused = true)]
async fn tradfri_toggle_reaches_device_and_report_returns() {
    let pipeline = Pipeline::start(TradfriRemote::new(LIGHT));
    sleep(Duration::from_millis(10)).await;

    pipeline.press(json!({ "action": "toggle" })).await;
    sleep(Duration::from_millis(100)).await;
    assert_eq!(
        pipeline.recorder.payloads(),
        vec![json!({ "state": "ON", "transition": 0.2 })]
    );
    assert_eq!(pipeline.link_status(), Status::Busy);

    pipeline
        .report(json!({ "state": "ON", "brightness": 255, "linkquality": 80 }))
        .await;
    sleep(Duration::from_millis(10)).await;
    assert_eq!(pipeline.link_status(), Status::Ok);

    let report = pipeline.store.light(LIGHT).report.get();
    assert_eq!(report.power(), Some(PowerState::On));
    assert_eq!(report.provenance(), Some(Provenance::Device));

    // acknowledged: no resend
    sleep(Duration::from_secs(5)).await;
    assert_eq!(pipeline.recorder.payloads().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn remote_reads_reported_state() {
    let pipeline = Pipeline::start(TradfriRemote::new(LIGHT));
    pipeline.report(json!({ "state": "ON", "brightness": 200 })).await;
    sleep(Duration::from_millis(10)).await;

    pipeline.press(json!({ "action": "brightness_down_click" })).await;
    sleep(Duration::from_millis(100)).await;
    assert_eq!(
        pipeline.recorder.payloads(),
        vec![json!({ "brightness": 175, "transition": 0.2 })]
    );

    pipeline.press(json!({ "action": "toggle" })).await;
    sleep(Duration::from_millis(100)).await;
    let payloads = pipeline.recorder.payloads();
    assert_eq!(payloads.len(), 2);
    assert_eq!(payloads[1], json!({ "state": "OFF" }));
}

#[tokio::test(start_paused = true)]
async fn brightness_click_after_external_switch_on_is_not_an_off_command() {
    let pipeline = Pipeline::start(TradfriRemote::new(LIGHT));
    pipeline.report(json!({ "state": "ON", "brightness": 200 })).await;
    sleep(Duration::from_millis(10)).await;

    pipeline.press(json!({ "action": "toggle" })).await;
    sleep(Duration::from_millis(100)).await;
    pipeline.report(json!({ "state": "OFF" })).await;
    sleep(Duration::from_millis(10)).await;

    // switched back on at the wall; the desired record still says OFF
    pipeline.report(json!({ "state": "ON", "brightness": 200 })).await;
    sleep(Duration::from_millis(10)).await;
    assert_eq!(
        pipeline.store.light(LIGHT).desired.get().power(),
        Some(PowerState::Off)
    );

    pipeline.press(json!({ "action": "brightness_up_click" })).await;
    sleep(Duration::from_millis(100)).await;
    assert_eq!(
        pipeline.recorder.payloads(),
        vec![
            json!({ "state": "OFF" }),
            json!({ "brightness": 225, "transition": 0.2 }),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn unacknowledged_command_is_resent() {
    let pipeline = Pipeline::start(TradfriRemote::new(LIGHT));
    sleep(Duration::from_millis(10)).await;

    pipeline.press(json!({ "action": "brightness_up_hold" })).await;
    sleep(Duration::from_millis(100)).await;
    assert_eq!(pipeline.recorder.payloads().len(), 1);

    sleep(Duration::from_millis(2000)).await;
    let payloads = pipeline.recorder.payloads();
    assert_eq!(payloads.len(), 2);
    assert_eq!(payloads[0], payloads[1]);

    pipeline.report(json!({ "brightness": 255 })).await;
    sleep(Duration::from_secs(5)).await;
    assert_eq!(pipeline.recorder.payloads().len(), 2);
    assert_eq!(pipeline.link_status(), Status::Ok);
}

#[tokio::test(start_paused = true)]
async fn philips_template_replaces_desired_state() {
    let binding = LightDeviceBinding::new(LIGHT)
        .reset_template(
            serde_json::from_value(json!({ "effect": null, "color_temp": null })).unwrap(),
        )
        .template(serde_json::from_value(json!({ "color_temp": 370 })).unwrap())
        .template(
            serde_json::from_value(json!({ "effect": "candle", "brightness": 120 })).unwrap(),
        );
    let pipeline = Pipeline::start(PhilipsDimmerSwitch::new(vec![binding]));
    pipeline.report(json!({ "state": "ON" })).await;
    sleep(Duration::from_millis(10)).await;

    pipeline.press(json!({ "action": "on-press" })).await;
    sleep(Duration::from_millis(100)).await;
    assert_eq!(
        pipeline.recorder.payloads(),
        vec![json!({ "state": "ON", "transition": 0, "effect": "candle", "brightness": 120 })]
    );

    pipeline.press(json!({ "action": "on-hold" })).await;
    sleep(Duration::from_millis(100)).await;
    let desired = pipeline.store.light(LIGHT).desired.get();
    assert!(!desired.contains_key("effect"));
    assert_eq!(
        pipeline.recorder.payloads()[1],
        json!({ "state": "ON", "transition": 0, "color_temp": 370 })
    );
}

#[tokio::test(start_paused = true)]
async fn paulmann_move_steps_follow_reports() {
    let remote = PaulmannRemote::new(vec![PaulmannBinding::new(
        LIGHT,
        StrategyKind::ZigbeeColor.build(),
    )]);
    let pipeline = Pipeline::start(remote);
    pipeline.report(json!({ "state": "ON", "brightness": 100 })).await;
    sleep(Duration::from_millis(10)).await;

    pipeline
        .press(json!({ "action": "brightness_move_up", "action_group": 1 }))
        .await;
    sleep(Duration::from_millis(100)).await;
    assert_eq!(
        pipeline.recorder.payloads(),
        vec![json!({ "brightness": 125 })]
    );

    // the device follows each command
    pipeline.report(json!({ "brightness": 125 })).await;
    sleep(Duration::from_millis(500)).await;
    assert_eq!(
        pipeline.recorder.payloads().last(),
        Some(&json!({ "brightness": 150 }))
    );

    pipeline
        .press(json!({ "action": "brightness_stop", "action_group": 1 }))
        .await;
    let sent = pipeline.recorder.payloads().len();
    sleep(Duration::from_secs(2)).await;
    // no further steps; only resends of the last command
    assert!(
        pipeline
            .recorder
            .payloads()
            .iter()
            .skip(sent)
            .all(|p| p == &json!({ "brightness": 150 }))
    );
}
