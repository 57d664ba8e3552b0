// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Process wiring.
//!
//! A [`Bridge`] starts one task per configured device link and remote. Each
//! task opens its own MQTT session, so a broker failure only takes down the
//! components using that broker: the failed component reports `inactive`
//! with the error as reason, the others keep running.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::config::{BridgeConfig, LinkConfig, MqttCredentials, RemoteConfig, RemoteFamily};
use crate::error::ProtocolError;
use crate::link::DeviceLink;
use crate::protocol::{MqttSession, MqttSessionBuilder, device_topic, remote_topic};
use crate::remote::{
    PaulmannBinding, PaulmannRemote, PhilipsDimmerSwitch, RemoteHandler, RemoteRunner,
    TradfriMultiRemote, TradfriRemote,
};
use crate::service::{Health, HealthReporter, ServiceRegistry};
use crate::store::StateStore;

/// Returns the registry name of a device link.
#[must_use]
pub fn link_service(device_name: &str) -> String {
    format!("link/{device_name}")
}

/// Returns the registry name of a remote.
#[must_use]
pub fn remote_service(remote_name: &str) -> String {
    format!("remote/{remote_name}")
}

#[derive(Debug)]
struct Component {
    service: String,
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Running set of device links and remotes.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
///
/// use light_bridge::bridge::Bridge;
/// use light_bridge::config::BridgeConfig;
/// use light_bridge::service::ServiceRegistry;
/// use light_bridge::store::StateStore;
///
/// # async fn example() -> Result<(), light_bridge::Error> {
/// let config = BridgeConfig::load("light-bridge.json")?;
/// let store = Arc::new(StateStore::new());
/// let registry = ServiceRegistry::new();
///
/// let bridge = Bridge::start(&config, &store, &registry);
/// tokio::signal::ctrl_c().await.ok();
/// bridge.stop().await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Bridge {
    components: Vec<Component>,
}

impl Bridge {
    /// Starts every link and remote of `config`.
    ///
    /// Returns immediately; connection progress and failures are visible
    /// through `registry`. Must be called from within a tokio runtime.
    pub fn start(
        config: &BridgeConfig,
        store: &Arc<StateStore>,
        registry: &ServiceRegistry,
    ) -> Self {
        let mut components = Vec::with_capacity(config.links.len() + config.remotes.len());

        for link in &config.links {
            let service = link_service(&link.device_name);
            let health = registry.register(service.clone());
            let (stop, stop_rx) = oneshot::channel();
            let task = tokio::spawn(run_link(link.clone(), Arc::clone(store), health, stop_rx));
            components.push(Component { service, stop, task });
        }

        for remote in &config.remotes {
            let service = remote_service(&remote.remote_name);
            let health = registry.register(service.clone());
            let (stop, stop_rx) = oneshot::channel();
            let task = spawn_remote(remote.clone(), Arc::clone(store), health, stop_rx);
            components.push(Component { service, stop, task });
        }

        tracing::info!(components = components.len(), "Bridge started");
        Self { components }
    }

    /// Returns the registry names of all components, links first.
    pub fn services(&self) -> impl Iterator<Item = &str> {
        self.components.iter().map(|c| c.service.as_str())
    }

    /// Returns the number of components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Returns true if nothing was configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Stops every component and closes its session.
    pub async fn stop(self) {
        let mut tasks = Vec::with_capacity(self.components.len());
        for component in self.components {
            // the task has already ended if its start failed
            let _ = component.stop.send(());
            tasks.push((component.service, component.task));
        }
        for (service, task) in tasks {
            if let Err(e) = task.await {
                tracing::error!(service = %service, error = %e, "Component task failed");
            }
        }
        tracing::info!("Bridge stopped");
    }
}

async fn connect(
    broker_url: &str,
    topic: String,
    credentials: Option<&MqttCredentials>,
) -> Result<(MqttSession, mpsc::Receiver<Vec<u8>>), ProtocolError> {
    let mut builder = MqttSessionBuilder::new().broker(broker_url).topic(topic);
    if let Some(credentials) = credentials {
        builder = builder.credentials(&credentials.username, &credentials.password);
    }
    builder.build().await
}

async fn close(session: MqttSession) {
    let topic = session.topic().to_string();
    if let Err(e) = session.disconnect().await {
        tracing::warn!(topic = %topic, error = %e, "Unable to disconnect MQTT session");
    }
}

async fn run_link(
    config: LinkConfig,
    store: Arc<StateStore>,
    health: HealthReporter,
    stop: oneshot::Receiver<()>,
) {
    let topic = device_topic(&config.device_name);
    let (session, reports) =
        match connect(&config.mqtt_url, topic, config.credentials.as_ref()).await {
            Ok(connection) => connection,
            Err(e) => {
                tracing::error!(
                    device = %config.device_name,
                    error = %e,
                    "Unable to start device link"
                );
                health.set(Health::failed(e.to_string()));
                return;
            }
        };
    tracing::info!(device = %config.device_name, record = %config.record, "Device link started");

    let link = DeviceLink::new(
        &config.device_name,
        store.light(&config.record),
        session,
        health,
        config.timing.into(),
    );
    let session = link.run(reports, stop).await;
    close(session).await;
}

fn spawn_remote(
    config: RemoteConfig,
    store: Arc<StateStore>,
    health: HealthReporter,
    stop: oneshot::Receiver<()>,
) -> JoinHandle<()> {
    match config.family.clone() {
        RemoteFamily::Tradfri { record, presets } => {
            let handler = match presets {
                Some(presets) => TradfriRemote::with_presets(record, presets),
                None => TradfriRemote::new(record),
            };
            tokio::spawn(run_remote(handler, config, store, health, stop))
        }
        RemoteFamily::TradfriMulti { bindings } => {
            let handler = TradfriMultiRemote::new(bindings);
            tokio::spawn(run_remote(handler, config, store, health, stop))
        }
        RemoteFamily::Paulmann { bindings } => {
            let bindings = bindings
                .into_iter()
                .map(|b| PaulmannBinding::new(b.record, b.strategy.build()))
                .collect();
            let handler = PaulmannRemote::new(bindings);
            tokio::spawn(run_remote(handler, config, store, health, stop))
        }
        RemoteFamily::Philips { bindings } => {
            let handler = PhilipsDimmerSwitch::new(bindings);
            tokio::spawn(run_remote(handler, config, store, health, stop))
        }
    }
}

async fn run_remote<H: RemoteHandler + 'static>(
    handler: H,
    config: RemoteConfig,
    store: Arc<StateStore>,
    health: HealthReporter,
    stop: oneshot::Receiver<()>,
) {
    let topic = remote_topic(&config.remote_name);
    let (session, events) =
        match connect(&config.mqtt_url, topic, config.credentials.as_ref()).await {
            Ok(connection) => connection,
            Err(e) => {
                tracing::error!(remote = %config.remote_name, error = %e, "Unable to start remote");
                health.set(Health::failed(e.to_string()));
                return;
            }
        };
    tracing::info!(
        remote = %config.remote_name,
        family = config.family.name(),
        "Remote started"
    );

    let runner = RemoteRunner::new(&config.remote_name, handler, &store, health);
    runner.run(events, stop).await;
    close(session).await;
}
