// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `light_bridge` - keeps zigbee2mqtt lights in sync with a shared
//! desired-state store and drives that store from physical remotes.
//!
//! Each light has two records in the [`StateStore`](store::StateStore):
//! `<path>/set` holds the desired state, `<path>/is` the state the device
//! last reported.
//!
//! - A [`DeviceLink`](link::DeviceLink) publishes writes to the desired state
//!   to the device and resends them until the device reports back.
//! - A [`RemoteRunner`](remote::RemoteRunner) turns button events of a
//!   remote into partial updates of the desired state. Four remote
//!   families are supported (IKEA Tradfri single and multi light, Paulmann,
//!   Philips Hue dimmer).
//!
//! The [`Bridge`](bridge::Bridge) starts links and remotes from a JSON
//! [`BridgeConfig`](config::BridgeConfig), one MQTT session each.
#![cfg_attr(
    feature = "mqtt",
    doc = r#"
# Quick Start

```no_run
use light_bridge::link::{DeviceLink, LinkTiming};
use light_bridge::protocol::{MqttSession, device_topic, remote_topic};
use light_bridge::remote::{RemoteRunner, TradfriRemote};
use light_bridge::service::ServiceRegistry;
use light_bridge::store::StateStore;

#[tokio::main]
async fn main() -> light_bridge::Result<()> {
    let store = StateStore::new();
    let registry = ServiceRegistry::new();
    let path = "light-control/devices/TV Light";

    let (light, reports) =
        MqttSession::connect("mqtt://helios4.local", device_topic("TV Light")).await?;
    let link = DeviceLink::new(
        "TV Light",
        store.light(path),
        light,
        registry.register("link/TV Light"),
        LinkTiming::default(),
    );

    let (remote, events) =
        MqttSession::connect("mqtt://helios4.local", remote_topic("Tradfri Remote 1")).await?;
    let runner = RemoteRunner::new(
        "Tradfri Remote 1",
        TradfriRemote::new(path),
        &store,
        registry.register("remote/Tradfri Remote 1"),
    );

    let (_stop_link, stop_link) = tokio::sync::oneshot::channel();
    let (_stop_remote, stop_remote) = tokio::sync::oneshot::channel();
    tokio::join!(link.run(reports, stop_link), runner.run(events, stop_remote));
    remote.disconnect().await?;
    Ok(())
}
```
"#
)]
//!
//! # Features
//!
//! - `mqtt` (default): the rumqttc-backed [`MqttSession`](protocol::MqttSession),
//!   the [`bridge`] module and the `light-bridge` binary.

#[cfg(feature = "mqtt")]
pub mod bridge;
pub mod config;
pub mod error;
pub mod link;
pub mod protocol;
pub mod remote;
pub mod service;
pub mod state;
pub mod store;
mod timer;
pub mod types;

pub use error::{ConfigError, Error, ParseError, ProtocolError, Result, ValueError};
