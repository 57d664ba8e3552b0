// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `light-bridge` binary: runs the links and remotes of a configuration file
//! until interrupted.

use std::process::ExitCode;
use std::sync::Arc;

use light_bridge::bridge::Bridge;
use light_bridge::config::{BridgeConfig, DEFAULT_CONFIG_PATH};
use light_bridge::service::{ServiceRegistry, Status};
use light_bridge::store::StateStore;
use tokio::sync::broadcast::error::RecvError;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = match BridgeConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(path = %config_path, error = %e, "Unable to load configuration");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(
        path = %config_path,
        links = config.links.len(),
        remotes = config.remotes.len(),
        "Loaded configuration"
    );

    let store = Arc::new(StateStore::new());
    let registry = ServiceRegistry::new();
    let mut health = registry.subscribe();
    tokio::spawn(async move {
        loop {
            match health.recv().await {
                Ok(event) if event.health.status() == Status::Degraded => {
                    tracing::warn!(
                        service = %event.service,
                        health = %event.health,
                        "Service degraded"
                    );
                }
                Ok(event) => {
                    tracing::info!(
                        service = %event.service,
                        health = %event.health,
                        "Service status"
                    );
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Health events dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let bridge = Bridge::start(&config, &store, &registry);

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Unable to listen for shutdown signal");
    }
    tracing::info!("Shutting down");
    bridge.stop().await;
    ExitCode::SUCCESS
}
