// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT session to one zigbee2mqtt topic.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use rumqttc::{AsyncClient, EventLoop, MqttOptions, QoS};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::ProtocolError;
use crate::protocol::Publisher;

/// Global counter for generating unique client IDs.
static CLIENT_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// How long startup waits for the broker to acknowledge the subscription.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Pause between reconnection attempts after the session was established.
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Capacity of the inbound message channel.
const MESSAGE_CHANNEL_CAPACITY: usize = 64;

/// An MQTT session subscribed to a single topic.
///
/// Inbound publishes on the subscribed topic are forwarded as raw payloads
/// over the channel returned by [`connect`](Self::connect). Outbound
/// messages are sent through the [`Publisher`] implementation.
///
/// # Examples
///
/// ```no_run
/// use light_bridge::protocol::{MqttSession, Publisher, command_topic, device_topic};
///
/// # async fn example() -> Result<(), light_bridge::error::ProtocolError> {
/// let (session, mut reports) =
///     MqttSession::connect("mqtt://192.168.1.50:1883", device_topic("TV Light")).await?;
///
/// session.publish(&command_topic("TV Light"), br#"{"state":"ON"}"#.to_vec())?;
/// if let Some(report) = reports.recv().await {
///     println!("{}", String::from_utf8_lossy(&report));
/// }
/// session.disconnect().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MqttSession {
    client: AsyncClient,
    topic: String,
    events: JoinHandle<()>,
}

impl MqttSession {
    /// Connects to a broker and subscribes to `topic`.
    ///
    /// Resolves once the broker acknowledged the subscription.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the URL is invalid, the broker refuses the
    /// connection or subscription, or does not answer within 5 seconds.
    pub async fn connect(
        broker_url: &str,
        topic: impl Into<String>,
    ) -> Result<(Self, mpsc::Receiver<Vec<u8>>), ProtocolError> {
        MqttSessionBuilder::new()
            .broker(broker_url)
            .topic(topic)
            .build()
            .await
    }

    /// Returns the subscribed topic.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Disconnects from the broker and stops the event loop.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the disconnect request cannot be queued.
    pub async fn disconnect(self) -> Result<(), ProtocolError> {
        tracing::debug!(topic = %self.topic, "Disconnecting MQTT session");
        self.client.disconnect().await?;
        let mut events = self.events;
        if tokio::time::timeout(RECONNECT_DELAY, &mut events)
            .await
            .is_err()
        {
            events.abort();
        }
        Ok(())
    }
}

impl Publisher for MqttSession {
    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), ProtocolError> {
        tracing::debug!(
            topic = %topic,
            payload = %String::from_utf8_lossy(&payload),
            "Publishing MQTT message"
        );
        self.client
            .try_publish(topic, QoS::AtLeastOnce, false, payload)
            .map_err(ProtocolError::Mqtt)
    }
}

/// Builder for an [`MqttSession`] with custom options.
#[derive(Debug, Default)]
pub struct MqttSessionBuilder {
    broker: Option<String>,
    topic: Option<String>,
    username: Option<String>,
    password: Option<String>,
    client_id: Option<String>,
    keep_alive: Option<Duration>,
}

impl MqttSessionBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the MQTT broker URL (`mqtt://host:port`, `tcp://host:port` or `host[:port]`).
    #[must_use]
    pub fn broker(mut self, broker: impl Into<String>) -> Self {
        self.broker = Some(broker.into());
        self
    }

    /// Sets the topic to subscribe to.
    #[must_use]
    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// Sets authentication credentials for the broker.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Sets a custom client ID.
    #[must_use]
    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = Some(id.into());
        self
    }

    /// Sets the keep-alive interval.
    #[must_use]
    pub fn keep_alive(mut self, duration: Duration) -> Self {
        self.keep_alive = Some(duration);
        self
    }

    /// Connects and subscribes.
    ///
    /// # Errors
    ///
    /// Returns error if required fields are missing or the connection fails.
    pub async fn build(self) -> Result<(MqttSession, mpsc::Receiver<Vec<u8>>), ProtocolError> {
        let broker = self
            .broker
            .ok_or_else(|| ProtocolError::InvalidAddress("broker is required".to_string()))?;
        let topic = self
            .topic
            .ok_or_else(|| ProtocolError::InvalidAddress("topic is required".to_string()))?;

        let (host, port) = parse_mqtt_url(&broker)?;

        // PID + counter avoids client ID conflicts between sessions
        let client_id = self.client_id.unwrap_or_else(|| {
            let counter = CLIENT_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
            format!("light_bridge_{}_{}", std::process::id(), counter)
        });

        let mut mqtt_options = MqttOptions::new(&client_id, host, port);
        mqtt_options.set_keep_alive(self.keep_alive.unwrap_or(Duration::from_secs(30)));
        mqtt_options.set_clean_session(true);
        if let (Some(username), Some(password)) = (self.username, self.password) {
            mqtt_options.set_credentials(username, password);
        }

        let (client, event_loop) = AsyncClient::new(mqtt_options, 10);
        let (message_tx, message_rx) = mpsc::channel(MESSAGE_CHANNEL_CAPACITY);
        let (ready_tx, ready_rx) = oneshot::channel();

        client
            .subscribe(&topic, QoS::AtLeastOnce)
            .await
            .map_err(ProtocolError::Mqtt)?;

        let events = tokio::spawn(handle_mqtt_events(
            event_loop,
            client.clone(),
            topic.clone(),
            message_tx,
            ready_tx,
        ));

        #[allow(clippy::cast_possible_truncation)]
        let timeout_ms = CONNECT_TIMEOUT.as_millis() as u64;
        let ready = match tokio::time::timeout(CONNECT_TIMEOUT, ready_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ProtocolError::ChannelClosed(
                "MQTT event loop stopped".to_string(),
            )),
            Err(_) => Err(ProtocolError::Timeout(timeout_ms)),
        };
        if let Err(e) = ready {
            events.abort();
            return Err(e);
        }

        tracing::debug!(broker = %broker, topic = %topic, "MQTT session ready");
        Ok((
            MqttSession {
                client,
                topic,
                events,
            },
            message_rx,
        ))
    }
}

/// Parses an MQTT URL into host and port.
fn parse_mqtt_url(url: &str) -> Result<(String, u16), ProtocolError> {
    let url = url
        .strip_prefix("mqtt://")
        .or_else(|| url.strip_prefix("tcp://"))
        .unwrap_or(url);
    let url = url.trim_end_matches('/');

    if url.is_empty() {
        return Err(ProtocolError::InvalidAddress("empty broker host".to_string()));
    }

    let (host, port) = if let Some((h, p)) = url.rsplit_once(':') {
        let port = p
            .parse()
            .map_err(|_| ProtocolError::InvalidAddress(format!("Invalid port: {p}")))?;
        (h.to_string(), port)
    } else {
        (url.to_string(), 1883)
    };

    Ok((host, port))
}

/// Drives the rumqttc event loop.
///
/// Until the subscription is acknowledged, any error is reported through
/// `ready` and ends the loop. Afterwards errors are logged and polling
/// continues, which makes rumqttc reconnect; the topic is re-subscribed on
/// every fresh session.
async fn handle_mqtt_events(
    mut event_loop: EventLoop,
    client: AsyncClient,
    topic: String,
    message_tx: mpsc::Sender<Vec<u8>>,
    ready: oneshot::Sender<Result<(), ProtocolError>>,
) {
    use rumqttc::{Event, Outgoing, Packet, SubscribeReasonCode};

    let mut ready = Some(ready);

    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(connack))) => {
                tracing::debug!(?connack, topic = %topic, "MQTT connected");
                if ready.is_none() && !connack.session_present {
                    if let Err(e) = client.try_subscribe(&topic, QoS::AtLeastOnce) {
                        tracing::error!(error = %e, topic = %topic, "MQTT re-subscribe failed");
                    }
                }
            }
            Ok(Event::Incoming(Packet::SubAck(suback))) => {
                tracing::debug!(?suback, "MQTT subscription acknowledged");
                if let Some(ready) = ready.take() {
                    let refused = suback
                        .return_codes
                        .iter()
                        .any(|code| matches!(code, SubscribeReasonCode::Failure));
                    let result = if refused {
                        Err(ProtocolError::ConnectionFailed(format!(
                            "broker refused subscription to {topic}"
                        )))
                    } else {
                        Ok(())
                    };
                    let failed = result.is_err();
                    let _ = ready.send(result);
                    if failed {
                        break;
                    }
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                if publish.topic == topic {
                    tracing::trace!(topic = %publish.topic, "Received MQTT message");
                    if message_tx.send(publish.payload.to_vec()).await.is_err() {
                        tracing::debug!(topic = %topic, "Message receiver dropped");
                        break;
                    }
                } else {
                    tracing::trace!(topic = %publish.topic, "Ignoring message for other topic");
                }
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                tracing::debug!(topic = %topic, "MQTT session closed");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                if let Some(ready) = ready.take() {
                    let _ = ready.send(Err(ProtocolError::ConnectionFailed(e.to_string())));
                    break;
                }
                tracing::error!(error = %e, topic = %topic, "MQTT event loop error");
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_mqtt_url_with_port() {
        let (host, port) = parse_mqtt_url("mqtt://192.168.1.50:1883").unwrap();
        assert_eq!(host, "192.168.1.50");
        assert_eq!(port, 1883);
    }

    #[test]
    fn parse_mqtt_url_default_port() {
        let (host, port) = parse_mqtt_url("mqtt://helios4.local").unwrap();
        assert_eq!(host, "helios4.local");
        assert_eq!(port, 1883);
    }

    #[test]
    fn parse_mqtt_url_tcp_scheme() {
        let (host, port) = parse_mqtt_url("tcp://broker.local:8883").unwrap();
        assert_eq!(host, "broker.local");
        assert_eq!(port, 8883);
    }

    #[test]
    fn parse_mqtt_url_invalid_port() {
        assert!(matches!(
            parse_mqtt_url("mqtt://broker:abc"),
            Err(ProtocolError::InvalidAddress(_))
        ));
    }

    #[test]
    fn parse_mqtt_url_empty_host() {
        assert!(parse_mqtt_url("mqtt://").is_err());
    }

    #[test]
    fn builder_with_credentials() {
        let builder = MqttSessionBuilder::new()
            .broker("mqtt://broker:1883")
            .topic("zigbee2mqtt/TV Light")
            .credentials("user", "pass")
            .client_id("my_client")
            .keep_alive(Duration::from_secs(60));

        assert_eq!(builder.broker, Some("mqtt://broker:1883".to_string()));
        assert_eq!(builder.topic, Some("zigbee2mqtt/TV Light".to_string()));
        assert_eq!(builder.username, Some("user".to_string()));
        assert_eq!(builder.password, Some("pass".to_string()));
        assert_eq!(builder.client_id, Some("my_client".to_string()));
        assert_eq!(builder.keep_alive, Some(Duration::from_secs(60)));
    }

    #[tokio::test]
    async fn build_requires_topic() {
        let result = MqttSessionBuilder::new().broker("mqtt://broker").build().await;
        assert!(matches!(result, Err(ProtocolError::InvalidAddress(_))));
    }
}
