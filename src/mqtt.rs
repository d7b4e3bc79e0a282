use crate::broker::{ConnectionStatus, Connector, Publisher};
use crate::config::{BrokerConfig, MqttQos};
use crate::error::*;
use async_trait::async_trait;
use rumqttc::{AsyncClient, ConnectReturnCode, ConnectionError, Event, EventLoop, MqttOptions, Packet, QoS};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

impl From<MqttQos> for QoS {
    fn from(qos: MqttQos) -> Self {
        match qos {
            MqttQos::AtMostOnce => QoS::AtMostOnce,
            MqttQos::AtLeastOnce => QoS::AtLeastOnce,
            MqttQos::ExactlyOnce => QoS::ExactlyOnce,
        }
    }
}

/// Opens MQTT sessions against the configured broker
pub struct MqttConnector {
    config: BrokerConfig,
    status_tx: watch::Sender<ConnectionStatus>,
}

impl MqttConnector {
    pub fn new(config: BrokerConfig) -> Self {
        let (status_tx, _) = watch::channel(ConnectionStatus::Idle);
        Self { config, status_tx }
    }

    /// Connection status of the most recent session.
    pub fn status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_tx.subscribe()
    }
}

#[async_trait]
impl Connector for MqttConnector {
    async fn connect(&self) -> Result<Arc<dyn Publisher>> {
        let client_id = self.config.client_id();
        let mut options = MqttOptions::new(&client_id, &self.config.host, self.config.port);
        options.set_keep_alive(Duration::from_secs(self.config.keepalive_secs));

        let (client, eventloop) = AsyncClient::new(options, 10);
        info!(
            "Connecting to MQTT broker {}:{} as {}",
            self.config.host, self.config.port, client_id
        );
        self.status_tx.send_replace(ConnectionStatus::Connecting);

        let event_loop = tokio::spawn(drive(eventloop, self.status_tx.clone()));

        Ok(Arc::new(MqttPublisher {
            client,
            qos: self.config.qos.into(),
            event_loop,
        }))
    }
}

/// Publishing half of one MQTT session
///
/// Dropping it stops the session's network task.
pub struct MqttPublisher {
    client: AsyncClient,
    qos: QoS,
    event_loop: JoinHandle<()>,
}

#[async_trait]
impl Publisher for MqttPublisher {
    async fn publish(&self, topic: &str, payload: String) -> Result<()> {
        self.client
            .try_publish(topic, self.qos, false, payload)
            .map_err(|e| SimError::Mqtt(e.to_string()))
    }
}

impl Drop for MqttPublisher {
    fn drop(&mut self) {
        self.event_loop.abort();
    }
}

async fn drive(mut eventloop: EventLoop, status: watch::Sender<ConnectionStatus>) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                if ack.code == ConnectReturnCode::Success {
                    info!("Connected to MQTT Broker!");
                    status.send_replace(ConnectionStatus::Connected);
                } else {
                    warn!("Failed to connect, return code {:?}", ack.code);
                    status.send_replace(ConnectionStatus::Refused(format!("{:?}", ack.code)));
                }
            }
            Ok(event) => {
                debug!("MQTT event: {:?}", event);
            }
            Err(ConnectionError::ConnectionRefused(code)) => {
                warn!("Failed to connect, return code {:?}", code);
                status.send_replace(ConnectionStatus::Refused(format!("{:?}", code)));
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
            Err(e) => {
                warn!("MQTT error: {}", e);
                status.send_replace(ConnectionStatus::Failed(e.to_string()));
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }
}
