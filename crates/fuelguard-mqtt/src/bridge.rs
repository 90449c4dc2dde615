use crate::dispatch::{InboundMessage, MessageHandler, ShardedDispatcher};
use crate::topic::{parse_topic, MessageKind, DATA_TOPIC_FILTER, STATUS_TOPIC_FILTER};
use fuelguard_domain::{DomainError, IngestionService};
use futures::FutureExt;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Clone)]
pub struct MqttBridgeConfig {
    pub broker_host: String,
    pub broker_port: u16,
    pub client_id: String,
    pub keep_alive_secs: u64,
    pub reconnect_delay_secs: u64,
    pub shards: usize,
    pub queue_depth: usize,
}

/// Bridges the device-facing MQTT broker into the ingestion pipeline.
///
/// Subscribes to the data and status topic families and feeds each publish
/// through a sharded dispatcher so one slow device cannot stall the rest of
/// the fleet.
pub struct MqttIngestBridge {
    config: MqttBridgeConfig,
    ingestion: Arc<IngestionService>,
}

impl MqttIngestBridge {
    pub fn new(config: MqttBridgeConfig, ingestion: Arc<IngestionService>) -> Self {
        Self { config, ingestion }
    }

    /// Run until the token is cancelled. Broker failures reconnect with a
    /// fixed delay; subscriptions are re-established on every ConnAck since
    /// sessions are clean.
    #[instrument(name = "mqtt_bridge", skip_all, fields(
        broker_host = %self.config.broker_host,
        broker_port = self.config.broker_port,
    ))]
    pub async fn run(self, shutdown_token: CancellationToken) {
        let dispatcher = ShardedDispatcher::new(
            self.config.shards,
            self.config.queue_depth,
            ingest_handler(Arc::clone(&self.ingestion)),
        );

        let mut mqtt_options = MqttOptions::new(
            &self.config.client_id,
            &self.config.broker_host,
            self.config.broker_port,
        );
        mqtt_options.set_keep_alive(Duration::from_secs(self.config.keep_alive_secs));
        mqtt_options.set_clean_session(true);

        let (client, mut eventloop) = AsyncClient::new(mqtt_options, 64);

        info!("starting MQTT ingest bridge");

        loop {
            tokio::select! {
                _ = shutdown_token.cancelled() => {
                    debug!("shutdown signal received");
                    let _ = client.disconnect().await;
                    break;
                }
                event = eventloop.poll() => {
                    match event {
                        Ok(Event::Incoming(Packet::ConnAck(_))) => {
                            info!("connected to MQTT broker");
                            if let Err(e) = subscribe_device_topics(&client).await {
                                error!(error = %e, "failed to subscribe to device topics");
                            }
                        }
                        Ok(Event::Incoming(Packet::SubAck(_))) => {
                            debug!("subscription acknowledged");
                        }
                        Ok(Event::Incoming(Packet::Publish(publish))) => {
                            match parse_topic(&publish.topic) {
                                Ok(parsed) => dispatcher.dispatch(InboundMessage {
                                    device_id: parsed.device_id,
                                    kind: parsed.kind,
                                    payload: publish.payload.to_vec(),
                                }),
                                Err(e) => {
                                    warn!(
                                        topic = %publish.topic,
                                        error = %e,
                                        "skipping message on unrecognized topic"
                                    );
                                }
                            }
                        }
                        Ok(_) => {}
                        Err(e) => {
                            error!(error = %e, "MQTT event loop error, reconnecting");
                            tokio::select! {
                                _ = shutdown_token.cancelled() => break,
                                _ = tokio::time::sleep(
                                    Duration::from_secs(self.config.reconnect_delay_secs),
                                ) => {}
                            }
                        }
                    }
                }
            }
        }

        dispatcher.shutdown().await;
        info!("MQTT ingest bridge stopped");
    }
}

async fn subscribe_device_topics(client: &AsyncClient) -> Result<(), rumqttc::ClientError> {
    client
        .subscribe(DATA_TOPIC_FILTER, QoS::AtLeastOnce)
        .await?;
    client
        .subscribe(STATUS_TOPIC_FILTER, QoS::AtLeastOnce)
        .await?;
    info!(
        data_topic = DATA_TOPIC_FILTER,
        status_topic = STATUS_TOPIC_FILTER,
        "subscribed to device topics"
    );
    Ok(())
}

/// Per-message handler run on a dispatcher worker. Rejections that stem from
/// the message itself are warnings; infrastructure failures are errors.
fn ingest_handler(ingestion: Arc<IngestionService>) -> MessageHandler {
    Arc::new(move |message: InboundMessage| {
        let ingestion = Arc::clone(&ingestion);
        async move {
            let result = match message.kind {
                MessageKind::Data => {
                    ingestion
                        .handle_data(&message.device_id, &message.payload)
                        .await
                }
                MessageKind::Status => {
                    ingestion
                        .handle_status(&message.device_id, &message.payload)
                        .await
                }
            };

            match result {
                Ok(()) => {}
                Err(
                    e @ (DomainError::InvalidPayload(_)
                    | DomainError::DeviceNotFound(_)
                    | DomainError::DeviceUnassigned(_)),
                ) => {
                    warn!(
                        device_id = %message.device_id,
                        error = %e,
                        "dropping message"
                    );
                }
                Err(e) => {
                    error!(
                        device_id = %message.device_id,
                        error = %e,
                        "failed to process message"
                    );
                }
            }
        }
        .boxed()
    })
}
