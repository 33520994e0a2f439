use rumqttc::{AsyncClient, Event, Packet, QoS};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

use crate::domain::Measurement;
use crate::error::{DecodeError, StoreError, TransportError};
use crate::ports::MeasurementSink;

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Bus connection lifecycle. Single instance per process; reconnects
/// re-establish the subscription but never replay missed messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Subscribed,
    Disconnected,
}

/// Result of one delivery attempt. Exactly one of these is produced
/// per received message, and exactly one metric is recorded from it.
#[derive(Debug)]
pub enum Outcome {
    Stored { topic: String },
    DecodeFailed(DecodeError),
    StoreFailed(StoreError),
}

pub struct IngestProcessor {
    sink: Arc<dyn MeasurementSink>,
}

impl IngestProcessor {
    pub fn new(sink: Arc<dyn MeasurementSink>) -> Self {
        Self { sink }
    }

    /// Decode then write, strictly in order. Failures are returned as
    /// outcome kinds, never propagated; a bad message must not take the
    /// subscription down.
    #[instrument(skip(self, payload), fields(topic = %topic, payload_len = payload.len()))]
    pub async fn process(&self, topic: &str, payload: &[u8]) -> Outcome {
        match Measurement::decode(topic, payload) {
            Ok(measurement) => match self.sink.write(&measurement).await {
                Ok(()) => Outcome::Stored {
                    topic: measurement.topic,
                },
                Err(e) => Outcome::StoreFailed(e),
            },
            Err(e) => Outcome::DecodeFailed(e),
        }
    }

    /// Local accounting: one stored row or one error increment per
    /// delivery, never both, never neither.
    pub fn record(&self, outcome: &Outcome) {
        match outcome {
            Outcome::Stored { topic } => {
                metrics::counter!("mqtt_messages_total", 1, "topic" => topic.clone());
                let now = time::OffsetDateTime::now_utc().unix_timestamp() as f64;
                metrics::gauge!("connector_last_message_unix", now);
            }
            Outcome::DecodeFailed(e) => {
                warn!("Decode failed: {}", e);
                metrics::counter!("connector_errors_total", 1);
            }
            Outcome::StoreFailed(e) => {
                warn!("Store failed: {}", e);
                metrics::counter!("connector_errors_total", 1);
            }
        }
    }
}

/// Ingest loop: owns the subscription lifecycle and fans every delivered
/// message through the processor. One message is fully handled before the
/// next is polled, so a slow store throttles consumption instead of
/// buffering in memory.
pub async fn run_ingest_loop(
    mut eventloop: rumqttc::EventLoop,
    client: AsyncClient,
    processor: IngestProcessor,
    topic_filter: String,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let mut state = ConnectionState::Connecting;

    client.subscribe(&topic_filter, QoS::AtLeastOnce).await?;
    info!("Ingest loop started. Subscribing to {}", topic_filter);

    loop {
        tokio::select! {
            change = shutdown.changed() => {
                if change.is_ok() && *shutdown.borrow() {
                    info!("Shutdown signal received in ingest loop.");
                    break;
                }
            }

            event = eventloop.poll() => {
                match event {
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        let outcome = processor.process(&publish.topic, &publish.payload).await;
                        processor.record(&outcome);

                        // At-least-once: ack only after local accounting.
                        if let Err(e) = client.ack(&publish).await {
                            error!("Ack failed: {:?}", e);
                        }
                    }
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!("Broker connected. Resubscribing to {}", topic_filter);
                        client.subscribe(&topic_filter, QoS::AtLeastOnce).await?;
                        state = ConnectionState::Subscribed;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        let err = TransportError::Disconnected(e);
                        if state != ConnectionState::Disconnected {
                            error!("Transport error: {}", err);
                        }
                        state = ConnectionState::Disconnected;
                        // rumqttc reconnects on the next poll; pace the retries.
                        tokio::time::sleep(RECONNECT_DELAY).await;
                        state = ConnectionState::Connecting;
                    }
                }
            }
        }
    }

    info!("Ingest loop exited.");
    Ok(())
}
