use anyhow::{bail, Context, Result};
use async_nats::Client;
use futures::stream::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::messages::{input_subject, output_subject, setup_subject, AudioFrameMessage};
use crate::audio::codec;
use crate::live::messages::{parse_server_message, ClientSetupMessage, LiveEvent};
use crate::live::transport::{ConnectionGuard, LiveConnection, LiveTransport};

const OUTBOUND_CAPACITY: usize = 64;
const EVENT_CAPACITY: usize = 256;

/// Input sample rate announced on every published frame
const INPUT_SAMPLE_RATE: u32 = 16000;

pub struct NatsRelayTransport {
    client: Client,
}

impl NatsRelayTransport {
    /// Connect to NATS server
    pub async fn connect(url: &str) -> Result<Self> {
        info!("Connecting to NATS at {}", url);

        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS successfully");

        Ok(Self { client })
    }
}

/// Build the frame published for one PCM chunk
fn frame_message(session_id: &str, sequence: u64, pcm: &[u8], is_final: bool) -> AudioFrameMessage {
    AudioFrameMessage {
        session_id: session_id.to_string(),
        sequence,
        pcm: codec::to_base64(pcm),
        sample_rate: INPUT_SAMPLE_RATE,
        channels: 1,
        timestamp: chrono::Utc::now().to_rfc3339(),
        final_frame: is_final,
    }
}

#[async_trait::async_trait]
impl LiveTransport for NatsRelayTransport {
    async fn connect(&self, setup: &ClientSetupMessage) -> Result<LiveConnection> {
        let session_id = uuid::Uuid::new_v4().to_string();

        // Subscribe first so nothing sent right after the handshake is lost
        let mut output = self
            .client
            .subscribe(output_subject(&session_id))
            .await
            .context("Failed to subscribe to relay output")?;

        let reply = self
            .client
            .request(setup_subject(&session_id), serde_json::to_vec(setup)?.into())
            .await
            .context("Relay did not answer the setup request")?;

        if !parse_server_message(&reply.payload)?.contains(&LiveEvent::SetupComplete) {
            bail!("Relay rejected setup for session {}", session_id);
        }
        info!("Relay session {} established", session_id);

        let (outbound_tx, mut outbound_rx) = mpsc::channel::<Vec<u8>>(OUTBOUND_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel(EVENT_CAPACITY);

        // Publish audio until every outbound sender is dropped, then mark the end
        let client = self.client.clone();
        let id = session_id.clone();
        tokio::spawn(async move {
            let subject = input_subject(&id);
            let mut sequence = 0u64;

            while let Some(pcm) = outbound_rx.recv().await {
                let payload = match serde_json::to_vec(&frame_message(&id, sequence, &pcm, false)) {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!("Failed to serialize audio frame: {}", e);
                        continue;
                    }
                };
                if let Err(e) = client.publish(subject.clone(), payload.into()).await {
                    error!("Failed to publish audio frame: {}", e);
                    break;
                }
                sequence += 1;
            }

            match serde_json::to_vec(&frame_message(&id, sequence, &[], true)) {
                Ok(payload) => {
                    if let Err(e) = client.publish(subject, payload.into()).await {
                        error!("Failed to send final frame: {}", e);
                    }
                }
                Err(e) => warn!("Failed to serialize final frame: {}", e),
            }
            debug!("Relay send half closed after {} frames", sequence);
        });

        let reader = tokio::spawn(async move {
            while let Some(msg) = output.next().await {
                match parse_server_message(&msg.payload) {
                    Ok(events) => {
                        for event in events {
                            if event_tx.send(event).await.is_err() {
                                return;
                            }
                        }
                    }
                    Err(e) => warn!("Skipping unparseable relay message: {:#}", e),
                }
            }

            let _ = event_tx
                .send(LiveEvent::Closed {
                    reason: "relay subscription ended".to_string(),
                })
                .await;
        });

        Ok(LiveConnection {
            session_id,
            outbound: outbound_tx,
            events: event_rx,
            guard: ConnectionGuard::new(reader),
        })
    }

    fn name(&self) -> &str {
        "NATS relay"
    }
}
