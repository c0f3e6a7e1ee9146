use anyhow::{bail, Context, Result};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::messages::{parse_server_message, ClientSetupMessage, LiveEvent, RealtimeInputMessage};
use super::transport::{ConnectionGuard, LiveConnection, LiveTransport};

const OUTBOUND_CAPACITY: usize = 64;
const EVENT_CAPACITY: usize = 256;

/// WebSocket transport to the Gemini Live API
pub struct GeminiLiveTransport {
    endpoint: String,
    api_key: String,
}

impl GeminiLiveTransport {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }
}

/// JSON payload of a frame, if it carries one
fn payload(msg: &Message) -> Option<&[u8]> {
    match msg {
        Message::Text(text) => Some(text.as_bytes()),
        Message::Binary(bytes) => Some(bytes.as_slice()),
        _ => None,
    }
}

#[async_trait::async_trait]
impl LiveTransport for GeminiLiveTransport {
    async fn connect(&self, setup: &ClientSetupMessage) -> Result<LiveConnection> {
        info!("Connecting to Live API at {}", self.endpoint);

        let url = format!("{}?key={}", self.endpoint, self.api_key);
        let (socket, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .context("Failed to connect to Live API")?;
        let (mut sink, mut stream) = socket.split();

        sink.send(Message::Text(serde_json::to_string(setup)?))
            .await
            .context("Failed to send setup message")?;

        // Wait for the handshake acknowledgement
        loop {
            let msg = match stream.next().await {
                Some(msg) => msg.context("Live API connection failed during setup")?,
                None => bail!("Live API closed the connection during setup"),
            };

            if let Message::Close(frame) = &msg {
                bail!(
                    "Live API rejected setup: {}",
                    frame.as_ref().map(|f| f.reason.to_string()).unwrap_or_default()
                );
            }
            if let Some(bytes) = payload(&msg) {
                if parse_server_message(bytes)?.contains(&LiveEvent::SetupComplete) {
                    break;
                }
            }
        }

        let session_id = uuid::Uuid::new_v4().to_string();
        info!("Live session {} established", session_id);

        let (outbound_tx, mut outbound_rx) = mpsc::channel::<Vec<u8>>(OUTBOUND_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel(EVENT_CAPACITY);

        // Send half: runs until every outbound sender is dropped
        tokio::spawn(async move {
            while let Some(pcm) = outbound_rx.recv().await {
                let text = match serde_json::to_string(&RealtimeInputMessage::audio(&pcm)) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("Failed to serialize audio chunk: {}", e);
                        continue;
                    }
                };
                if let Err(e) = sink.send(Message::Text(text)).await {
                    debug!("Live API send failed, dropping outbound audio: {}", e);
                    break;
                }
            }
            let _ = sink.close().await;
            debug!("Live API send half closed");
        });

        // Receive half
        let reader = tokio::spawn(async move {
            while let Some(msg) = stream.next().await {
                let msg = match msg {
                    Ok(msg) => msg,
                    Err(e) => {
                        let _ = event_tx.send(LiveEvent::Error(e.to_string())).await;
                        return;
                    }
                };

                if let Message::Close(frame) = &msg {
                    let reason = frame
                        .as_ref()
                        .map(|f| f.reason.to_string())
                        .unwrap_or_else(|| "closed by server".to_string());
                    let _ = event_tx.send(LiveEvent::Closed { reason }).await;
                    return;
                }

                let Some(bytes) = payload(&msg) else {
                    continue;
                };
                match parse_server_message(bytes) {
                    Ok(events) => {
                        for event in events {
                            if event_tx.send(event).await.is_err() {
                                return;
                            }
                        }
                    }
                    Err(e) => warn!("Skipping unparseable Live API message: {:#}", e),
                }
            }

            let _ = event_tx
                .send(LiveEvent::Closed {
                    reason: "connection ended".to_string(),
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
        "Gemini Live"
    }
}
