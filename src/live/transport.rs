use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::messages::{ClientSetupMessage, LiveEvent};

/// An open remote voice session.
///
/// `outbound` is an ordered stream of 16-bit PCM chunks; `events` yields
/// everything the remote side sends. Dropping every `outbound` sender ends
/// the session's send half; dropping the guard stops receiving.
pub struct LiveConnection {
    pub session_id: String,
    pub outbound: mpsc::Sender<Vec<u8>>,
    pub events: mpsc::Receiver<LiveEvent>,
    pub guard: ConnectionGuard,
}

/// Owns the transport's receive task; aborts it when dropped
pub struct ConnectionGuard {
    reader: Option<JoinHandle<()>>,
}

impl ConnectionGuard {
    pub fn new(reader: JoinHandle<()>) -> Self {
        Self {
            reader: Some(reader),
        }
    }

    /// A guard with nothing to stop (in-process transports)
    pub fn detached() -> Self {
        Self { reader: None }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

/// A way to reach the remote real-time voice service
#[async_trait::async_trait]
pub trait LiveTransport: Send + Sync {
    /// Open a session and complete the setup handshake.
    ///
    /// Returns only once the remote side acknowledged the setup.
    async fn connect(&self, setup: &ClientSetupMessage) -> Result<LiveConnection>;

    /// Transport name for logging
    fn name(&self) -> &str;
}
