use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::backend::{AudioBackend, AudioFrame};
use super::codec;

/// Shared capture counters and the mute switch
#[derive(Debug, Default)]
pub struct CaptureState {
    muted: AtomicBool,
    frames_sent: AtomicU64,
    frames_muted: AtomicU64,
}

impl CaptureState {
    pub fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::SeqCst);
    }

    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::SeqCst)
    }

    pub fn frames_muted(&self) -> u64 {
        self.frames_muted.load(Ordering::SeqCst)
    }
}

/// Bridges a started input backend into the session's outbound PCM channel.
///
/// Frames are encoded and handed off in capture order. While muted, frames
/// are dropped on the floor; nothing is buffered for later.
pub struct CapturePipeline {
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl CapturePipeline {
    /// Spawn the pipeline over a backend that has already been started.
    pub fn spawn(
        mut backend: Box<dyn AudioBackend>,
        mut frames: mpsc::Receiver<AudioFrame>,
        outbound: mpsc::Sender<Vec<u8>>,
        state: Arc<CaptureState>,
    ) -> Self {
        let (stop_tx, mut stop_rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            info!("Capture pipeline started ({})", backend.name());

            loop {
                let frame = tokio::select! {
                    biased;
                    _ = &mut stop_rx => break,
                    frame = frames.recv() => match frame {
                        Some(frame) => frame,
                        None => {
                            debug!("Input backend closed its frame channel");
                            break;
                        }
                    },
                };

                if state.is_muted() {
                    state.frames_muted.fetch_add(1, Ordering::SeqCst);
                    continue;
                }

                let pcm = codec::encode(&frame.samples);
                if outbound.send(pcm).await.is_err() {
                    debug!("Session send path closed, dropping frame {}", frame.sequence);
                    break;
                }
                state.frames_sent.fetch_add(1, Ordering::SeqCst);
            }

            if let Err(e) = backend.stop().await {
                warn!("Failed to stop input backend: {}", e);
            }

            info!(
                "Capture pipeline stopped ({} frames sent, {} dropped while muted)",
                state.frames_sent(),
                state.frames_muted()
            );
        });

        Self {
            stop_tx: Some(stop_tx),
            task: Some(task),
        }
    }

    /// Stop capturing and wait until the input device is released
    pub async fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Capture task failed: {}", e);
            }
        }
    }
}
