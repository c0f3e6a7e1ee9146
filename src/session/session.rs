use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

use super::stats::PlaybackCounters;
use crate::audio::{CapturePipeline, PlaybackScheduler, UnitId};
use crate::live::{ConnectionGuard, LiveEvent};
use crate::transcript::{Speaker, TranscriptAccumulator, TranscriptLine};

/// Why a session's event loop ended
#[derive(Debug, Clone, PartialEq)]
pub enum CloseReason {
    /// The user hung up
    Ended,
    /// The remote side closed the session
    Remote(String),
    /// Transport failure
    Failed(String),
}

/// Event loop of one open call.
///
/// Owns the playback scheduler, the capture pipeline and the connection;
/// every piece of per-call state is touched only from this task.
pub struct LiveSession {
    pub session_id: String,
    pub scheduler: PlaybackScheduler,
    pub capture: CapturePipeline,
    pub events: mpsc::Receiver<LiveEvent>,
    pub finished: mpsc::UnboundedReceiver<UnitId>,
    pub guard: ConnectionGuard,
    pub counters: Arc<PlaybackCounters>,
    pub transcript_tx: watch::Sender<Vec<TranscriptLine>>,
    pub end_rx: oneshot::Receiver<()>,
}

impl LiveSession {
    /// Run until the user ends the call or the remote side goes away.
    ///
    /// Devices stay held; call `teardown` afterwards.
    pub async fn wait_for_close(&mut self) -> CloseReason {
        info!("Live session {} open", self.session_id);
        let mut transcript = TranscriptAccumulator::new();

        let reason = loop {
            tokio::select! {
                biased;
                _ = &mut self.end_rx => break CloseReason::Ended,
                Some(id) = self.finished.recv() => self.scheduler.on_finished(id),
                event = self.events.recv() => match event {
                    Some(event) => {
                        if let Some(reason) = self.handle(event, &mut transcript) {
                            break reason;
                        }
                    }
                    None => break CloseReason::Failed("connection dropped".to_string()),
                },
            }
        };

        match &reason {
            CloseReason::Ended => info!("Live session {} ended by user", self.session_id),
            CloseReason::Remote(why) => {
                info!("Live session {} closed by remote: {}", self.session_id, why)
            }
            CloseReason::Failed(why) => {
                error!("Live session {} failed: {}", self.session_id, why)
            }
        }
        reason
    }

    fn handle(&mut self, event: LiveEvent, transcript: &mut TranscriptAccumulator) -> Option<CloseReason> {
        match event {
            LiveEvent::Audio(pcm) => match self.scheduler.enqueue(&pcm) {
                Ok(_) => self.counters.record_chunk(),
                Err(e) => warn!("Dropping server audio segment: {:#}", e),
            },
            LiveEvent::OutputTranscription(text) => {
                transcript.push(Speaker::Match, &text);
                self.transcript_tx.send_replace(transcript.lines().to_vec());
            }
            LiveEvent::InputTranscription(text) => {
                transcript.push(Speaker::You, &text);
                self.transcript_tx.send_replace(transcript.lines().to_vec());
            }
            LiveEvent::Interrupted => {
                self.scheduler.interrupt();
                self.counters.record_interruption();
            }
            LiveEvent::TurnComplete => debug!("Model turn complete"),
            LiveEvent::SetupComplete => {}
            LiveEvent::Closed { reason } => return Some(CloseReason::Remote(reason)),
            LiveEvent::Error(e) => return Some(CloseReason::Failed(e)),
        }
        None
    }

    /// Stop playback, release both devices and clear the transcript
    pub async fn teardown(self) {
        let LiveSession {
            mut scheduler,
            mut capture,
            guard,
            transcript_tx,
            ..
        } = self;

        if let Err(e) = scheduler.shutdown() {
            warn!("Failed to close output device: {:#}", e);
        }
        capture.stop().await;
        drop(guard);

        transcript_tx.send_replace(Vec::new());
    }
}
