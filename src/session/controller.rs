use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::config::SessionConfig;
use super::devices::DeviceProvider;
use super::error::LiveError;
use super::session::{CloseReason, LiveSession};
use super::stats::{CallStats, PlaybackCounters};
use crate::audio::{AudioBackend, CapturePipeline, CaptureState, PlaybackScheduler};
use crate::dating::UserProfile;
use crate::live::LiveTransport;
use crate::transcript::TranscriptLine;

/// Lifecycle of the one voice session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallPhase {
    Idle,
    Opening,
    Open,
    Closing,
}

/// Snapshot of the controller for status queries
#[derive(Debug, Clone, Serialize)]
pub struct CallStatus {
    pub phase: CallPhase,
    pub profile_id: Option<String>,
    pub muted: bool,
    pub stats: Option<CallStats>,
}

/// What the controller keeps about an open call
#[derive(Clone)]
struct CallInfo {
    generation: u64,
    session_id: String,
    profile_id: String,
    started_at: DateTime<Utc>,
    capture: Arc<CaptureState>,
    counters: Arc<PlaybackCounters>,
}

impl CallInfo {
    fn stats(&self) -> CallStats {
        let duration = Utc::now().signed_duration_since(self.started_at);
        CallStats {
            session_id: self.session_id.clone(),
            profile_id: self.profile_id.clone(),
            started_at: self.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            frames_sent: self.capture.frames_sent(),
            frames_muted: self.capture.frames_muted(),
            chunks_scheduled: self.counters.chunks_scheduled(),
            interruptions: self.counters.interruptions(),
        }
    }
}

struct ActiveCall {
    info: CallInfo,
    transcript: watch::Receiver<Vec<TranscriptLine>>,
    end_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<CloseReason>>,
}

struct ControllerState {
    phase: CallPhase,
    generation: u64,
    /// Profile being dialled while Opening
    opening_profile: Option<String>,
    call: Option<ActiveCall>,
    last_stats: Option<CallStats>,
}

/// Owns the single live voice session.
///
/// Starting while a call is opening or open is rejected without touching
/// the existing call. Ending a call, or the remote side closing it, stops
/// all playback and releases both devices before the phase returns to Idle.
pub struct LiveSessionController {
    config: SessionConfig,
    transport: Arc<dyn LiveTransport>,
    devices: Arc<dyn DeviceProvider>,
    state: Arc<Mutex<ControllerState>>,
    phase_tx: Arc<watch::Sender<CallPhase>>,
}

impl LiveSessionController {
    pub fn new(
        config: SessionConfig,
        transport: Arc<dyn LiveTransport>,
        devices: Arc<dyn DeviceProvider>,
    ) -> Self {
        let (phase_tx, _) = watch::channel(CallPhase::Idle);
        Self {
            config,
            transport,
            devices,
            state: Arc::new(Mutex::new(ControllerState {
                phase: CallPhase::Idle,
                generation: 0,
                opening_profile: None,
                call: None,
                last_stats: None,
            })),
            phase_tx: Arc::new(phase_tx),
        }
    }

    /// Open a call with `profile`. Returns the session id once the remote
    /// side has acknowledged the setup.
    pub async fn start_call(&self, profile: &UserProfile) -> Result<String, LiveError> {
        let generation = {
            let mut state = self.state.lock().await;
            if state.phase != CallPhase::Idle {
                warn!("Call to {} rejected: a call is already in progress", profile.name);
                return Err(LiveError::AlreadyActive);
            }
            state.generation += 1;
            state.opening_profile = Some(profile.id.clone());
            set_phase(&mut state, &self.phase_tx, CallPhase::Opening);
            state.generation
        };

        info!("Calling {} ({})", profile.name, profile.id);

        // Opening runs on its own task so a dropped caller cannot strand
        // the controller in Opening
        let opening = tokio::spawn(open_call(
            self.config.clone(),
            Arc::clone(&self.transport),
            Arc::clone(&self.devices),
            profile.clone(),
            generation,
            Arc::clone(&self.state),
            Arc::clone(&self.phase_tx),
        ));

        match opening.await {
            Ok(result) => result,
            Err(e) => {
                error!("Call setup task failed: {}", e);
                let mut state = self.state.lock().await;
                if state.generation == generation && state.phase == CallPhase::Opening {
                    state.opening_profile = None;
                    set_phase(&mut state, &self.phase_tx, CallPhase::Idle);
                }
                Err(LiveError::Handshake(anyhow::anyhow!("call setup aborted")))
            }
        }
    }

    /// Hang up. Returns once playback has stopped and devices are released.
    pub async fn end_call(&self) -> Result<CallStats, LiveError> {
        let (info, end_tx, task) = {
            let mut state = self.state.lock().await;
            if state.phase != CallPhase::Open {
                return Err(LiveError::NotActive);
            }
            let Some(call) = state.call.as_mut() else {
                return Err(LiveError::NotActive);
            };
            let parts = (call.info.clone(), call.end_tx.take(), call.task.take());
            set_phase(&mut state, &self.phase_tx, CallPhase::Closing);
            parts
        };

        if let Some(end_tx) = end_tx {
            let _ = end_tx.send(());
        }
        if let Some(task) = task {
            if let Err(e) = task.await {
                error!("Live session task failed: {}", e);
                let mut state = self.state.lock().await;
                finish_call(&mut state, &self.phase_tx, &info);
            }
        }

        let stats = {
            let state = self.state.lock().await;
            state.last_stats.clone().unwrap_or_else(|| info.stats())
        };
        Ok(stats)
    }

    /// Mute or unmute the microphone. Returns the new mute state.
    pub async fn set_muted(&self, muted: bool) -> Result<bool, LiveError> {
        let state = self.state.lock().await;
        match (&state.phase, &state.call) {
            (CallPhase::Open, Some(call)) => {
                call.info.capture.set_muted(muted);
                info!("Microphone {}", if muted { "muted" } else { "unmuted" });
                Ok(muted)
            }
            _ => Err(LiveError::NotActive),
        }
    }

    pub async fn status(&self) -> CallStatus {
        let state = self.state.lock().await;
        match &state.call {
            Some(call) => CallStatus {
                phase: state.phase,
                profile_id: Some(call.info.profile_id.clone()),
                muted: call.info.capture.is_muted(),
                stats: Some(call.info.stats()),
            },
            None => CallStatus {
                phase: state.phase,
                profile_id: state.opening_profile.clone(),
                muted: false,
                stats: None,
            },
        }
    }

    /// Transcript lines of the open call; empty when idle
    pub async fn transcript(&self) -> Vec<TranscriptLine> {
        let state = self.state.lock().await;
        match &state.call {
            Some(call) => call.transcript.borrow().clone(),
            None => Vec::new(),
        }
    }

    /// Statistics of the most recently finished call
    pub async fn last_stats(&self) -> Option<CallStats> {
        self.state.lock().await.last_stats.clone()
    }

    /// Follow phase changes
    pub fn subscribe(&self) -> watch::Receiver<CallPhase> {
        self.phase_tx.subscribe()
    }

    pub fn transport_name(&self) -> &str {
        self.transport.name()
    }
}

fn set_phase(state: &mut ControllerState, phase_tx: &watch::Sender<CallPhase>, phase: CallPhase) {
    state.phase = phase;
    phase_tx.send_replace(phase);
}

/// Return to Idle if `info` is still the current call
fn finish_call(state: &mut ControllerState, phase_tx: &watch::Sender<CallPhase>, info: &CallInfo) {
    if state.generation != info.generation {
        return;
    }
    state.call = None;
    state.last_stats = Some(info.stats());
    set_phase(state, phase_tx, CallPhase::Idle);
}

/// Release whatever was acquired before a failed open
async fn release(mut scheduler: Option<PlaybackScheduler>, mut input: Option<Box<dyn AudioBackend>>) {
    if let Some(scheduler) = scheduler.as_mut() {
        if let Err(e) = scheduler.shutdown() {
            warn!("Failed to close output device: {:#}", e);
        }
    }
    if let Some(input) = input.as_mut() {
        if let Err(e) = input.stop().await {
            warn!("Failed to stop input backend: {:#}", e);
        }
    }
}

async fn open_call(
    config: SessionConfig,
    transport: Arc<dyn LiveTransport>,
    devices: Arc<dyn DeviceProvider>,
    profile: UserProfile,
    generation: u64,
    state: Arc<Mutex<ControllerState>>,
    phase_tx: Arc<watch::Sender<CallPhase>>,
) -> Result<String, LiveError> {
    let result = acquire_and_connect(&config, transport.as_ref(), devices.as_ref(), &profile).await;

    let mut guard = state.lock().await;
    guard.opening_profile = None;

    let opened = match result {
        Ok(opened) => opened,
        Err(e) => {
            error!("Call to {} failed: {}", profile.name, e);
            set_phase(&mut guard, &phase_tx, CallPhase::Idle);
            return Err(e);
        }
    };

    let session_id = opened.session_id.clone();
    let info = CallInfo {
        generation,
        session_id: session_id.clone(),
        profile_id: profile.id.clone(),
        started_at: Utc::now(),
        capture: Arc::new(CaptureState::default()),
        counters: Arc::new(PlaybackCounters::default()),
    };

    let OpenedCall {
        scheduler,
        input,
        frames,
        connection,
        finished,
        ..
    } = opened;

    let capture = CapturePipeline::spawn(
        input,
        frames,
        connection.outbound,
        Arc::clone(&info.capture),
    );

    let (transcript_tx, transcript_rx) = watch::channel(Vec::new());
    let (end_tx, end_rx) = oneshot::channel();

    let session = LiveSession {
        session_id: session_id.clone(),
        scheduler,
        capture,
        events: connection.events,
        finished,
        guard: connection.guard,
        counters: Arc::clone(&info.counters),
        transcript_tx,
        end_rx,
    };

    let task_state = Arc::clone(&state);
    let task_phase = Arc::clone(&phase_tx);
    let task_info = info.clone();
    let task = tokio::spawn(async move {
        let mut session = session;
        let reason = session.wait_for_close().await;
        {
            // Remote close: no longer Open while devices are released
            let mut state = task_state.lock().await;
            if state.generation == task_info.generation && state.phase == CallPhase::Open {
                set_phase(&mut state, &task_phase, CallPhase::Closing);
            }
        }
        session.teardown().await;

        let mut state = task_state.lock().await;
        finish_call(&mut state, &task_phase, &task_info);
        info!("Live session {} released", task_info.session_id);
        reason
    });

    guard.call = Some(ActiveCall {
        info,
        transcript: transcript_rx,
        end_tx: Some(end_tx),
        task: Some(task),
    });
    set_phase(&mut guard, &phase_tx, CallPhase::Open);

    info!("Call with {} open (session {})", profile.name, session_id);
    Ok(session_id)
}

struct OpenedCall {
    session_id: String,
    scheduler: PlaybackScheduler,
    input: Box<dyn AudioBackend>,
    frames: mpsc::Receiver<crate::audio::AudioFrame>,
    finished: mpsc::UnboundedReceiver<crate::audio::UnitId>,
    connection: crate::live::LiveConnection,
}

/// Microphone, then output, then the handshake. Anything acquired is
/// released again when a later step fails.
async fn acquire_and_connect(
    config: &SessionConfig,
    transport: &dyn LiveTransport,
    devices: &dyn DeviceProvider,
    profile: &UserProfile,
) -> Result<OpenedCall, LiveError> {
    let mut input = devices
        .input(&config.input_config())
        .map_err(LiveError::Microphone)?;
    let mut frames = input.start().await.map_err(LiveError::Microphone)?;
    info!("Microphone acquired ({})", input.name());

    let (finished_tx, finished) = mpsc::unbounded_channel();
    let output = match devices.output(&config.output_config(), finished_tx) {
        Ok(output) => output,
        Err(e) => {
            release(None, Some(input)).await;
            return Err(LiveError::OutputDevice(e));
        }
    };
    let scheduler = PlaybackScheduler::new(output, config.output_sample_rate, 1);

    let setup = config.setup_for(profile);
    info!("Handshaking with {} (voice {})", transport.name(), profile.voice.as_str());

    let connection = match tokio::time::timeout(config.handshake_timeout, transport.connect(&setup)).await {
        Ok(Ok(connection)) => connection,
        Ok(Err(e)) => {
            release(Some(scheduler), Some(input)).await;
            return Err(LiveError::Handshake(e));
        }
        Err(_) => {
            release(Some(scheduler), Some(input)).await;
            return Err(LiveError::HandshakeTimeout(config.handshake_timeout));
        }
    };

    // Frames captured before the session existed are not sent
    let mut discarded = 0;
    while frames.try_recv().is_ok() {
        discarded += 1;
    }
    if discarded > 0 {
        info!("Discarded {} frames captured during the handshake", discarded);
    }

    Ok(OpenedCall {
        session_id: connection.session_id.clone(),
        scheduler,
        input,
        frames,
        finished,
        connection,
    })
}
