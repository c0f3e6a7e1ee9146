use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics about a live call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallStats {
    pub session_id: String,

    /// Profile being called
    pub profile_id: String,

    /// When the session was established
    pub started_at: DateTime<Utc>,

    /// Total duration in seconds
    pub duration_secs: f64,

    /// Microphone frames handed to the session
    pub frames_sent: u64,

    /// Frames dropped while muted
    pub frames_muted: u64,

    /// Server audio segments scheduled for playback
    pub chunks_scheduled: u64,

    /// Barge-ins signalled by the server
    pub interruptions: u64,
}

/// Counters updated by the session event loop
#[derive(Debug, Default)]
pub struct PlaybackCounters {
    chunks_scheduled: AtomicU64,
    interruptions: AtomicU64,
}

impl PlaybackCounters {
    pub fn record_chunk(&self) {
        self.chunks_scheduled.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_interruption(&self) {
        self.interruptions.fetch_add(1, Ordering::SeqCst);
    }

    pub fn chunks_scheduled(&self) -> u64 {
        self.chunks_scheduled.load(Ordering::SeqCst)
    }

    pub fn interruptions(&self) -> u64 {
        self.interruptions.load(Ordering::SeqCst)
    }
}
