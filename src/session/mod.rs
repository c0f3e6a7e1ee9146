//! Live call management
//!
//! This module provides the `LiveSessionController` that manages:
//! - The single active voice session and its lifecycle
//! - Microphone capture and the send path to the remote session
//! - Gapless playback of server audio and barge-in
//! - The call transcript and per-call statistics

mod config;
mod controller;
mod devices;
mod error;
mod session;
mod stats;

pub use config::{persona_instruction, SessionConfig};
pub use controller::{CallPhase, CallStatus, LiveSessionController};
pub use devices::{ConfiguredDevices, DeviceProvider};
pub use error::LiveError;
pub use session::CloseReason;
pub use stats::{CallStats, PlaybackCounters};
