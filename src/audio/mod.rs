pub mod backend;
pub mod capture;
pub mod codec;
pub mod file;
pub mod output;
pub mod playback;

#[cfg(feature = "cpal-audio")]
pub mod microphone;

pub use backend::{
    AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFrame, AudioSource, FrameAssembler,
};
pub use capture::{CapturePipeline, CaptureState};
pub use codec::DecodedAudio;
pub use file::{AudioFile, WavFileBackend};
pub use output::{OutputConfig, OutputDevice, UnitId, VirtualOutput};
pub use playback::{PlaybackScheduler, ScheduledUnit};
