pub mod app;
pub mod audio;
pub mod config;
pub mod dating;
pub mod http;
pub mod live;
pub mod nats;
pub mod session;
pub mod suggest;
pub mod transcript;

pub use audio::{
    AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFile, AudioFrame, AudioSource,
    CapturePipeline, CaptureState, DecodedAudio, OutputDevice, PlaybackScheduler, VirtualOutput,
    WavFileBackend,
};
pub use config::Config;
pub use dating::{DatingError, DatingState, UserProfile};
pub use http::{create_router, AppState};
pub use live::{GeminiLiveTransport, LiveEvent, LiveTransport};
pub use nats::NatsRelayTransport;
pub use session::{CallPhase, CallStats, LiveError, LiveSessionController, SessionConfig};
pub use suggest::{SuggestionService, TextModel};
pub use transcript::{Speaker, TranscriptAccumulator, TranscriptLine};
