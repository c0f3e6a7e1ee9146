//! Remote real-time voice session: wire messages and transports.

pub mod gemini;
pub mod messages;
pub mod transport;

pub use gemini::GeminiLiveTransport;
pub use messages::{parse_server_message, ClientSetupMessage, LiveEvent, RealtimeInputMessage};
pub use transport::{ConnectionGuard, LiveConnection, LiveTransport};
