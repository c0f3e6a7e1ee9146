use serde::{Deserialize, Serialize};

/// Microphone audio published to the relay on `live.input.<session>`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AudioFrameMessage {
    pub session_id: String,
    pub sequence: u64,
    pub pcm: String, // Base64-encoded 16-bit PCM
    pub sample_rate: u32,
    pub channels: u16,
    pub timestamp: String, // RFC3339 timestamp
    #[serde(rename = "final")]
    pub final_frame: bool,
}

/// Subject carrying the setup request/reply handshake
pub fn setup_subject(session_id: &str) -> String {
    format!("live.setup.{}", session_id)
}

/// Subject the relay reads microphone audio from
pub fn input_subject(session_id: &str) -> String {
    format!("live.input.{}", session_id)
}

/// Subject the relay publishes server messages on
pub fn output_subject(session_id: &str) -> String {
    format!("live.output.{}", session_id)
}
