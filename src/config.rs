use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::session::SessionConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub gemini: GeminiConfig,
    pub audio: AudioConfig,
    pub live: LiveConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiConfig {
    /// REST base URL for text generation
    pub api_base: String,
    /// Live API WebSocket endpoint
    pub live_url: String,
    pub text_model: String,
    pub live_model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    pub input_sample_rate: u32,
    pub output_sample_rate: u32,
    pub frame_size: usize,
    /// Stream this WAV file instead of the microphone
    pub input_file: Option<PathBuf>,
    /// Render the remote voice to this WAV file
    pub record_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Gemini,
    Nats,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LiveConfig {
    pub transport: TransportKind,
    pub handshake_timeout_secs: u64,
    pub nats_url: String,
}

impl Config {
    /// Load `path` (extension optional), then apply `AMORA__SECTION__KEY`
    /// environment overrides.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("AMORA").separator("__"))
            .set_default("service.name", "amora-live")?
            .set_default("service.http.bind", "127.0.0.1")?
            .set_default("service.http.port", 8080)?
            .set_default("gemini.api_base", "https://generativelanguage.googleapis.com")?
            .set_default(
                "gemini.live_url",
                "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent",
            )?
            .set_default("gemini.text_model", "gemini-3-flash-preview")?
            .set_default("gemini.live_model", "gemini-2.5-flash-native-audio-preview-09-2025")?
            .set_default("gemini.api_key_env", "API_KEY")?
            .set_default("audio.input_sample_rate", 16000)?
            .set_default("audio.output_sample_rate", 24000)?
            .set_default("audio.frame_size", 4096)?
            .set_default("live.transport", "gemini")?
            .set_default("live.handshake_timeout_secs", 10)?
            .set_default("live.nats_url", "nats://localhost:4222")?
            .build()
            .context("Failed to load configuration")?;

        Ok(settings.try_deserialize()?)
    }

    /// API key from the configured environment variable, if set
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.gemini.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    pub fn session(&self) -> SessionConfig {
        SessionConfig {
            model: self.gemini.live_model.clone(),
            input_sample_rate: self.audio.input_sample_rate,
            frame_size: self.audio.frame_size,
            output_sample_rate: self.audio.output_sample_rate,
            handshake_timeout: Duration::from_secs(self.live.handshake_timeout_secs),
        }
    }
}
