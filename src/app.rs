//! Wiring from configuration to running components.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::audio::AudioSource;
use crate::config::{Config, TransportKind};
use crate::dating::DatingState;
use crate::http::AppState;
use crate::live::{GeminiLiveTransport, LiveTransport};
use crate::nats::NatsRelayTransport;
use crate::session::{ConfiguredDevices, LiveSessionController};
use crate::suggest::{GeminiTextClient, SuggestionService};

/// Input and recording choices, CLI flags over configuration
#[derive(Debug, Clone, Default)]
pub struct DeviceOverrides {
    pub input_file: Option<PathBuf>,
    pub record_path: Option<PathBuf>,
}

pub async fn build_transport(cfg: &Config) -> Result<Arc<dyn LiveTransport>> {
    match cfg.live.transport {
        TransportKind::Gemini => {
            let key = cfg.api_key().unwrap_or_else(|| {
                warn!(
                    "{} is not set; live calls will fail the handshake",
                    cfg.gemini.api_key_env
                );
                String::new()
            });
            Ok(Arc::new(GeminiLiveTransport::new(cfg.gemini.live_url.clone(), key)))
        }
        TransportKind::Nats => {
            let relay = NatsRelayTransport::connect(&cfg.live.nats_url)
                .await
                .context("Failed to set up the NATS relay transport")?;
            Ok(Arc::new(relay))
        }
    }
}

pub fn build_devices(cfg: &Config, overrides: DeviceOverrides) -> ConfiguredDevices {
    let input = match overrides.input_file.or_else(|| cfg.audio.input_file.clone()) {
        Some(path) => AudioSource::File(path),
        None => AudioSource::Microphone,
    };
    let record_path = overrides.record_path.or_else(|| cfg.audio.record_path.clone());
    info!("Call input: {:?}, recording: {:?}", input, record_path);
    ConfiguredDevices::new(input, record_path)
}

pub async fn build_controller(cfg: &Config, overrides: DeviceOverrides) -> Result<LiveSessionController> {
    let transport = build_transport(cfg).await?;
    let devices = build_devices(cfg, overrides);
    Ok(LiveSessionController::new(cfg.session(), transport, Arc::new(devices)))
}

pub fn build_suggestions(cfg: &Config) -> SuggestionService {
    let client = GeminiTextClient::new(
        cfg.gemini.api_base.clone(),
        cfg.gemini.text_model.clone(),
        cfg.api_key(),
    );
    SuggestionService::new(Arc::new(client))
}

pub async fn build_state(cfg: &Config) -> Result<AppState> {
    let controller = build_controller(cfg, DeviceOverrides::default()).await?;
    Ok(AppState::new(DatingState::new(), controller, build_suggestions(cfg)))
}
