use anyhow::Result;
use std::path::PathBuf;
use tokio::sync::mpsc;

use crate::audio::{
    AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioSource, OutputConfig,
    OutputDevice, UnitId, VirtualOutput,
};

/// Opens the audio devices for a call
pub trait DeviceProvider: Send + Sync {
    /// Input backend; not yet started
    fn input(&self, config: &AudioBackendConfig) -> Result<Box<dyn AudioBackend>>;

    /// Output context reporting naturally finished units on `finished`
    fn output(
        &self,
        config: &OutputConfig,
        finished: mpsc::UnboundedSender<UnitId>,
    ) -> Result<Box<dyn OutputDevice>>;
}

/// Devices chosen from configuration: a microphone or WAV file for input,
/// and the virtual output, optionally rendering to a WAV file.
#[derive(Debug, Clone)]
pub struct ConfiguredDevices {
    pub input: AudioSource,
    pub record_path: Option<PathBuf>,
}

impl ConfiguredDevices {
    pub fn new(input: AudioSource, record_path: Option<PathBuf>) -> Self {
        Self { input, record_path }
    }
}

impl DeviceProvider for ConfiguredDevices {
    fn input(&self, config: &AudioBackendConfig) -> Result<Box<dyn AudioBackend>> {
        AudioBackendFactory::create(self.input.clone(), config.clone())
    }

    fn output(
        &self,
        config: &OutputConfig,
        finished: mpsc::UnboundedSender<UnitId>,
    ) -> Result<Box<dyn OutputDevice>> {
        let config = OutputConfig {
            record_path: self.record_path.clone(),
            ..config.clone()
        };
        Ok(Box::new(VirtualOutput::new(config, finished)?))
    }
}
