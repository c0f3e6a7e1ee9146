// Microphone input via cpal.
//
// cpal streams are not Send, so the stream lives on a dedicated thread that
// owns it until stop() signals the thread to drop it.

use anyhow::{anyhow, bail, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::mpsc as std_mpsc;
use std::thread::JoinHandle;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::backend::{AudioBackend, AudioBackendConfig, AudioFrame, FrameAssembler};

pub struct MicrophoneBackend {
    config: AudioBackendConfig,
    stop_tx: Option<std_mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl MicrophoneBackend {
    pub fn new(config: AudioBackendConfig) -> Self {
        Self {
            config,
            stop_tx: None,
            thread: None,
        }
    }
}

/// Hands assembled frames to the capture pipeline without blocking the
/// audio callback
fn deliver(frame_tx: &mpsc::Sender<AudioFrame>, frames: Vec<AudioFrame>) {
    for frame in frames {
        if frame_tx.try_send(frame).is_err() {
            warn!("Capture channel full, dropping microphone frame");
        }
    }
}

fn open_stream(
    config: &AudioBackendConfig,
    frame_tx: mpsc::Sender<AudioFrame>,
) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("No default input device"))?;

    info!(
        "Opening microphone: {}",
        device.name().unwrap_or_else(|_| "unknown".to_string())
    );

    let stream = match build_preferred(&device, config, frame_tx.clone()) {
        Ok(stream) => stream,
        Err(e) => {
            debug!("Capture rate not accepted by device ({:#}), using native format", e);
            build_native(&device, config, frame_tx)?
        }
    };

    stream.play().context("Failed to start microphone stream")?;
    Ok(stream)
}

/// Mono f32 at the capture rate, no conversion needed
fn build_preferred(
    device: &cpal::Device,
    config: &AudioBackendConfig,
    frame_tx: mpsc::Sender<AudioFrame>,
) -> Result<cpal::Stream> {
    let stream_config = cpal::StreamConfig {
        channels: 1,
        sample_rate: cpal::SampleRate(config.sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };
    let mut assembler = FrameAssembler::new(1, config.sample_rate, config);

    device
        .build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                deliver(&frame_tx, assembler.push(data));
            },
            |err| warn!("Microphone stream error: {}", err),
            None,
        )
        .context("Failed to build microphone stream")
}

/// The device's default config, downmixed and resampled in software
fn build_native(
    device: &cpal::Device,
    config: &AudioBackendConfig,
    frame_tx: mpsc::Sender<AudioFrame>,
) -> Result<cpal::Stream> {
    let default_config = device
        .default_input_config()
        .context("Failed to query default input config")?;

    let native_rate = default_config.sample_rate().0;
    let native_channels = default_config.channels();
    let sample_format = default_config.sample_format();
    let stream_config: cpal::StreamConfig = default_config.into();

    info!(
        "Using native microphone format ({}ch/{}Hz/{:?}), converting to {}Hz mono",
        native_channels, native_rate, sample_format, config.sample_rate
    );

    let mut assembler = FrameAssembler::new(native_channels, native_rate, config);
    let err_callback = |err| warn!("Microphone stream error: {}", err);

    let stream = match sample_format {
        cpal::SampleFormat::I16 => device.build_input_stream(
            &stream_config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                deliver(&frame_tx, assembler.push_i16(data));
            },
            err_callback,
            None,
        ),
        cpal::SampleFormat::F32 => device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                deliver(&frame_tx, assembler.push(data));
            },
            err_callback,
            None,
        ),
        other => bail!("Unsupported microphone sample format: {:?}", other),
    };

    stream.context("Failed to build microphone stream")
}

#[async_trait::async_trait]
impl AudioBackend for MicrophoneBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.thread.is_some() {
            anyhow::bail!("Already capturing");
        }

        let (frame_tx, frame_rx) = mpsc::channel(self.config.channel_capacity);
        let (ready_tx, ready_rx) = std_mpsc::channel::<Result<()>>();
        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();
        let config = self.config.clone();

        let thread = std::thread::Builder::new()
            .name("amora-microphone".to_string())
            .spawn(move || match open_stream(&config, frame_tx) {
                Ok(stream) => {
                    let _ = ready_tx.send(Ok(()));
                    // Blocks until stop() or the backend is dropped
                    let _ = stop_rx.recv();
                    drop(stream);
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })
            .context("Failed to spawn microphone thread")?;

        let ready = tokio::task::spawn_blocking(move || ready_rx.recv())
            .await
            .context("Microphone startup task failed")?
            .context("Microphone thread exited during startup")?;

        if let Err(e) = ready {
            let _ = thread.join();
            return Err(e.context("Microphone unavailable or permission denied"));
        }

        self.stop_tx = Some(stop_tx);
        self.thread = Some(thread);
        info!("Microphone capture started ({}Hz mono)", self.config.sample_rate);

        Ok(frame_rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            tokio::task::spawn_blocking(move || thread.join())
                .await
                .context("Microphone shutdown task failed")?
                .map_err(|_| anyhow!("Microphone thread panicked"))?;
            info!("Microphone capture stopped");
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.thread.is_some()
    }

    fn name(&self) -> &str {
        "Microphone (cpal)"
    }
}
