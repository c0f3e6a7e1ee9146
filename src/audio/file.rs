use anyhow::{Context, Result};
use hound::{SampleFormat, WavReader};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::backend::{AudioBackend, AudioBackendConfig, AudioFrame};

/// A WAV file loaded as normalized f32 samples
pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    /// Interleaved samples in [-1.0, 1.0]
    pub samples: Vec<f32>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path).context("Failed to open WAV file")?;

        let spec = reader.spec();
        let samples: Vec<f32> = match spec.sample_format {
            SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<Result<Vec<_>, _>>()
                .context("Failed to read audio samples")?,
            SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<Result<Vec<_>, _>>()
                    .context("Failed to read audio samples")?
            }
        };

        let duration_seconds =
            samples.len() as f64 / (spec.sample_rate as f64 * spec.channels as f64);

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }

    /// Mono samples at `target_rate`, averaging channels and resampling
    /// linearly when the file rate differs.
    pub fn to_mono(&self, target_rate: u32) -> Vec<f32> {
        let channels = self.channels.max(1) as usize;
        let mono: Vec<f32> = self
            .samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect();

        resample_linear(&mono, self.sample_rate, target_rate)
    }
}

/// Linear-interpolation resampler for mono audio
pub fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() || from_rate == 0 || to_rate == 0 {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = ((samples.len() as f64) / ratio).floor() as usize;
    let last = samples.len() - 1;

    (0..out_len)
        .map(|i| {
            let pos = i as f64 * ratio;
            let idx = pos.floor() as usize;
            let frac = (pos - idx as f64) as f32;
            let a = samples[idx.min(last)];
            let b = samples[(idx + 1).min(last)];
            a + (b - a) * frac
        })
        .collect()
}

/// Input backend that plays a WAV file into the capture path as if it were
/// a microphone, one fixed-size frame per frame duration.
pub struct WavFileBackend {
    path: PathBuf,
    config: AudioBackendConfig,
    paced: bool,
    task: Option<JoinHandle<()>>,
}

impl WavFileBackend {
    pub fn new(path: impl Into<PathBuf>, config: AudioBackendConfig) -> Self {
        Self {
            path: path.into(),
            config,
            paced: true,
            task: None,
        }
    }

    /// Emit frames as fast as the consumer takes them
    pub fn unpaced(mut self) -> Self {
        self.paced = false;
        self
    }
}

#[async_trait::async_trait]
impl AudioBackend for WavFileBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.task.is_some() {
            anyhow::bail!("Already capturing");
        }

        let file = AudioFile::open(&self.path)
            .with_context(|| format!("Input file unavailable: {}", self.path.display()))?;
        let samples = file.to_mono(self.config.sample_rate);

        let (tx, rx) = mpsc::channel(self.config.channel_capacity);
        let frame_size = self.config.frame_size.max(1);
        let sample_rate = self.config.sample_rate;
        let frame_duration = self.config.frame_duration();
        let paced = self.paced;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(frame_duration);

            for (sequence, chunk) in samples.chunks(frame_size).enumerate() {
                if paced {
                    ticker.tick().await;
                }

                let mut frame = chunk.to_vec();
                frame.resize(frame_size, 0.0);

                let frame = AudioFrame {
                    samples: frame,
                    sample_rate,
                    sequence: sequence as u64,
                };
                if tx.send(frame).await.is_err() {
                    debug!("Capture consumer gone, stopping file playback");
                    return;
                }
            }

            debug!("Input file exhausted");
        });

        self.task = Some(task);
        info!("WAV input started: {}", self.path.display());

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(task) = self.task.take() {
            task.abort();
            info!("WAV input stopped: {}", self.path.display());
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    fn name(&self) -> &str {
        "WAV file"
    }
}
