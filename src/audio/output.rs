use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::codec::{DecodedAudio, PCM_SCALE};

/// Identifier of one scheduled playback unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(pub u64);

/// Audio output context
///
/// The device owns a clock (`current_time`, seconds since the context was
/// created) and plays scheduled units against it. When a unit finishes
/// naturally the device reports its id on the finished channel it was
/// created with; force-stopped units are never reported.
pub trait OutputDevice: Send {
    /// Device clock in seconds
    fn current_time(&self) -> f64;

    /// Schedule `audio` to start at `start_at` on the device clock
    fn play_at(&mut self, id: UnitId, audio: &DecodedAudio, start_at: f64) -> Result<()>;

    /// Force-stop a unit; no finish event fires for it afterwards
    fn stop(&mut self, id: UnitId);

    /// Stop everything and release the device
    fn close(&mut self) -> Result<()>;

    fn name(&self) -> &str;
}

/// Output context configuration
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Output sample rate (Live API emits 24kHz)
    pub sample_rate: u32,
    pub channels: u16,
    /// Render played audio to this WAV file
    pub record_path: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            sample_rate: 24000,
            channels: 1,
            record_path: None,
        }
    }
}

/// Clock-driven output device
///
/// Keeps time with the tokio clock and fires finish events when each unit's
/// end time passes. Optionally renders what the device played into a WAV
/// file: units at their scheduled position, cut off where they were stopped.
pub struct VirtualOutput {
    config: OutputConfig,
    origin: Instant,
    finished_tx: mpsc::UnboundedSender<UnitId>,
    timers: HashMap<UnitId, JoinHandle<()>>,
    renderer: Option<WavRenderer>,
    closed: bool,
}

impl VirtualOutput {
    pub fn new(config: OutputConfig, finished_tx: mpsc::UnboundedSender<UnitId>) -> Result<Self> {
        let renderer = match &config.record_path {
            Some(path) => Some(WavRenderer::create(path, config.sample_rate, config.channels)?),
            None => None,
        };

        info!(
            "Output context opened ({}Hz, {} channels{})",
            config.sample_rate,
            config.channels,
            if renderer.is_some() { ", rendering to WAV" } else { "" }
        );

        Ok(Self {
            config,
            origin: Instant::now(),
            finished_tx,
            timers: HashMap::new(),
            renderer,
            closed: false,
        })
    }

}

impl OutputDevice for VirtualOutput {
    fn current_time(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }

    fn play_at(&mut self, id: UnitId, audio: &DecodedAudio, start_at: f64) -> Result<()> {
        if self.closed {
            bail!("Output context is closed");
        }

        if let Some(renderer) = &mut self.renderer {
            renderer.write_at(id, audio, start_at);
        }

        self.timers.retain(|_, timer| !timer.is_finished());

        let end = self.origin + std::time::Duration::from_secs_f64(start_at + audio.duration_secs());
        let finished_tx = self.finished_tx.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep_until(end).await;
            let _ = finished_tx.send(id);
        });
        self.timers.insert(id, timer);

        debug!(
            "Unit {:?} scheduled at {:.3}s ({:.3}s long)",
            id,
            start_at,
            audio.duration_secs()
        );
        Ok(())
    }

    fn stop(&mut self, id: UnitId) {
        if let Some(timer) = self.timers.remove(&id) {
            timer.abort();
        }
        let now = self.current_time();
        if let Some(renderer) = &mut self.renderer {
            renderer.cut(id, now);
        }
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        for (_, timer) in self.timers.drain() {
            timer.abort();
        }
        let now = self.current_time();
        if let Some(renderer) = self.renderer.take() {
            renderer.finish(now)?;
        }

        info!("Output context closed ({}Hz)", self.config.sample_rate);
        Ok(())
    }

    fn name(&self) -> &str {
        "virtual output"
    }
}

impl Drop for VirtualOutput {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close output context on drop: {}", e);
        }
    }
}

/// Device timeline rendered to a WAV file when the context closes.
///
/// Units are laid down at their start frame, gaps stay silent, and a
/// stopped unit is silenced from the stop time onwards.
struct WavRenderer {
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    sample_rate: u32,
    channels: usize,
    /// Interleaved samples from time zero
    timeline: Vec<i16>,
    /// Audible frame span of each unit
    units: HashMap<UnitId, (u64, u64)>,
}

impl WavRenderer {
    fn create(path: &Path, sample_rate: u32, channels: u16) -> Result<Self> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let writer = hound::WavWriter::create(path, spec)
            .with_context(|| format!("Failed to create WAV file: {:?}", path))?;

        Ok(Self {
            writer: Some(writer),
            sample_rate,
            channels: channels.max(1) as usize,
            timeline: Vec::new(),
            units: HashMap::new(),
        })
    }

    fn frame_at(&self, secs: f64) -> u64 {
        (secs.max(0.0) * self.sample_rate as f64).round() as u64
    }

    fn write_at(&mut self, id: UnitId, audio: &DecodedAudio, start_at: f64) {
        let start_frame = self.frame_at(start_at);
        let frames = audio.frame_count();
        let end_sample = (start_frame as usize + frames) * self.channels;
        if self.timeline.len() < end_sample {
            self.timeline.resize(end_sample, 0);
        }

        let base = start_frame as usize * self.channels;
        for i in 0..frames {
            for ch in 0..self.channels {
                let sample = audio
                    .channels
                    .get(ch)
                    .or_else(|| audio.channels.first())
                    .and_then(|c| c.get(i))
                    .copied()
                    .unwrap_or(0.0);
                self.timeline[base + i * self.channels + ch] = (sample * PCM_SCALE).round() as i16;
            }
        }

        self.units.insert(id, (start_frame, start_frame + frames as u64));
    }

    /// Silence the rest of a unit stopped at `now`
    fn cut(&mut self, id: UnitId, now: f64) {
        let now_frame = self.frame_at(now);
        let Some((start, end)) = self.units.get_mut(&id) else {
            return;
        };
        let from_frame = (*start).max(now_frame).min(*end);
        let from = (from_frame as usize * self.channels).min(self.timeline.len());
        let to = (*end as usize * self.channels).min(self.timeline.len());
        *end = from_frame;
        if from < to {
            self.timeline[from..to].fill(0);
        }
    }

    fn finish(mut self, now: f64) -> Result<()> {
        let ids: Vec<UnitId> = self.units.keys().copied().collect();
        for id in ids {
            self.cut(id, now);
        }
        let extent = self.units.values().map(|(_, end)| *end).max().unwrap_or(0);
        self.timeline.truncate(extent as usize * self.channels);

        if let Some(mut writer) = self.writer.take() {
            for &sample in &self.timeline {
                writer.write_sample(sample).context("Failed to write WAV sample")?;
            }
            writer.finalize().context("Failed to finalize WAV file")?;
            debug!("Rendered {} frames of output", self.timeline.len() / self.channels);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::codec;

    fn tone(frames: usize) -> DecodedAudio {
        codec::decode(&codec::encode(&vec![0.25; frames]), 1, 24000).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_unit_finishes_after_its_duration() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut output = VirtualOutput::new(OutputConfig::default(), tx).unwrap();

        // 0.5s of audio
        output.play_at(UnitId(1), &tone(12000), 0.0).unwrap();

        tokio::time::advance(std::time::Duration::from_millis(400)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::advance(std::time::Duration::from_millis(200)).await;
        assert_eq!(rx.recv().await, Some(UnitId(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_unit_never_reports() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut output = VirtualOutput::new(OutputConfig::default(), tx).unwrap();

        output.play_at(UnitId(7), &tone(2400), 0.0).unwrap();
        output.stop(UnitId(7));

        tokio::time::advance(std::time::Duration::from_secs(1)).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_closed_output_rejects_units() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut output = VirtualOutput::new(OutputConfig::default(), tx).unwrap();

        output.close().unwrap();
        assert!(output.play_at(UnitId(1), &tone(10), 0.0).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_renders_gap_as_silence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("call.wav");
        let (tx, _rx) = mpsc::unbounded_channel();
        let config = OutputConfig {
            record_path: Some(path.clone()),
            ..OutputConfig::default()
        };

        let mut output = VirtualOutput::new(config, tx).unwrap();
        output.play_at(UnitId(1), &tone(240), 0.0).unwrap();
        // 10ms gap before the second unit
        output.play_at(UnitId(2), &tone(240), 0.02).unwrap();
        tokio::time::advance(std::time::Duration::from_millis(100)).await;
        output.close().unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 24000);
        let samples: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples.len(), 480 + 240);
        assert_eq!(samples[0], 8192);
        assert_eq!(samples[300], 0);
        assert_eq!(samples[480], 8192);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recording_follows_interruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("call.wav");
        let (tx, _rx) = mpsc::unbounded_channel();
        let config = OutputConfig {
            record_path: Some(path.clone()),
            ..OutputConfig::default()
        };

        let mut output = VirtualOutput::new(config, tx).unwrap();
        // 0.5s unit, cut off after 0.1s; the reply starts right there
        output.play_at(UnitId(1), &tone(12000), 0.0).unwrap();
        tokio::time::advance(std::time::Duration::from_millis(100)).await;
        output.stop(UnitId(1));

        let reply = codec::decode(&codec::encode(&[-0.25; 240]), 1, 24000).unwrap();
        let now = output.current_time();
        output.play_at(UnitId(2), &reply, now).unwrap();
        tokio::time::advance(std::time::Duration::from_secs(1)).await;
        output.close().unwrap();

        let samples: Vec<i16> = hound::WavReader::open(&path)
            .unwrap()
            .into_samples::<i16>()
            .map(|s| s.unwrap())
            .collect();
        assert_eq!(samples.len(), 2400 + 240);
        assert_eq!(samples[2399], 8192);
        assert_eq!(samples[2400], -8192);
        assert_eq!(samples[2639], -8192);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recording_ends_at_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("call.wav");
        let (tx, _rx) = mpsc::unbounded_channel();
        let config = OutputConfig {
            record_path: Some(path.clone()),
            ..OutputConfig::default()
        };

        let mut output = VirtualOutput::new(config, tx).unwrap();
        output.play_at(UnitId(1), &tone(12000), 0.0).unwrap();
        tokio::time::advance(std::time::Duration::from_millis(250)).await;
        output.close().unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.len(), 6000);
    }
}
