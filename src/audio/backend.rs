use anyhow::Result;
use std::path::PathBuf;
use tokio::sync::mpsc;

/// One block of captured microphone samples (mono, normalized f32)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Samples in [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Capture order, starting at 0
    pub sequence: u64,
}

/// Configuration for an input backend
#[derive(Debug, Clone)]
pub struct AudioBackendConfig {
    /// Capture sample rate
    pub sample_rate: u32,
    /// Samples per frame
    pub frame_size: usize,
    /// Frames buffered between the device and the capture pipeline
    pub channel_capacity: usize,
}

impl Default for AudioBackendConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000, // Live API input rate
            frame_size: 4096,   // ~256ms at 16kHz
            channel_capacity: 32,
        }
    }
}

impl AudioBackendConfig {
    /// Wall-clock duration of one frame
    pub fn frame_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.frame_size as f64 / self.sample_rate as f64)
    }
}

/// Audio capture backend trait
///
/// Implementations:
/// - Microphone: cpal default input device (`cpal-audio` feature)
/// - File: WAV file paced at real time (testing, scripted calls)
#[async_trait::async_trait]
pub trait AudioBackend: Send + Sync {
    /// Start capturing audio
    ///
    /// Acquires the device; failure here means the microphone is unavailable
    /// or permission was denied. Returns a channel receiving frames in
    /// capture order.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Stop capturing audio and release the device
    async fn stop(&mut self) -> Result<()>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Audio backend factory
pub struct AudioBackendFactory;

impl AudioBackendFactory {
    /// Create an input backend for the given source
    pub fn create(source: AudioSource, config: AudioBackendConfig) -> Result<Box<dyn AudioBackend>> {
        match source {
            AudioSource::Microphone => {
                #[cfg(feature = "cpal-audio")]
                {
                    use super::microphone::MicrophoneBackend;
                    Ok(Box::new(MicrophoneBackend::new(config)))
                }

                #[cfg(not(feature = "cpal-audio"))]
                {
                    let _ = config;
                    anyhow::bail!(
                        "Microphone capture requires the `cpal-audio` feature; \
                        use a WAV file input instead"
                    )
                }
            }

            AudioSource::File(path) => {
                let backend = super::file::WavFileBackend::new(path, config);
                Ok(Box::new(backend))
            }
        }
    }
}

/// Audio input source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioSource {
    /// Default microphone
    Microphone,
    /// WAV file standing in for the microphone
    File(PathBuf),
}

/// Turns device callback buffers into fixed-size mono frames at the
/// capture rate.
///
/// Input is interleaved at the device's native rate and channel count;
/// channels are averaged and the result resampled before buffering.
pub struct FrameAssembler {
    channels: usize,
    native_rate: u32,
    target_rate: u32,
    frame_size: usize,
    pending: Vec<f32>,
    sequence: u64,
}

impl FrameAssembler {
    pub fn new(channels: u16, native_rate: u32, config: &AudioBackendConfig) -> Self {
        let frame_size = config.frame_size.max(1);
        Self {
            channels: channels.max(1) as usize,
            native_rate,
            target_rate: config.sample_rate,
            frame_size,
            pending: Vec::with_capacity(frame_size * 2),
            sequence: 0,
        }
    }

    /// Add float samples; returns every frame completed by them
    pub fn push(&mut self, interleaved: &[f32]) -> Vec<AudioFrame> {
        let mono: Vec<f32> = if self.channels == 1 {
            interleaved.to_vec()
        } else {
            interleaved
                .chunks_exact(self.channels)
                .map(|frame| frame.iter().sum::<f32>() / self.channels as f32)
                .collect()
        };

        let resampled = super::file::resample_linear(&mono, self.native_rate, self.target_rate);
        self.pending.extend_from_slice(&resampled);

        let mut frames = Vec::new();
        while self.pending.len() >= self.frame_size {
            let samples: Vec<f32> = self.pending.drain(..self.frame_size).collect();
            frames.push(AudioFrame {
                samples,
                sample_rate: self.target_rate,
                sequence: self.sequence,
            });
            self.sequence += 1;
        }
        frames
    }

    /// Add 16-bit samples
    pub fn push_i16(&mut self, interleaved: &[i16]) -> Vec<AudioFrame> {
        let samples: Vec<f32> = interleaved.iter().map(|&s| s as f32 / 32768.0).collect();
        self.push(&samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(frame_size: usize) -> AudioBackendConfig {
        AudioBackendConfig {
            sample_rate: 16000,
            frame_size,
            channel_capacity: 8,
        }
    }

    #[test]
    fn test_assembler_passes_matching_format_through() {
        let mut assembler = FrameAssembler::new(1, 16000, &config(4));

        assert!(assembler.push(&[0.1, 0.2, 0.3]).is_empty());
        let frames = assembler.push(&[0.4, 0.5]);

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].samples, vec![0.1, 0.2, 0.3, 0.4]);
        assert_eq!(frames[0].sequence, 0);
        assert_eq!(frames[0].sample_rate, 16000);
    }

    #[test]
    fn test_assembler_downmixes_and_resamples_native_stereo() {
        // 48kHz stereo, left 0.5 and right -0.5 except the first frame
        let mut assembler = FrameAssembler::new(2, 48000, &config(160));
        let mut buffer = vec![0.5f32; 960];
        for (i, s) in buffer.iter_mut().enumerate() {
            if i % 2 == 1 {
                *s = -0.5;
            }
        }
        buffer[0] = 1.0;
        buffer[1] = 1.0;

        // 480 stereo frames at 48kHz -> 160 mono samples at 16kHz
        let frames = assembler.push(&buffer);

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].samples.len(), 160);
        assert!((frames[0].samples[0] - 1.0).abs() < 1e-6);
        assert!(frames[0].samples[1..].iter().all(|s| s.abs() < 1e-6));
    }

    #[test]
    fn test_assembler_converts_i16_and_numbers_frames() {
        let mut assembler = FrameAssembler::new(1, 16000, &config(2));

        let frames = assembler.push_i16(&[16384, -16384, 0, 32767, 1]);

        assert_eq!(frames.len(), 2);
        assert!((frames[0].samples[0] - 0.5).abs() < 1e-6);
        assert!((frames[0].samples[1] + 0.5).abs() < 1e-6);
        assert_eq!(frames[1].sequence, 1);
        assert!(assembler.push_i16(&[]).is_empty());
    }
}
