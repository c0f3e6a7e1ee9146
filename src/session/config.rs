use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::audio::{AudioBackendConfig, OutputConfig};
use crate::dating::UserProfile;
use crate::live::messages::{
    ClientSetupMessage, Content, Empty, GenerationConfig, PrebuiltVoiceConfig, Setup,
    SpeechConfig, TextPart, VoiceConfig,
};

/// Configuration for a live voice session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Live model, with or without the "models/" prefix
    pub model: String,

    /// Microphone sample rate (the Live API expects 16kHz)
    pub input_sample_rate: u32,

    /// Samples per captured frame
    pub frame_size: usize,

    /// Sample rate of audio pushed by the server (24kHz)
    pub output_sample_rate: u32,

    /// How long to wait for the setup acknowledgement
    pub handshake_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash-native-audio-preview-09-2025".to_string(),
            input_sample_rate: 16000,
            frame_size: 4096,
            output_sample_rate: 24000,
            handshake_timeout: Duration::from_secs(10),
        }
    }
}

impl SessionConfig {
    pub fn input_config(&self) -> AudioBackendConfig {
        AudioBackendConfig {
            sample_rate: self.input_sample_rate,
            frame_size: self.frame_size,
            ..AudioBackendConfig::default()
        }
    }

    pub fn output_config(&self) -> OutputConfig {
        OutputConfig {
            sample_rate: self.output_sample_rate,
            channels: 1,
            record_path: None,
        }
    }

    /// Handshake payload for a call with `profile`: its voice, a persona
    /// instruction, and transcription in both directions.
    pub fn setup_for(&self, profile: &UserProfile) -> ClientSetupMessage {
        let model = if self.model.starts_with("models/") {
            self.model.clone()
        } else {
            format!("models/{}", self.model)
        };

        ClientSetupMessage {
            setup: Setup {
                model,
                generation_config: GenerationConfig {
                    response_modalities: vec!["AUDIO".to_string()],
                    speech_config: SpeechConfig {
                        voice_config: VoiceConfig {
                            prebuilt_voice_config: PrebuiltVoiceConfig {
                                voice_name: profile.voice.as_str().to_string(),
                            },
                        },
                    },
                },
                system_instruction: Content {
                    parts: vec![TextPart {
                        text: persona_instruction(profile),
                    }],
                },
                output_audio_transcription: Some(Empty {}),
                input_audio_transcription: Some(Empty {}),
            },
        }
    }
}

/// System instruction that has the model play `profile`
pub fn persona_instruction(profile: &UserProfile) -> String {
    format!(
        "You are {}, a person on a dating app. Your bio: {}. Your interests: {}. \
        Your job: {}. Talk in a friendly, engaging, and flirtatious manner. \
        Keep responses relatively concise as this is a real-time voice chat. \
        Act like a real person, not an AI.",
        profile.name,
        profile.bio,
        profile.interests.join(", "),
        profile.job_title
    )
}
