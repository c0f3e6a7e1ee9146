//! Live API wire messages.
//!
//! Outbound: the `setup` handshake and `realtimeInput` audio chunks.
//! Inbound: `setupComplete`, `serverContent` and `goAway`, flattened into
//! [`LiveEvent`]s.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::audio::codec;

/// MIME type of outbound microphone audio
pub const INPUT_AUDIO_MIME: &str = "audio/pcm;rate=16000";

/// Everything the remote session can tell us
#[derive(Debug, Clone, PartialEq)]
pub enum LiveEvent {
    /// Handshake accepted
    SetupComplete,
    /// 16-bit PCM from the model (24kHz mono)
    Audio(Vec<u8>),
    /// Transcription of the model's speech
    OutputTranscription(String),
    /// Transcription of the user's speech
    InputTranscription(String),
    /// The user barged in; drop queued playback
    Interrupted,
    /// The model finished its turn
    TurnComplete,
    /// The remote side closed the session
    Closed { reason: String },
    /// Transport or protocol failure
    Error(String),
}

// ============================================================================
// Outbound
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientSetupMessage {
    pub setup: Setup,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    /// e.g. "models/gemini-2.5-flash-native-audio-preview-09-2025"
    pub model: String,
    pub generation_config: GenerationConfig,
    pub system_instruction: Content,
    /// Present (empty) to request transcription of model audio
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_audio_transcription: Option<Empty>,
    /// Present (empty) to request transcription of user audio
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_transcription: Option<Empty>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Empty {}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
    pub speech_config: SpeechConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Content {
    pub parts: Vec<TextPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextPart {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInputMessage {
    pub realtime_input: RealtimeInput,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    pub media_chunks: Vec<Blob>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    /// Base64-encoded bytes
    pub data: String,
}

impl RealtimeInputMessage {
    /// Wrap one captured PCM chunk
    pub fn audio(pcm: &[u8]) -> Self {
        Self {
            realtime_input: RealtimeInput {
                media_chunks: vec![Blob {
                    mime_type: INPUT_AUDIO_MIME.to_string(),
                    data: codec::to_base64(pcm),
                }],
            },
        }
    }
}

// ============================================================================
// Inbound
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerMessage {
    setup_complete: Option<serde_json::Value>,
    server_content: Option<ServerContent>,
    go_away: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerContent {
    model_turn: Option<ModelTurn>,
    output_transcription: Option<Transcription>,
    input_transcription: Option<Transcription>,
    #[serde(default)]
    interrupted: bool,
    #[serde(default)]
    turn_complete: bool,
}

#[derive(Debug, Default, Deserialize)]
struct ModelTurn {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    inline_data: Option<Blob>,
}

#[derive(Debug, Default, Deserialize)]
struct Transcription {
    #[serde(default)]
    text: String,
}

/// Flatten one server message into events, in the order they must be
/// applied: audio, transcriptions, then interruption and turn end.
pub fn parse_server_message(payload: &[u8]) -> Result<Vec<LiveEvent>> {
    let message: ServerMessage =
        serde_json::from_slice(payload).context("Malformed Live API message")?;
    let mut events = Vec::new();

    if message.setup_complete.is_some() {
        events.push(LiveEvent::SetupComplete);
    }

    if let Some(content) = message.server_content {
        if let Some(turn) = content.model_turn {
            for blob in turn.parts.into_iter().filter_map(|p| p.inline_data) {
                if !blob.mime_type.starts_with("audio/pcm") {
                    continue;
                }
                match codec::from_base64(&blob.data) {
                    Ok(pcm) => events.push(LiveEvent::Audio(pcm)),
                    Err(e) => warn!("Skipping audio part that is not valid base64: {:#}", e),
                }
            }
        }
        if let Some(t) = content.output_transcription {
            events.push(LiveEvent::OutputTranscription(t.text));
        }
        if let Some(t) = content.input_transcription {
            events.push(LiveEvent::InputTranscription(t.text));
        }
        if content.interrupted {
            events.push(LiveEvent::Interrupted);
        }
        if content.turn_complete {
            events.push(LiveEvent::TurnComplete);
        }
    }

    if let Some(go_away) = message.go_away {
        events.push(LiveEvent::Closed {
            reason: format!("server going away: {}", go_away),
        });
    }

    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_serializes_in_api_shape() {
        let msg = ClientSetupMessage {
            setup: Setup {
                model: "models/test".to_string(),
                generation_config: GenerationConfig {
                    response_modalities: vec!["AUDIO".to_string()],
                    speech_config: SpeechConfig {
                        voice_config: VoiceConfig {
                            prebuilt_voice_config: PrebuiltVoiceConfig {
                                voice_name: "Kore".to_string(),
                            },
                        },
                    },
                },
                system_instruction: Content {
                    parts: vec![TextPart { text: "be nice".to_string() }],
                },
                output_audio_transcription: Some(Empty {}),
                input_audio_transcription: Some(Empty {}),
            },
        };

        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json["setup"]["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]
                ["voiceName"],
            "Kore"
        );
        assert_eq!(json["setup"]["generationConfig"]["responseModalities"][0], "AUDIO");
        assert_eq!(json["setup"]["systemInstruction"]["parts"][0]["text"], "be nice");
        assert!(json["setup"]["outputAudioTranscription"].is_object());
        assert!(json["setup"]["inputAudioTranscription"].is_object());
    }

    #[test]
    fn test_realtime_input_carries_base64_pcm() {
        let pcm = codec::encode(&[0.5, -0.5]);
        let json = serde_json::to_value(RealtimeInputMessage::audio(&pcm)).unwrap();

        let chunk = &json["realtimeInput"]["mediaChunks"][0];
        assert_eq!(chunk["mimeType"], INPUT_AUDIO_MIME);
        assert_eq!(codec::from_base64(chunk["data"].as_str().unwrap()).unwrap(), pcm);
    }

    #[test]
    fn test_parse_setup_complete() {
        let events = parse_server_message(br#"{"setupComplete":{}}"#).unwrap();
        assert_eq!(events, vec![LiveEvent::SetupComplete]);
    }

    #[test]
    fn test_parse_audio_and_transcription() {
        let data = codec::to_base64(&[1, 0, 2, 0]);
        let payload = format!(
            r#"{{"serverContent":{{
                "modelTurn":{{"parts":[{{"inlineData":{{"mimeType":"audio/pcm;rate=24000","data":"{}"}}}}]}},
                "outputTranscription":{{"text":"Hey"}}
            }}}}"#,
            data
        );

        let events = parse_server_message(payload.as_bytes()).unwrap();
        assert_eq!(
            events,
            vec![
                LiveEvent::Audio(vec![1, 0, 2, 0]),
                LiveEvent::OutputTranscription("Hey".to_string()),
            ]
        );
    }

    #[test]
    fn test_bad_audio_part_keeps_rest_of_message() {
        let good = codec::to_base64(&[3, 0]);
        let payload = format!(
            r#"{{"serverContent":{{
                "modelTurn":{{"parts":[
                    {{"inlineData":{{"mimeType":"audio/pcm;rate=24000","data":"%%not base64%%"}}}},
                    {{"inlineData":{{"mimeType":"audio/pcm;rate=24000","data":"{}"}}}}
                ]}},
                "outputTranscription":{{"text":"still here"}},
                "inputTranscription":{{"text":"me too"}}
            }}}}"#,
            good
        );

        let events = parse_server_message(payload.as_bytes()).unwrap();
        assert_eq!(
            events,
            vec![
                LiveEvent::Audio(vec![3, 0]),
                LiveEvent::OutputTranscription("still here".to_string()),
                LiveEvent::InputTranscription("me too".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_input_transcription_and_interrupt() {
        let payload = br#"{"serverContent":{"inputTranscription":{"text":"wait"},"interrupted":true}}"#;
        let events = parse_server_message(payload).unwrap();
        assert_eq!(
            events,
            vec![
                LiveEvent::InputTranscription("wait".to_string()),
                LiveEvent::Interrupted,
            ]
        );
    }

    #[test]
    fn test_parse_turn_complete_and_go_away() {
        let events =
            parse_server_message(br#"{"serverContent":{"turnComplete":true}}"#).unwrap();
        assert_eq!(events, vec![LiveEvent::TurnComplete]);

        let events = parse_server_message(br#"{"goAway":{"timeLeft":"5s"}}"#).unwrap();
        assert!(matches!(events[0], LiveEvent::Closed { .. }));
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let events = parse_server_message(br#"{"usageMetadata":{"totalTokenCount":3}}"#).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_malformed_payload_is_an_error() {
        assert!(parse_server_message(b"not json").is_err());
    }
}
