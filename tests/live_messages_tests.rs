use amora_live::audio::codec;
use amora_live::dating::find_profile;
use amora_live::live::{parse_server_message, LiveEvent, RealtimeInputMessage};
use amora_live::nats::AudioFrameMessage;
use amora_live::session::SessionConfig;

#[test]
fn test_audio_frame_serialization() {
    let msg = AudioFrameMessage {
        session_id: "call-1".to_string(),
        sequence: 0,
        pcm: codec::to_base64(&[0u8; 100]),
        sample_rate: 16000,
        channels: 1,
        timestamp: "2025-10-27T14:30:00Z".to_string(),
        final_frame: false,
    };

    let json = serde_json::to_string(&msg).unwrap();
    assert!(json.contains("call-1"));
    assert!(json.contains("\"final\":false"));
    assert!(json.contains("\"sequence\":0"));

    let deserialized: AudioFrameMessage = serde_json::from_str(&json).unwrap();
    assert_eq!(deserialized, msg);
}

#[test]
fn test_setup_message_for_profile() {
    let julian = find_profile("4").unwrap();
    let setup = SessionConfig::default().setup_for(&julian);

    let json = serde_json::to_value(&setup).unwrap();
    assert_eq!(
        json["setup"]["model"],
        "models/gemini-2.5-flash-native-audio-preview-09-2025"
    );
    assert_eq!(
        json["setup"]["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]["voiceName"],
        "Zephyr"
    );
    let instruction = json["setup"]["systemInstruction"]["parts"][0]["text"]
        .as_str()
        .unwrap();
    assert!(instruction.contains("You are Julian"));
    assert!(instruction.contains("Act like a real person, not an AI."));
}

#[test]
fn test_outbound_audio_round_trips_through_base64() {
    let samples = [0.0, 0.5, -0.5, 0.999];
    let pcm = codec::encode(&samples);

    let json = serde_json::to_string(&RealtimeInputMessage::audio(&pcm)).unwrap();
    assert!(json.contains("\"mimeType\":\"audio/pcm;rate=16000\""));

    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let data = value["realtimeInput"]["mediaChunks"][0]["data"].as_str().unwrap();
    let decoded = codec::decode(&codec::from_base64(data).unwrap(), 1, 16000).unwrap();

    for (orig, got) in samples.iter().zip(&decoded.channels[0]) {
        assert!((orig - got).abs() <= 1.0 / 32768.0);
    }
}

#[test]
fn test_server_turn_with_everything() {
    let audio = codec::to_base64(&codec::encode(&[0.25; 4]));
    let payload = format!(
        r#"{{"serverContent":{{
            "modelTurn":{{"parts":[{{"text":"ignored"}},{{"inlineData":{{"mimeType":"audio/pcm;rate=24000","data":"{}"}}}}]}},
            "outputTranscription":{{"text":"Hi"}},
            "inputTranscription":{{"text":"Hello"}},
            "turnComplete":true
        }}}}"#,
        audio
    );

    let events = parse_server_message(payload.as_bytes()).unwrap();
    assert_eq!(
        events,
        vec![
            LiveEvent::Audio(codec::encode(&[0.25; 4])),
            LiveEvent::OutputTranscription("Hi".to_string()),
            LiveEvent::InputTranscription("Hello".to_string()),
            LiveEvent::TurnComplete,
        ]
    );
}
