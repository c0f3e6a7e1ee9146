// End-to-end tests for a live call
//
// A WAV file stands in for the microphone, the virtual output renders the
// remote voice to a WAV file, and an in-process transport plays the remote
// side.

use amora_live::audio::{codec, AudioSource};
use amora_live::dating::find_profile;
use amora_live::live::{ClientSetupMessage, ConnectionGuard, LiveConnection, LiveEvent, LiveTransport};
use amora_live::session::{CallPhase, ConfiguredDevices, LiveError, LiveSessionController, SessionConfig};
use amora_live::transcript::Speaker;
use anyhow::Result;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

struct RemoteSide {
    setup: ClientSetupMessage,
    audio_rx: mpsc::Receiver<Vec<u8>>,
    events_tx: mpsc::Sender<LiveEvent>,
}

#[derive(Default)]
struct LoopbackTransport {
    remote: Mutex<Option<RemoteSide>>,
}

#[async_trait::async_trait]
impl LiveTransport for LoopbackTransport {
    async fn connect(&self, setup: &ClientSetupMessage) -> Result<LiveConnection> {
        let (audio_tx, audio_rx) = mpsc::channel(64);
        let (events_tx, events_rx) = mpsc::channel(64);
        *self.remote.lock().unwrap() = Some(RemoteSide {
            setup: setup.clone(),
            audio_rx,
            events_tx,
        });
        Ok(LiveConnection {
            session_id: uuid::Uuid::new_v4().to_string(),
            outbound: audio_tx,
            events: events_rx,
            guard: ConnectionGuard::detached(),
        })
    }

    fn name(&self) -> &str {
        "loopback"
    }
}

fn write_input(path: &Path, seconds: f32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for _ in 0..(16000.0 * seconds) as usize {
        writer.write_sample(8192i16)?;
    }
    writer.finalize()?;
    Ok(())
}

fn session_config() -> SessionConfig {
    SessionConfig {
        // 50ms frames keep the test fast
        frame_size: 800,
        ..SessionConfig::default()
    }
}

fn controller(
    dir: &Path,
) -> Result<(LiveSessionController, Arc<LoopbackTransport>, std::path::PathBuf)> {
    let input = dir.join("mic.wav");
    let recording = dir.join("call.wav");
    write_input(&input, 5.0)?;

    let transport = Arc::new(LoopbackTransport::default());
    let devices = ConfiguredDevices::new(AudioSource::File(input), Some(recording.clone()));
    let controller = LiveSessionController::new(
        session_config(),
        Arc::clone(&transport) as Arc<dyn LiveTransport>,
        Arc::new(devices),
    );
    Ok((controller, transport, recording))
}

#[tokio::test]
async fn test_call_streams_mic_and_records_remote_voice() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let (controller, transport, recording) = controller(dir.path())?;
    let sofia = find_profile("3").unwrap();

    controller.start_call(&sofia).await?;
    let mut remote = transport.remote.lock().unwrap().take().unwrap();
    assert_eq!(
        remote.setup.setup.generation_config.speech_config.voice_config.prebuilt_voice_config.voice_name,
        "Kore"
    );

    // Microphone audio reaches the remote side as 16-bit PCM frames
    let pcm = tokio::time::timeout(Duration::from_secs(5), remote.audio_rx.recv())
        .await?
        .expect("no microphone audio");
    assert_eq!(pcm.len(), 800 * 2);
    assert_eq!(pcm, codec::encode(&[0.25; 800]));

    // 0.1s of remote speech, twice, plus transcripts from both sides
    let speech = codec::encode(&[0.5; 2400]);
    remote.events_tx.send(LiveEvent::Audio(speech.clone())).await?;
    remote.events_tx.send(LiveEvent::Audio(speech)).await?;
    remote.events_tx.send(LiveEvent::InputTranscription("Hi Sofia".into())).await?;
    remote.events_tx.send(LiveEvent::OutputTranscription("Oh, ".into())).await?;
    remote.events_tx.send(LiveEvent::OutputTranscription("hello!".into())).await?;

    let mut transcript = Vec::new();
    for _ in 0..100 {
        transcript = controller.transcript().await;
        if transcript.len() == 2 && transcript[1].text == "Oh, hello!" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[0].speaker, Speaker::You);
    assert_eq!(transcript[1].speaker, Speaker::Match);
    assert_eq!(transcript[1].text, "Oh, hello!");

    // Let both segments play out before hanging up
    tokio::time::sleep(Duration::from_millis(400)).await;

    let stats = controller.end_call().await?;
    assert_eq!(stats.profile_id, "3");
    assert_eq!(stats.chunks_scheduled, 2);
    assert!(stats.frames_sent >= 1);

    assert_eq!(controller.status().await.phase, CallPhase::Idle);
    assert!(controller.transcript().await.is_empty());

    // Both segments were rendered back to back
    let reader = hound::WavReader::open(&recording)?;
    assert_eq!(reader.spec().sample_rate, 24000);
    let samples: Vec<i16> = reader.into_samples::<i16>().collect::<Result<_, _>>()?;
    let voiced = samples.iter().filter(|&&s| s == 16384).count();
    assert_eq!(voiced, 4800);

    Ok(())
}

#[tokio::test]
async fn test_closed_send_path_is_silent_after_hangup() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let (controller, transport, _) = controller(dir.path())?;

    controller.start_call(&find_profile("1").unwrap()).await?;
    let mut remote = transport.remote.lock().unwrap().take().unwrap();

    controller.end_call().await?;

    // Capture has stopped: the outbound stream ends instead of delivering more
    let drained = tokio::time::timeout(Duration::from_secs(5), async {
        while remote.audio_rx.recv().await.is_some() {}
    })
    .await;
    assert!(drained.is_ok());

    // The remote side can no longer reach the session
    assert!(remote.events_tx.send(LiveEvent::TurnComplete).await.is_err());

    Ok(())
}

#[tokio::test]
async fn test_missing_input_file_fails_start() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let transport = Arc::new(LoopbackTransport::default());
    let devices = ConfiguredDevices::new(AudioSource::File(dir.path().join("missing.wav")), None);
    let controller = LiveSessionController::new(
        session_config(),
        Arc::clone(&transport) as Arc<dyn LiveTransport>,
        Arc::new(devices),
    );

    let err = controller.start_call(&find_profile("2").unwrap()).await.unwrap_err();
    assert!(matches!(err, LiveError::Microphone(_)));
    assert_eq!(controller.status().await.phase, CallPhase::Idle);
    // Handshake never attempted
    assert!(transport.remote.lock().unwrap().is_none());

    Ok(())
}
