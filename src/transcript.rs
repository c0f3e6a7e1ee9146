use serde::{Deserialize, Serialize};

/// Who said a transcribed fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    /// The local user (input transcription)
    You,
    /// The matched persona (output transcription)
    Match,
}

/// One speaker turn of transcribed text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptLine {
    pub speaker: Speaker,
    pub text: String,
}

/// Merges speaker-tagged fragments into lines, one line per turn.
#[derive(Debug, Default, Clone)]
pub struct TranscriptAccumulator {
    lines: Vec<TranscriptLine>,
}

impl TranscriptAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment to the current turn, or start a new line when the
    /// speaker changed.
    pub fn push(&mut self, speaker: Speaker, text: &str) {
        match self.lines.last_mut() {
            Some(last) if last.speaker == speaker => last.text.push_str(text),
            _ => self.lines.push(TranscriptLine {
                speaker,
                text: text.to_string(),
            }),
        }
    }

    pub fn lines(&self) -> &[TranscriptLine] {
        &self.lines
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}
