use std::{collections::BTreeMap, path::PathBuf};

use serde::{Deserialize, Serialize};

/// One transcribed token with its playback window.
///
/// `text_start` is measured in characters (not bytes) into [`Transcript::text`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Boundary {
    pub text: String,
    pub start: f64,
    pub end: f64,
    pub text_start: usize,
}

impl Boundary {
    /// Length of the token in characters
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn text_end(&self) -> usize {
        self.text_start + self.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    pub boundaries: Vec<Boundary>,
}

/// A recognized word as reported by a speech-to-text backend, before it is
/// located in the transcript text.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedWord {
    pub text: String,
    pub start: f64,
    pub end: f64,
}

impl Transcript {
    /// Build a transcript by locating each word in `text`, scanning forward
    /// from the end of the previous match.
    ///
    /// Words the backend normalized beyond recognition keep the current
    /// cursor position, so offsets stay monotonic.
    pub fn from_words(text: impl Into<String>, words: Vec<TimedWord>) -> Self {
        let text = text.into();
        let total_chars = text.chars().count();
        let mut byte_cursor = 0;
        let mut char_cursor = 0;
        let mut boundaries = Vec::with_capacity(words.len());

        for word in words {
            let token = word.text.trim();
            let text_start = match text[byte_cursor..].find(token).filter(|_| !token.is_empty()) {
                Some(rel) => {
                    let found = byte_cursor + rel;
                    let start = char_cursor + text[byte_cursor..found].chars().count();
                    char_cursor = start + token.chars().count();
                    byte_cursor = found + token.len();
                    start
                }
                None => char_cursor.min(total_chars.saturating_sub(1)),
            };

            boundaries.push(Boundary {
                text: token.to_string(),
                start: word.start,
                end: word.end.max(word.start),
                text_start,
            });
        }

        Self { text, boundaries }
    }

    /// Single boundary covering the whole text and the whole clip.
    pub fn whole_clip(text: impl Into<String>, duration: f64) -> Self {
        let text = text.into();
        Self {
            boundaries: vec![Boundary {
                text: text.clone(),
                start: 0.0,
                end: duration,
                text_start: 0,
            }],
            text,
        }
    }

    /// End time of the last boundary, or `0.0` for an empty transcript
    pub fn end_time(&self) -> f64 {
        self.boundaries.last().map(|b| b.end).unwrap_or(0.0)
    }
}

/// Bookmark name to seconds from the start of the audio.
pub type BookmarkMap = BTreeMap<String, f64>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechResult {
    pub audio_path: PathBuf,
    pub transcript: Transcript,
    pub duration: f64,
    pub bookmarks: BookmarkMap,
}

impl SpeechResult {
    pub fn bookmark(&self, name: &str) -> Option<f64> {
        self.bookmarks.get(name).copied()
    }
}

/// What a pipeline run produced.
#[derive(Debug, Clone, PartialEq)]
pub enum SpeechOutcome {
    Ready(SpeechResult),
    /// No TTS backend is configured and nobody has recorded the clip yet.
    /// Record `text` to `audio_path` and run again.
    NeedsManualRecording { audio_path: PathBuf, text: String },
}

impl SpeechOutcome {
    pub fn ready(self) -> Option<SpeechResult> {
        match self {
            SpeechOutcome::Ready(result) => Some(result),
            SpeechOutcome::NeedsManualRecording { .. } => None,
        }
    }
}
