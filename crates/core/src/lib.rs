//! Speechmark Core Library
//!
//! Narration for generated video: strips bookmark markers from text, has the
//! text spoken and transcribed, and works out when each bookmark is reached
//! in the audio. Results are cached on disk by content.

pub mod adapters;
pub mod alignment;
pub mod audio;
pub mod bookmark;
pub mod cache;
pub mod config;
pub mod error;
pub mod format;
pub mod pipeline;
pub mod types;

// Re-export commonly used items at crate root
pub use adapters::{
    ChatTranslator, OpenAiStt, OpenAiTts, SpeechToText, Synthesis, TextToSpeech, Transcription,
    Translator,
    chat::{Endpoint, Provider},
};
#[cfg(feature = "whisper")]
pub use adapters::{WhisperStt, ensure_model};
pub use alignment::bookmark_times;
pub use bookmark::{MarkerOffsets, ParsedText, parse, strip};
pub use cache::{CacheHandle, ContentCache};
pub use config::SpeechConfig;
pub use error::{Result, SpeechmarkError};
pub use format::{format_bookmarks, format_speech_readable, format_timestamp, format_transcript_with_timestamps};
pub use pipeline::SpeechPipeline;
pub use types::{BookmarkMap, Boundary, SpeechOutcome, SpeechResult, TimedWord, Transcript};
