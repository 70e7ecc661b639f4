//! Pluggable speech and translation backends.
//!
//! The pipeline only sees the traits below. Which backend (if any) fills each
//! role is decided once, when the pipeline is built.

use std::path::Path;

use async_trait::async_trait;

use crate::{error::Result, types::Transcript};

pub mod chat;
pub mod openai;
#[cfg(feature = "whisper")]
pub mod whisper;

pub use chat::ChatTranslator;
pub use openai::{OpenAiStt, OpenAiTts};
#[cfg(feature = "whisper")]
pub use whisper::{WhisperStt, ensure_model};

/// Turns text into an audio file.
#[async_trait]
pub trait TextToSpeech: Send + Sync {
    fn name(&self) -> &'static str;

    /// Write playable audio for `text` to `output_path`.
    async fn synthesize(&self, text: &str, output_path: &Path) -> Result<()>;
}

/// Turns an audio file into a timed transcript.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    fn name(&self) -> &'static str;

    /// Boundaries must be ordered, with `start <= end` and offsets valid
    /// against the returned text.
    async fn transcribe(&self, audio_path: &Path) -> Result<Transcript>;
}

#[async_trait]
pub trait Translator: Send + Sync {
    fn name(&self) -> &'static str;

    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String>;
}

/// Where audio comes from.
pub enum Synthesis {
    Adapter(Box<dyn TextToSpeech>),
    /// A person records the clip; the pipeline reports where to put it.
    Manual,
}

impl Synthesis {
    pub fn adapter(tts: impl TextToSpeech + 'static) -> Self {
        Synthesis::Adapter(Box::new(tts))
    }
}

/// Where word timings come from.
pub enum Transcription {
    Adapter(Box<dyn SpeechToText>),
    /// One boundary spanning the whole clip. Bookmarks lose precision.
    WholeClip,
}

impl Transcription {
    pub fn adapter(stt: impl SpeechToText + 'static) -> Self {
        Transcription::Adapter(Box::new(stt))
    }
}

pub(crate) fn api_key_from_env(env_var: &str) -> Result<String> {
    std::env::var(env_var).map_err(|_| crate::error::SpeechmarkError::MissingApiKey {
        env_var: env_var.to_string(),
    })
}
