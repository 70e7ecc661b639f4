use std::path::Path;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tokio::fs;

use crate::{
    adapters::{SpeechToText, TextToSpeech, api_key_from_env},
    error::{Result, SpeechmarkError},
    types::{TimedWord, Transcript},
};

pub const OPENAI_API_URL: &str = "https://api.openai.com/v1";
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// OpenAI speech endpoint, asked for WAV so the duration can be read back.
pub struct OpenAiTts {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    pub model: String,
    pub voice: String,
    pub speed: f32,
}

impl OpenAiTts {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: OPENAI_API_URL.to_string(),
            model: "tts-1-hd".to_string(),
            voice: "alloy".to_string(),
            speed: 1.0,
        }
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self::new(api_key_from_env(OPENAI_API_KEY_ENV)?))
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = voice.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    /// Point at an OpenAI-compatible server
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl TextToSpeech for OpenAiTts {
    fn name(&self) -> &'static str {
        "OpenAI"
    }

    async fn synthesize(&self, text: &str, output_path: &Path) -> Result<()> {
        tracing::info!(model = %self.model, voice = %self.voice, "requesting speech");

        let response = self
            .client
            .post(format!("{}/audio/speech", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&serde_json::json!({
                "model": self.model,
                "voice": self.voice,
                "input": text,
                "speed": self.speed,
                "response_format": "wav",
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SpeechmarkError::Synthesis {
                output_path: output_path.to_path_buf(),
                reason: format!("{status}: {body}"),
            });
        }

        let audio = response.bytes().await?;
        fs::write(output_path, &audio).await?;
        Ok(())
    }
}

/// OpenAI transcription endpoint with word-level timestamps.
pub struct OpenAiStt {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    pub model: String,
}

impl OpenAiStt {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: OPENAI_API_URL.to_string(),
            model: "whisper-1".to_string(),
        }
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self::new(api_key_from_env(OPENAI_API_KEY_ENV)?))
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct VerboseTranscription {
    text: String,
    #[serde(default)]
    words: Vec<WordTiming>,
}

#[derive(Debug, Deserialize)]
struct WordTiming {
    word: String,
    start: f64,
    end: f64,
}

fn parse_verbose_transcription(json: &str) -> Result<Transcript> {
    let response: VerboseTranscription = serde_json::from_str(json)?;
    let words = response
        .words
        .into_iter()
        .map(|w| TimedWord {
            text: w.word,
            start: w.start,
            end: w.end,
        })
        .collect();
    Ok(Transcript::from_words(response.text, words))
}

#[async_trait]
impl SpeechToText for OpenAiStt {
    fn name(&self) -> &'static str {
        "OpenAI"
    }

    async fn transcribe(&self, audio_path: &Path) -> Result<Transcript> {
        tracing::info!(model = %self.model, audio = %audio_path.display(), "requesting transcription");

        let audio = fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio.wav".to_string());

        let form = Form::new()
            .part("file", Part::bytes(audio).file_name(file_name))
            .text("model", self.model.clone())
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "word");

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(SpeechmarkError::Transcription {
                audio_path: audio_path.to_path_buf(),
                reason: format!("{status}: {body}"),
            });
        }

        parse_verbose_transcription(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_verbose_transcription() {
        let json = r#"{
            "task": "transcribe",
            "language": "english",
            "duration": 1.6,
            "text": "Hello, world.",
            "words": [
                {"word": "Hello", "start": 0.0, "end": 0.48},
                {"word": "world", "start": 0.7, "end": 1.2}
            ]
        }"#;

        let transcript = parse_verbose_transcription(json).unwrap();
        assert_eq!(transcript.text, "Hello, world.");
        assert_eq!(transcript.boundaries.len(), 2);
        assert_eq!(transcript.boundaries[1].text_start, 7);
        assert_eq!(transcript.boundaries[1].start, 0.7);
    }

    #[test]
    fn test_parse_without_words() {
        let transcript = parse_verbose_transcription(r#"{"text": "silence"}"#).unwrap();
        assert!(transcript.boundaries.is_empty());
    }

    #[test]
    fn test_builder_overrides() {
        let tts = OpenAiTts::new("key")
            .with_voice("nova")
            .with_model("tts-1")
            .with_speed(1.25)
            .with_base_url("http://localhost:8080/v1");
        assert_eq!(tts.voice, "nova");
        assert_eq!(tts.model, "tts-1");
        assert_eq!(tts.speed, 1.25);
        assert_eq!(tts.base_url, "http://localhost:8080/v1");
    }
}
