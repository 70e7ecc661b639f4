use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpeechmarkError {
    #[error("Speech synthesis failed for {output_path}: {reason}")]
    Synthesis { output_path: PathBuf, reason: String },

    #[error("TTS backend finished but no audio was written to {audio_path}")]
    AudioNotProduced { audio_path: PathBuf },

    #[error("Transcription failed for {audio_path}: {reason}")]
    Transcription { audio_path: PathBuf, reason: String },

    #[error("Translation failed: {reason}")]
    Translation { reason: String },

    #[error("Cannot read audio metadata: {0}")]
    AudioMetadata(#[from] hound::Error),

    #[error("Cannot build resampler: {0}")]
    ResamplerSetup(#[from] rubato::ResamplerConstructionError),

    #[error("Resampling failed: {0}")]
    Resample(#[from] rubato::ResampleError),

    #[error("Model download failed for {url}: {reason}")]
    ModelDownloadFailed { url: String, reason: String },

    #[error("Missing API key: {env_var} environment variable is not set")]
    MissingApiKey { env_var: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, SpeechmarkError>;
