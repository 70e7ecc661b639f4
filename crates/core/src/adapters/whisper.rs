use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::{fs, process::Command};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::{
    adapters::SpeechToText,
    audio::load_pcm_16k_mono,
    cache::get_model_dir,
    error::{Result, SpeechmarkError},
    types::{TimedWord, Transcript},
};

pub const MODEL_NAME: &str = "ggml-medium-q5_0.bin";

/// Download the ggml model into `<cache_root>/models` unless it is already there.
pub async fn ensure_model(cache_root: &Path) -> Result<PathBuf> {
    let download_url = format!(
        "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/{}",
        MODEL_NAME
    );
    let model_dir = get_model_dir(cache_root);

    if !model_dir.exists() {
        fs::create_dir_all(&model_dir).await?;
    }

    let model_path = model_dir.join(MODEL_NAME);
    if !model_path.exists() {
        tracing::info!(url = %download_url, "downloading whisper model");
        let output = Command::new("curl")
            .arg("-fL")
            .arg(&download_url)
            .arg("-o")
            .arg(&model_path)
            .output()
            .await?;

        if !output.status.success() {
            let _ = fs::remove_file(&model_path).await;
            return Err(SpeechmarkError::ModelDownloadFailed {
                url: download_url,
                reason: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }
    }

    Ok(model_path)
}

/// Local whisper.cpp transcription. Segments are capped at one word so each
/// segment becomes one boundary.
pub struct WhisperStt {
    model_path: PathBuf,
    language: Option<String>,
}

impl WhisperStt {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            language: None,
        }
    }

    /// Force a language code instead of auto-detection
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

fn run_whisper(model_path: &Path, audio_path: &Path, language: Option<&str>) -> Result<Transcript> {
    let failed = |reason: String| SpeechmarkError::Transcription {
        audio_path: audio_path.to_path_buf(),
        reason,
    };

    let samples = load_pcm_16k_mono(audio_path)?;

    let ctx_params = WhisperContextParameters {
        use_gpu: true,
        flash_attn: true,
        ..Default::default()
    };
    let model_path_str = model_path.to_string_lossy();
    let ctx = WhisperContext::new_with_params(&model_path_str, ctx_params)
        .map_err(|e| failed(format!("failed to load model: {e}")))?;

    let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 5 });
    params.set_token_timestamps(true);
    params.set_split_on_word(true);
    params.set_max_len(1);
    params.set_language(Some(language.unwrap_or("auto")));
    params.set_print_progress(false);
    params.set_print_realtime(false);

    let mut state = ctx
        .create_state()
        .map_err(|e| failed(format!("failed to create state: {e}")))?;
    state
        .full(params, &samples)
        .map_err(|e| failed(format!("failed to run model: {e}")))?;

    let mut text = String::new();
    let mut words = Vec::new();

    for segment in state.as_iter() {
        let Ok(seg_text) = segment.to_str() else {
            continue;
        };
        if seg_text.trim().is_empty() {
            continue;
        }
        text.push_str(seg_text);
        // whisper timestamps are in centiseconds
        words.push(TimedWord {
            text: seg_text.to_string(),
            start: segment.start_timestamp() as f64 / 100.0,
            end: segment.end_timestamp() as f64 / 100.0,
        });
    }

    Ok(Transcript::from_words(text.trim(), words))
}

#[async_trait]
impl SpeechToText for WhisperStt {
    fn name(&self) -> &'static str {
        "Whisper"
    }

    async fn transcribe(&self, audio_path: &Path) -> Result<Transcript> {
        tracing::info!(model = %self.model_path.display(), "transcribing locally");

        let model_path = self.model_path.clone();
        let audio = audio_path.to_path_buf();
        let language = self.language.clone();

        tokio::task::spawn_blocking(move || run_whisper(&model_path, &audio, language.as_deref()))
            .await
            .map_err(|e| SpeechmarkError::Transcription {
                audio_path: audio_path.to_path_buf(),
                reason: format!("whisper task failed: {e}"),
            })?
    }
}
