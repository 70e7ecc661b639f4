use std::path::PathBuf;

use crate::cache::get_root_cache_dir;

/// Settings threaded into [`crate::pipeline::SpeechPipeline`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechConfig {
    /// Directory holding one sub-directory per cached text
    pub cache_root: PathBuf,
    /// Extension of the audio artifact. Duration is read from WAV headers, so
    /// backends are asked for WAV output.
    pub audio_extension: String,
}

impl SpeechConfig {
    pub fn with_cache_root(cache_root: impl Into<PathBuf>) -> Self {
        Self {
            cache_root: cache_root.into(),
            ..Self::default()
        }
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            cache_root: get_root_cache_dir(),
            audio_extension: "wav".to_string(),
        }
    }
}
