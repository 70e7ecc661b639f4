use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use sha2::{Digest, Sha256};
use tokio::fs;

use crate::{config::SpeechConfig, error::Result, types::Transcript};

/// Hex digits of the digest kept in the slug
pub const DIGEST_PREFIX_LEN: usize = 16;
/// Characters of slugified text kept in the slug
pub const PREVIEW_LEN: usize = 32;

pub fn get_root_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("speechmark")
}

pub fn get_model_dir(cache_root: &Path) -> PathBuf {
    cache_root.join("models")
}

/// Lowercase hex SHA-256 of the text
pub fn text_digest(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

/// Lowercase ASCII alphanumerics, everything else collapsed into single dashes.
pub fn slugify(text: &str, max_len: usize) -> String {
    let mut slug = String::with_capacity(max_len);
    let mut pending_dash = false;

    for c in text.chars() {
        if slug.len() >= max_len {
            break;
        }
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
                if slug.len() >= max_len {
                    break;
                }
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug.trim_end_matches('-').to_string()
}

/// Directory name for a cleaned text: readable preview plus digest prefix
pub fn cache_slug(text: &str, digest: &str) -> String {
    let prefix = &digest[..DIGEST_PREFIX_LEN.min(digest.len())];
    let preview = slugify(text, PREVIEW_LEN);
    if preview.is_empty() {
        prefix.to_string()
    } else {
        format!("{preview}-{prefix}")
    }
}

/// Content-addressed store of synthesized speech, one directory per cleaned text.
#[derive(Debug, Clone)]
pub struct ContentCache {
    root: PathBuf,
    audio_extension: String,
}

impl ContentCache {
    pub fn new(root: impl Into<PathBuf>, audio_extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            audio_extension: audio_extension.into(),
        }
    }

    pub fn from_config(config: &SpeechConfig) -> Self {
        Self::new(&config.cache_root, &config.audio_extension)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve the entry for `cleaned` without touching the filesystem
    pub fn handle(&self, cleaned: &str) -> CacheHandle {
        let digest = text_digest(cleaned);
        let slug = cache_slug(cleaned, &digest);
        CacheHandle {
            dir: self.root.join(&slug),
            slug,
            digest,
            audio_extension: self.audio_extension.clone(),
        }
    }

    /// Resolve the entry for `cleaned`, creating its directory and writing
    /// `text.txt` on first use.
    pub async fn lookup_or_create(&self, cleaned: &str) -> Result<CacheHandle> {
        let handle = self.handle(cleaned);
        fs::create_dir_all(&handle.dir).await?;

        let text_path = handle.text_path();
        if !text_path.exists() {
            tracing::debug!(slug = %handle.slug, "creating cache entry");
            fs::write(&text_path, cleaned).await?;
        }

        Ok(handle)
    }

    /// Slugs of every entry currently on disk
    pub async fn entries(&self) -> Result<HashSet<String>> {
        let mut slugs = HashSet::new();
        if !self.root.exists() {
            return Ok(slugs);
        }

        let mut dir = fs::read_dir(&self.root).await?;
        while let Some(entry) = dir.next_entry().await? {
            if entry.path().join("text.txt").exists() {
                slugs.insert(entry.file_name().to_string_lossy().into_owned());
            }
        }
        Ok(slugs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheHandle {
    dir: PathBuf,
    slug: String,
    digest: String,
    audio_extension: String,
}

impl CacheHandle {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn audio_path(&self) -> PathBuf {
        self.dir.join(format!("audio.{}", self.audio_extension))
    }

    /// Where a backend writes audio before it is checked and moved to
    /// [`audio_path`](Self::audio_path)
    pub fn staging_audio_path(&self) -> PathBuf {
        self.dir.join(format!("audio.partial.{}", self.audio_extension))
    }

    pub fn transcript_path(&self) -> PathBuf {
        self.dir.join("transcript.json")
    }

    /// Cleaned text, written for inspection only
    pub fn text_path(&self) -> PathBuf {
        self.dir.join("text.txt")
    }

    pub fn has_audio(&self) -> bool {
        self.audio_path().exists()
    }

    pub fn has_transcript(&self) -> bool {
        self.transcript_path().exists()
    }

    pub async fn load_transcript(&self) -> Result<Transcript> {
        let json_content = fs::read_to_string(self.transcript_path()).await?;
        let transcript: Transcript = serde_json::from_str(&json_content)?;
        Ok(transcript)
    }

    pub async fn save_transcript(&self, transcript: &Transcript) -> Result<()> {
        let pretty_json = serde_json::to_string_pretty(transcript)?;
        let partial = self.dir.join("transcript.partial.json");
        fs::write(&partial, &pretty_json).await?;
        fs::rename(&partial, self.transcript_path()).await?;
        Ok(())
    }

    /// Move staged audio into place
    pub async fn commit_audio(&self) -> Result<()> {
        fs::rename(self.staging_audio_path(), self.audio_path()).await?;
        Ok(())
    }

    /// Drop staged audio left by a failed or interrupted synthesis
    pub async fn discard_staged_audio(&self) {
        let staging = self.staging_audio_path();
        if staging.exists() {
            if let Err(e) = fs::remove_file(&staging).await {
                tracing::warn!(path = %staging.display(), error = %e, "cannot remove staged audio");
            }
        }
    }
}
