use crate::{
    adapters::{Synthesis, TextToSpeech, Transcription},
    alignment::bookmark_times,
    audio::wav_duration,
    bookmark::{self, ParsedText},
    cache::{CacheHandle, ContentCache},
    config::SpeechConfig,
    error::{Result, SpeechmarkError},
    types::{SpeechOutcome, SpeechResult, Transcript},
};

/// Text in, audio + transcript + bookmark times out.
///
/// Every artifact lands in the content cache, so a second run over the same
/// text reads it back instead of calling the backends again. Stages run one
/// after another; two processes sharing a cache entry race and the last
/// write wins.
pub struct SpeechPipeline {
    cache: ContentCache,
    synthesis: Synthesis,
    transcription: Transcription,
}

impl SpeechPipeline {
    /// Pipeline with no backends: audio must be recorded by hand and word
    /// timings fall back to a single whole-clip boundary.
    pub fn new(config: &SpeechConfig) -> Self {
        Self {
            cache: ContentCache::from_config(config),
            synthesis: Synthesis::Manual,
            transcription: Transcription::WholeClip,
        }
    }

    pub fn with_synthesis(mut self, synthesis: Synthesis) -> Self {
        self.synthesis = synthesis;
        self
    }

    pub fn with_transcription(mut self, transcription: Transcription) -> Self {
        self.transcription = transcription;
        self
    }

    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    /// Cache entry `raw_text` maps to, without creating it
    pub fn locate(&self, raw_text: &str) -> CacheHandle {
        self.cache.handle(&bookmark::strip(raw_text))
    }

    pub async fn synthesize(&self, raw_text: &str) -> Result<SpeechOutcome> {
        let parsed = bookmark::parse(raw_text);
        let handle = self.cache.lookup_or_create(&parsed.cleaned).await?;
        let audio_path = handle.audio_path();

        if handle.has_audio() {
            tracing::debug!(slug = handle.slug(), "audio cached");
        } else {
            match &self.synthesis {
                Synthesis::Adapter(tts) => {
                    tracing::info!(backend = tts.name(), slug = handle.slug(), "synthesizing");
                    if let Err(e) = produce_audio(&**tts, &handle, &parsed).await {
                        handle.discard_staged_audio().await;
                        return Err(e);
                    }
                }
                Synthesis::Manual => {
                    tracing::info!(path = %audio_path.display(), "waiting for manual recording");
                    return Ok(SpeechOutcome::NeedsManualRecording {
                        audio_path,
                        text: parsed.cleaned,
                    });
                }
            }
        }

        let duration = wav_duration(&audio_path)?;
        let transcript = self.transcript_for(&handle, &parsed, duration).await?;
        let bookmarks = bookmark_times(&parsed.markers, &transcript, parsed.cleaned_len());

        Ok(SpeechOutcome::Ready(SpeechResult {
            audio_path,
            transcript,
            duration,
            bookmarks,
        }))
    }

    async fn transcript_for(
        &self,
        handle: &CacheHandle,
        parsed: &ParsedText,
        duration: f64,
    ) -> Result<Transcript> {
        if handle.has_transcript() {
            tracing::debug!(slug = handle.slug(), "transcript cached");
            return handle.load_transcript().await;
        }

        match &self.transcription {
            Transcription::Adapter(stt) => {
                tracing::info!(backend = stt.name(), slug = handle.slug(), "transcribing");
                let transcript = stt.transcribe(&handle.audio_path()).await?;
                handle.save_transcript(&transcript).await?;
                Ok(transcript)
            }
            Transcription::WholeClip => {
                // not persisted: a later run with a real backend should still transcribe
                tracing::warn!(
                    slug = handle.slug(),
                    markers = parsed.markers.len(),
                    "no speech-to-text backend; bookmark times are rough estimates"
                );
                Ok(Transcript::whole_clip(parsed.cleaned.clone(), duration))
            }
        }
    }
}

/// Synthesize into the staging path; the file moves into the entry only once
/// it reads back as audio.
async fn produce_audio(
    tts: &dyn TextToSpeech,
    handle: &CacheHandle,
    parsed: &ParsedText,
) -> Result<()> {
    let staging = handle.staging_audio_path();
    tts.synthesize(&parsed.cleaned, &staging).await?;
    if !staging.exists() {
        return Err(SpeechmarkError::AudioNotProduced {
            audio_path: handle.audio_path(),
        });
    }
    wav_duration(&staging)?;
    handle.commit_audio().await
}
