use std::{
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use hound::{SampleFormat, WavSpec, WavWriter};
use speechmark_core::{
    Result, SpeechConfig, SpeechOutcome, SpeechPipeline, SpeechToText, SpeechmarkError, Synthesis,
    TextToSpeech, TimedWord, Transcript, Transcription,
};
use tempfile::tempdir;

const SAMPLE_RATE: u32 = 16_000;

fn write_silence(path: &Path, seconds: f64) {
    let spec = WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec).unwrap();
    for _ in 0..(seconds * SAMPLE_RATE as f64) as usize {
        writer.write_sample(0i16).unwrap();
    }
    writer.finalize().unwrap();
}

struct FakeTts {
    calls: Arc<AtomicUsize>,
    seconds: f64,
}

#[async_trait]
impl TextToSpeech for FakeTts {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn synthesize(&self, _text: &str, output_path: &Path) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        write_silence(output_path, self.seconds);
        Ok(())
    }
}

struct SilentTts;

#[async_trait]
impl TextToSpeech for SilentTts {
    fn name(&self) -> &'static str {
        "silent"
    }

    async fn synthesize(&self, _text: &str, _output_path: &Path) -> Result<()> {
        Ok(())
    }
}

struct FailingTts;

#[async_trait]
impl TextToSpeech for FailingTts {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn synthesize(&self, _text: &str, output_path: &Path) -> Result<()> {
        Err(SpeechmarkError::Synthesis {
            output_path: output_path.to_path_buf(),
            reason: "401 Unauthorized".to_string(),
        })
    }
}

struct GarbageTts;

#[async_trait]
impl TextToSpeech for GarbageTts {
    fn name(&self) -> &'static str {
        "garbage"
    }

    async fn synthesize(&self, _text: &str, output_path: &Path) -> Result<()> {
        std::fs::write(output_path, b"ID3\x03not a wav").unwrap();
        Ok(())
    }
}

struct FailingStt;

#[async_trait]
impl SpeechToText for FailingStt {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn transcribe(&self, audio_path: &Path) -> Result<Transcript> {
        Err(SpeechmarkError::Transcription {
            audio_path: audio_path.to_path_buf(),
            reason: "connection reset".to_string(),
        })
    }
}

struct FakeStt {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl SpeechToText for FakeStt {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn transcribe(&self, _audio_path: &Path) -> Result<Transcript> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Transcript::from_words(
            "Hello world",
            vec![
                TimedWord {
                    text: "Hello".to_string(),
                    start: 0.0,
                    end: 0.5,
                },
                TimedWord {
                    text: "world".to_string(),
                    start: 1.0,
                    end: 1.5,
                },
            ],
        ))
    }
}

struct Counters {
    tts: Arc<AtomicUsize>,
    stt: Arc<AtomicUsize>,
}

fn full_pipeline(root: &Path) -> (SpeechPipeline, Counters) {
    let counters = Counters {
        tts: Arc::new(AtomicUsize::new(0)),
        stt: Arc::new(AtomicUsize::new(0)),
    };
    let pipeline = SpeechPipeline::new(&SpeechConfig::with_cache_root(root))
        .with_synthesis(Synthesis::adapter(FakeTts {
            calls: Arc::clone(&counters.tts),
            seconds: 2.0,
        }))
        .with_transcription(Transcription::adapter(FakeStt {
            calls: Arc::clone(&counters.stt),
        }));
    (pipeline, counters)
}

#[tokio::test]
async fn test_full_run_computes_bookmarks() {
    let temp_dir = tempdir().unwrap();
    let (pipeline, counters) = full_pipeline(temp_dir.path());

    let result = pipeline
        .synthesize("Hello <bookmark mark='a'/>world<bookmark mark='end'/>")
        .await
        .unwrap()
        .ready()
        .unwrap();

    assert_eq!(result.duration, 2.0);
    assert_eq!(result.bookmark("a"), Some(1.0));
    assert_eq!(result.bookmark("end"), Some(1.5));
    assert_eq!(result.transcript.boundaries.len(), 2);
    assert!(result.audio_path.ends_with("audio.wav"));
    assert_eq!(counters.tts.load(Ordering::SeqCst), 1);
    assert_eq!(counters.stt.load(Ordering::SeqCst), 1);

    let handle = pipeline.locate("Hello <bookmark mark='a'/>world<bookmark mark='end'/>");
    assert!(handle.has_transcript());
    assert_eq!(
        std::fs::read_to_string(handle.text_path()).unwrap(),
        "Hello world"
    );
}

#[tokio::test]
async fn test_second_run_is_served_from_cache() {
    let temp_dir = tempdir().unwrap();
    let (pipeline, counters) = full_pipeline(temp_dir.path());
    let text = "Hello <bookmark mark='a'/>world";

    let first = pipeline.synthesize(text).await.unwrap();
    let second = pipeline.synthesize(text).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(counters.tts.load(Ordering::SeqCst), 1);
    assert_eq!(counters.stt.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_markers_do_not_affect_cache_key() {
    let temp_dir = tempdir().unwrap();
    let (pipeline, counters) = full_pipeline(temp_dir.path());

    let a = pipeline
        .synthesize("Hello <bookmark mark='a'/>world")
        .await
        .unwrap()
        .ready()
        .unwrap();
    let b = pipeline
        .synthesize("<bookmark mark='b'/>Hello world")
        .await
        .unwrap()
        .ready()
        .unwrap();

    assert_eq!(a.audio_path, b.audio_path);
    assert_eq!(b.bookmark("b"), Some(0.0));
    assert_eq!(counters.tts.load(Ordering::SeqCst), 1);
    assert_eq!(pipeline.cache().entries().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_persisted_transcript_is_reused_by_new_pipeline() {
    let temp_dir = tempdir().unwrap();
    let (pipeline, _) = full_pipeline(temp_dir.path());
    let text = "Hello <bookmark mark='a'/>world";
    let first = pipeline.synthesize(text).await.unwrap();

    let (fresh, counters) = full_pipeline(temp_dir.path());
    let second = fresh.synthesize(text).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(counters.tts.load(Ordering::SeqCst), 0);
    assert_eq!(counters.stt.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_manual_recording_round_trip() {
    let temp_dir = tempdir().unwrap();
    let pipeline = SpeechPipeline::new(&SpeechConfig::with_cache_root(temp_dir.path()));
    let text = "Hello <bookmark mark='a'/>world";

    let outcome = pipeline.synthesize(text).await.unwrap();
    let SpeechOutcome::NeedsManualRecording { audio_path, text: to_record } = outcome else {
        panic!("expected a manual recording request");
    };
    assert_eq!(to_record, "Hello world");
    assert!(!audio_path.exists());

    write_silence(&audio_path, 3.0);

    let result = pipeline.synthesize(text).await.unwrap().ready().unwrap();
    assert_eq!(result.audio_path, audio_path);
    assert_eq!(result.duration, 3.0);
    // one whole-clip boundary: every bookmark collapses to its start
    assert_eq!(result.transcript.boundaries.len(), 1);
    assert_eq!(result.transcript.boundaries[0].end, 3.0);
    assert_eq!(result.bookmark("a"), Some(0.0));
    assert!(!pipeline.locate(text).has_transcript());
}

#[tokio::test]
async fn test_whole_clip_fallback_is_upgraded_later() {
    let temp_dir = tempdir().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let text = "Hello <bookmark mark='a'/>world";

    let coarse = SpeechPipeline::new(&SpeechConfig::with_cache_root(temp_dir.path()))
        .with_synthesis(Synthesis::adapter(FakeTts {
            calls: Arc::clone(&calls),
            seconds: 2.0,
        }));
    let coarse_result = coarse.synthesize(text).await.unwrap().ready().unwrap();
    assert_eq!(coarse_result.bookmark("a"), Some(0.0));

    let (precise, counters) = full_pipeline(temp_dir.path());
    let precise_result = precise.synthesize(text).await.unwrap().ready().unwrap();
    assert_eq!(precise_result.bookmark("a"), Some(1.0));
    assert_eq!(counters.tts.load(Ordering::SeqCst), 0);
    assert_eq!(counters.stt.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_tts_without_output_is_an_error() {
    let temp_dir = tempdir().unwrap();
    let pipeline = SpeechPipeline::new(&SpeechConfig::with_cache_root(temp_dir.path()))
        .with_synthesis(Synthesis::adapter(SilentTts));

    let err = pipeline.synthesize("Hello world").await.unwrap_err();
    assert!(matches!(err, SpeechmarkError::AudioNotProduced { .. }));
}

#[tokio::test]
async fn test_tts_failure_stops_the_build() {
    let temp_dir = tempdir().unwrap();
    let pipeline = SpeechPipeline::new(&SpeechConfig::with_cache_root(temp_dir.path()))
        .with_synthesis(Synthesis::adapter(FailingTts));

    let err = pipeline.synthesize("Hello world").await.unwrap_err();
    assert!(matches!(err, SpeechmarkError::Synthesis { .. }));
    assert!(!pipeline.locate("Hello world").has_audio());
}

#[tokio::test]
async fn test_text_without_markers_has_no_bookmarks() {
    let temp_dir = tempdir().unwrap();
    let (pipeline, _) = full_pipeline(temp_dir.path());

    let result = pipeline
        .synthesize("Hello world")
        .await
        .unwrap()
        .ready()
        .unwrap();
    assert!(result.bookmarks.is_empty());
}

#[tokio::test]
async fn test_unreadable_audio_is_not_cached() {
    let temp_dir = tempdir().unwrap();
    let text = "Hello <bookmark mark='a'/>world";
    let broken = SpeechPipeline::new(&SpeechConfig::with_cache_root(temp_dir.path()))
        .with_synthesis(Synthesis::adapter(GarbageTts));

    let err = broken.synthesize(text).await.unwrap_err();
    assert!(matches!(err, SpeechmarkError::AudioMetadata(_)));
    let handle = broken.locate(text);
    assert!(!handle.has_audio());
    assert!(!handle.staging_audio_path().exists());

    let (working, counters) = full_pipeline(temp_dir.path());
    let result = working.synthesize(text).await.unwrap().ready().unwrap();
    assert_eq!(result.bookmark("a"), Some(1.0));
    assert_eq!(counters.tts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_stt_failure_keeps_audio_and_retries_transcription() {
    let temp_dir = tempdir().unwrap();
    let tts_calls = Arc::new(AtomicUsize::new(0));
    let text = "Hello <bookmark mark='a'/>world";

    let failing = SpeechPipeline::new(&SpeechConfig::with_cache_root(temp_dir.path()))
        .with_synthesis(Synthesis::adapter(FakeTts {
            calls: Arc::clone(&tts_calls),
            seconds: 2.0,
        }))
        .with_transcription(Transcription::adapter(FailingStt));

    let err = failing.synthesize(text).await.unwrap_err();
    assert!(matches!(err, SpeechmarkError::Transcription { .. }));
    let handle = failing.locate(text);
    assert!(handle.has_audio());
    assert!(!handle.has_transcript());

    let stt_calls = Arc::new(AtomicUsize::new(0));
    let retry = SpeechPipeline::new(&SpeechConfig::with_cache_root(temp_dir.path()))
        .with_synthesis(Synthesis::adapter(FakeTts {
            calls: Arc::clone(&tts_calls),
            seconds: 2.0,
        }))
        .with_transcription(Transcription::adapter(FakeStt {
            calls: Arc::clone(&stt_calls),
        }));
    let result = retry.synthesize(text).await.unwrap().ready().unwrap();

    assert_eq!(result.bookmark("a"), Some(1.0));
    assert_eq!(tts_calls.load(Ordering::SeqCst), 1);
    assert_eq!(stt_calls.load(Ordering::SeqCst), 1);
    assert!(handle.has_transcript());
}
