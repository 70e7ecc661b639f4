use std::{
    path::PathBuf,
    time::{Duration, Instant},
};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use speechmark_core::{
    ChatTranslator, OpenAiStt, OpenAiTts, Provider, SpeechConfig, SpeechOutcome, SpeechPipeline,
    Synthesis, Transcription, Translator, format_speech_readable,
    format_transcript_with_timestamps, strip,
};
use tracing_subscriber::EnvFilter;

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.0}m {:.0}s", secs / 60.0, secs % 60.0)
    }
}

#[derive(Clone, Default, ValueEnum)]
enum CliTts {
    #[default]
    Openai,
    /// Record the audio yourself
    None,
}

#[derive(Clone, Default, ValueEnum)]
enum CliStt {
    #[default]
    Openai,
    #[cfg(feature = "whisper")]
    Whisper,
    /// Skip transcription; bookmark times become rough
    None,
}

/// CLI wrapper for Provider enum (needed for clap ValueEnum)
#[derive(Clone, Default, ValueEnum)]
enum CliProvider {
    #[default]
    Grok,
    Openai,
    Gemini,
}

impl From<CliProvider> for Provider {
    fn from(cli: CliProvider) -> Self {
        match cli {
            CliProvider::Grok => Provider::Grok,
            CliProvider::Openai => Provider::Openai,
            CliProvider::Gemini => Provider::Gemini,
        }
    }
}

#[derive(Parser)]
#[command(name = "speechmark")]
#[command(about = "Narrate annotated text and find out when each bookmark is spoken")]
struct Cli {
    /// Cache directory (defaults to the user cache dir)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct SpeakArgs {
    /// Text with <bookmark mark='name'/> markers
    text: Option<String>,

    /// Read the text from a file instead
    #[arg(short, long, conflicts_with = "text")]
    file: Option<PathBuf>,

    /// Text-to-speech backend
    #[arg(long, default_value = "openai")]
    tts: CliTts,

    /// Speech-to-text backend
    #[arg(long, default_value = "openai")]
    stt: CliStt,

    /// Voice for the OpenAI backend
    #[arg(long, default_value = "alloy")]
    voice: String,

    /// Local whisper model; downloaded into the cache when omitted
    #[arg(long)]
    whisper_model: Option<PathBuf>,

    /// Print the word-level transcript too
    #[arg(long)]
    transcript: bool,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Synthesize narration and print bookmark timings
    Speak(SpeakArgs),

    /// Print text with bookmark markers removed
    Strip { text: String },

    /// Translate text, keeping bookmark markers in place
    Translate {
        text: String,

        #[arg(long)]
        from: String,

        #[arg(long)]
        to: String,

        /// AI provider for translation
        #[arg(short, long, default_value = "grok")]
        provider: CliProvider,

        /// Override the provider's default model
        #[arg(long)]
        model: Option<String>,
    },
}

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn transcription_for(
    stt: CliStt,
    config: &SpeechConfig,
    model: Option<PathBuf>,
) -> Result<Transcription> {
    let transcription = match stt {
        CliStt::Openai => Transcription::adapter(OpenAiStt::from_env()?),
        #[cfg(feature = "whisper")]
        CliStt::Whisper => {
            let model_path = match model {
                Some(path) => path,
                None => {
                    let spinner = create_spinner("Checking whisper model...");
                    let path = speechmark_core::ensure_model(&config.cache_root).await?;
                    spinner.finish_with_message(format!(
                        "{} Model ready",
                        style("✓").green().bold()
                    ));
                    path
                }
            };
            Transcription::adapter(speechmark_core::WhisperStt::new(model_path))
        }
        CliStt::None => Transcription::WholeClip,
    };
    #[cfg(not(feature = "whisper"))]
    let _ = (config, model);
    Ok(transcription)
}

/// Backends (and their API keys) are built only for stages the cache does
/// not already hold.
async fn pipeline_for(
    config: &SpeechConfig,
    raw: &str,
    tts: CliTts,
    stt: CliStt,
    voice: String,
    whisper_model: Option<PathBuf>,
) -> Result<SpeechPipeline> {
    let pipeline = SpeechPipeline::new(config);
    let cached = pipeline.locate(raw);

    let synthesis = match tts {
        _ if cached.has_audio() => Synthesis::Manual,
        CliTts::Openai => Synthesis::adapter(OpenAiTts::from_env()?.with_voice(voice)),
        CliTts::None => Synthesis::Manual,
    };
    let transcription = if cached.has_transcript() {
        Transcription::WholeClip
    } else {
        transcription_for(stt, config, whisper_model).await?
    };

    Ok(pipeline
        .with_synthesis(synthesis)
        .with_transcription(transcription))
}

async fn speak(config: SpeechConfig, args: SpeakArgs) -> Result<()> {
    let SpeakArgs {
        text,
        file,
        tts,
        stt,
        voice,
        whisper_model,
        transcript: show_transcript,
        json,
    } = args;

    let raw = match (text, file) {
        (Some(text), _) => text,
        (None, Some(path)) => tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))?,
        (None, None) => bail!("pass the text as an argument or with --file"),
    };

    let pipeline = pipeline_for(&config, &raw, tts, stt, voice, whisper_model).await?;

    let started = Instant::now();
    let spinner = create_spinner("Narrating...");
    let outcome = pipeline.synthesize(&raw).await;
    spinner.finish_and_clear();

    match outcome? {
        SpeechOutcome::Ready(result) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
                return Ok(());
            }

            println!(
                "{} Narrated {}",
                style("✓").green().bold(),
                style(format!("[{}]", format_duration(started.elapsed()))).dim()
            );
            println!("{}", style("─".repeat(60)).dim());
            println!("{}", format_speech_readable(&result));
            if show_transcript {
                println!("{}", format_transcript_with_timestamps(&result.transcript));
            }
        }
        SpeechOutcome::NeedsManualRecording { audio_path, text } => {
            println!(
                "{} Please record the following text and save it to {}",
                style("!").yellow().bold(),
                style(audio_path.display()).cyan()
            );
            println!("\n{}\n", style(text).green());
            println!("Run the same command again once the recording is in place.");
            std::process::exit(2);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = cli
        .cache_dir
        .map(SpeechConfig::with_cache_root)
        .unwrap_or_default();
    tracing::debug!(cache_root = %config.cache_root.display(), "using cache");

    match cli.command {
        Command::Speak(args) => speak(config, args).await,
        Command::Strip { text } => {
            println!("{}", strip(&text));
            Ok(())
        }
        Command::Translate {
            text,
            from,
            to,
            provider,
            model,
        } => {
            let translator = match ChatTranslator::from_env(provider.into()) {
                Ok(translator) => match model {
                    Some(model) => translator.with_model(model),
                    None => translator,
                },
                Err(e) => {
                    eprintln!("{} {}", style("Error:").red().bold(), e);
                    std::process::exit(1);
                }
            };
            let spinner = create_spinner(&format!("Translating with {}...", translator.name()));
            let translated = translator.translate(&text, &from, &to).await;
            spinner.finish_and_clear();
            println!("{}", translated?);
            Ok(())
        }
    }
}
