use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;
use tracing::{error, info, warn};

use vaani::http::API_KEY_ENV;
use vaani::{
    create_router, AppState, AudioBackendConfig, AudioBackendFactory, AudioClip, AudioSource,
    Config, GroqClient, RecorderConfig, RecorderSession, RecorderStatus, RelayClient,
    SystemClipboard, TranscriptPanel, Translate,
};

#[derive(Parser)]
#[command(name = "vaani", about = "Speech-to-text translation relay and recorder")]
struct Cli {
    /// Path to the configuration file, without extension
    #[arg(long, global = true, default_value = "config/vaani")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the relay endpoint
    Serve,
    /// Record from the microphone and translate interactively
    Record {
        /// Call the speech service directly instead of going through the relay
        #[arg(long)]
        direct: bool,
    },
    /// Translate an existing audio file
    Translate {
        /// Audio file to submit (wav/mp3/m4a/webm/ogg/flac)
        file: PathBuf,

        /// Call the speech service directly instead of going through the relay
        #[arg(long)]
        direct: bool,

        /// Copy the result to the clipboard
        #[arg(long)]
        copy: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    match cli.command {
        Command::Serve => serve(cfg).await,
        Command::Record { direct } => record(cfg, direct).await,
        Command::Translate { file, direct, copy } => translate_file(cfg, &file, direct, copy).await,
    }
}

async fn serve(cfg: Config) -> Result<()> {
    info!("{} relay starting", cfg.service.name);

    if credential_present() {
        info!("Upstream credential found in environment");
    } else {
        warn!(
            "{} is not set; translate requests will be rejected until it is",
            API_KEY_ENV
        );
    }

    let groq = GroqClient::new(cfg.upstream.url.clone(), cfg.upstream.model.clone());
    let router = create_router(AppState::new(groq));

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Listening on {}", addr);

    axum::serve(listener, router).await?;

    Ok(())
}

async fn record(cfg: Config, direct: bool) -> Result<()> {
    let translator = build_translator(&cfg, direct);

    let backend = AudioBackendFactory::create(
        AudioSource::Microphone,
        AudioBackendConfig {
            target_sample_rate: cfg.audio.sample_rate,
            target_channels: cfg.audio.channels,
            ..Default::default()
        },
    )?;

    let session = RecorderSession::new(
        RecorderConfig {
            sample_rate: cfg.audio.sample_rate,
            channels: cfg.audio.channels,
            ..Default::default()
        },
        backend,
        translator,
    );

    let mut panel = TranscriptPanel::new(Arc::new(SystemClipboard));

    println!("Enter = start/stop recording, c = copy, x = clear, q = quit.");
    println!("Any other input replaces the transcript text.");

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        prompt(&session, &panel);

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match line.trim() {
            "" => match session.status() {
                RecorderStatus::Idle => {
                    if let Err(e) = session.start().await {
                        error!("{:#}", e);
                    }
                }
                RecorderStatus::Recording => match session.stop().await {
                    Ok(Some(translation)) => {
                        panel.set_text(translation.text);
                        println!("--- translation ---");
                        println!("{}", panel.text());
                    }
                    Ok(None) => {}
                    Err(e) => error!("{:#}", e),
                },
                // The toggle is gated while an upload settles
                RecorderStatus::Processing => {}
            },
            "c" => {
                if let Err(e) = panel.copy() {
                    error!("{:#}", e);
                }
            }
            "x" => {
                panel.clear();
            }
            "q" => break,
            edited => panel.set_text(edited),
        }
    }

    Ok(())
}

fn prompt(session: &RecorderSession, panel: &TranscriptPanel) {
    let label = match session.status() {
        RecorderStatus::Idle if panel.is_copied() => "[copied] > ",
        RecorderStatus::Idle => "> ",
        RecorderStatus::Recording => "recording > ",
        RecorderStatus::Processing => "translating... ",
    };

    print!("{}", label);
    let _ = std::io::Write::flush(&mut std::io::stdout());
}

async fn translate_file(cfg: Config, file: &Path, direct: bool, copy: bool) -> Result<()> {
    let translator = build_translator(&cfg, direct);

    let clip = AudioClip::from_file(file)?;
    info!("Submitting {} ({} bytes)", clip.file_name(), clip.len());

    let translation = translator.translate(clip).await?;
    println!("{}", translation.text);

    if copy {
        let mut panel = TranscriptPanel::new(Arc::new(SystemClipboard));
        panel.set_text(translation.text);
        panel.copy()?;
        info!("Copied translation to clipboard");
    }

    Ok(())
}

fn build_translator(cfg: &Config, direct: bool) -> Arc<dyn Translate> {
    if direct {
        let mut groq = GroqClient::new(cfg.upstream.url.clone(), cfg.upstream.model.clone());
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            groq = groq.with_api_key(key);
        }
        Arc::new(groq)
    } else {
        Arc::new(RelayClient::new(cfg.relay.url.clone()))
    }
}

fn credential_present() -> bool {
    std::env::var(API_KEY_ENV)
        .map(|key| !key.trim().is_empty())
        .unwrap_or(false)
}
