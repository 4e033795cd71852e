//! Application entry point for the voice translator.
//!
//! # Startup sequence
//!
//! 1. Load `.env.local` / `.env` into the environment.
//! 2. Parse the command line.
//! 3. Initialise logging (`debug` in dev mode, `info` otherwise).
//! 4. Load [`AppConfig`] and apply endpoint overrides from the environment.
//! 5. Read [`Credentials`]; a missing key aborts before any room is opened.
//! 6. Build the shared collaborators (translator, recognizer, synthesizer,
//!    audio sink) and the usage collector.
//! 7. Run one stdin room (`dev`) or the TCP room server (`start`) until EOF
//!    or Ctrl-C, then log the usage summary.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::BufReader;

use voice_translator::{
    cli::{Cli, Command},
    config::{AppConfig, Credentials},
    llm::{ApiTranslator, PromptBuilder},
    metrics::UsageCollector,
    pipeline::{Collaborators, SessionSettings},
    stt::CartesiaRecognizer,
    transport::{self, RoomFactory},
    tts::{CartesiaSynthesizer, FileSink},
};

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("cannot listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}

fn build_collaborators(
    config: &AppConfig,
    credentials: &Credentials,
    usage: &Arc<UsageCollector>,
) -> Collaborators {
    let prompts = PromptBuilder::new(
        &config.translation.source_language,
        &config.translation.target_language,
    );
    let translator = ApiTranslator::new(&config.llm, &credentials.llm_api_key, prompts)
        .with_usage(Arc::clone(usage));
    let recognizer = CartesiaRecognizer::new(&config.stt, &credentials.cartesia_api_key)
        .with_usage(Arc::clone(usage));
    let synthesizer = CartesiaSynthesizer::new(&config.tts, &credentials.cartesia_api_key)
        .with_usage(Arc::clone(usage));

    let output_dir = config.transport.resolved_output_dir();
    log::info!("synthesized speech is written under {}", output_dir.display());

    Collaborators {
        translator: Arc::new(translator),
        recognizer: Arc::new(recognizer),
        synthesizer: Arc::new(synthesizer),
        sink: Arc::new(FileSink::new(output_dir)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Environment
    dotenvy::from_filename(".env.local").ok();
    dotenvy::dotenv().ok();

    // 2. Command line
    let cli = Cli::parse();

    // 3. Logging
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(cli.command.default_log_filter()),
    )
    .init();
    log::info!("voice translator starting up");

    // 4. Configuration
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    }
    .context("loading settings")?;
    config.apply_env_overrides(|name| std::env::var(name).ok());

    // 5. Credentials (fatal when missing)
    let credentials = match Credentials::from_env() {
        Ok(credentials) => credentials,
        Err(e) => {
            log::error!("{e}");
            return Err(e.into());
        }
    };

    // 6. Collaborators
    let usage = Arc::new(UsageCollector::new());
    let factory = RoomFactory {
        collab: build_collaborators(&config, &credentials, &usage),
        settings: SessionSettings::from_config(&config),
        usage: Arc::clone(&usage),
    };
    log::info!(
        "translating {} -> {} with {} at {}",
        config.translation.source_language,
        config.translation.target_language,
        config.llm.model,
        config.llm.base_url
    );

    // 7. Rooms
    match cli.command {
        Command::Dev => {
            let mut room = factory.room("dev");
            let stdin = BufReader::new(tokio::io::stdin());
            room.run(stdin, ctrl_c()).await?;
        }
        Command::Start { listen } => {
            let addr = listen.unwrap_or_else(|| config.transport.listen_addr.clone());
            let listener = transport::bind(&addr).await?;
            transport::serve(listener, factory, ctrl_c()).await?;
        }
    }

    log::info!("usage: {}", usage.summary());
    Ok(())
}
