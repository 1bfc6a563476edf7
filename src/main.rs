//! Novel Ingest CLI
//!
//! Ingests EPUB files, creates and cancels translation jobs, and runs the
//! outbox relay that hands job messages to the queue.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::signal;

use novel_ingest::config::Config;
use novel_ingest::db::{self, UnitOfWork};
use novel_ingest::ingest::IngestService;
use novel_ingest::jobs::JobService;
use novel_ingest::logging;
use novel_ingest::media::S3MediaUploader;
use novel_ingest::queue::{NatsJobPublisher, OutboxRelay};

#[derive(Parser)]
#[command(name = "novel-ingest", version, about = "EPUB ingestion and translation job queueing")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest an EPUB file
    Ingest {
        #[arg(long)]
        file: PathBuf,
        /// User recorded as the novel's creator
        #[arg(long)]
        user: String,
    },
    /// Create a translation job for a novel
    Translate {
        #[arg(long)]
        novel: String,
        #[arg(long)]
        lang: String,
        #[arg(long)]
        user: String,
    },
    /// Cancel a translation job
    Cancel {
        #[arg(long)]
        job: String,
    },
    /// Deliver queued job messages until interrupted
    Relay,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("Failed to load configuration from environment")?;
    logging::init(&config.logging);

    let cli = Cli::parse();

    let pool = db::create_pool(&config.database)
        .await
        .context("Failed to initialize database")?;
    tracing::debug!("Database initialized at {}", config.database.url);
    let uow = UnitOfWork::new(pool.clone());

    match cli.command {
        Command::Ingest { file, user } => {
            let data = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;

            let mut service = IngestService::new(uow);
            if let Some(storage) = &config.storage {
                let uploader = S3MediaUploader::new(storage)
                    .await
                    .context("Failed to initialize S3 client")?;
                service = service.with_uploader(Arc::new(uploader));
            } else {
                tracing::warn!("No media storage configured, covers will be skipped");
            }

            let summary = service.ingest(&data, &user).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Translate { novel, lang, user } => {
            let mut service = JobService::new(uow, &config.queue.subject)
                .with_code_filter(config.jobs.enable_code_filter);
            match &config.queue.nats_url {
                Some(url) => {
                    let publisher = NatsJobPublisher::connect(url).await?;
                    service = service.with_relay(OutboxRelay::new(pool, Arc::new(publisher), config.relay.clone()));
                }
                None => tracing::warn!("NATS_URL not set, the job message stays in the outbox for the relay"),
            }

            let job = service.create_job(&novel, &lang, &user).await?;
            println!("{}", serde_json::to_string_pretty(&job)?);
        }
        Command::Cancel { job } => {
            let service = JobService::new(uow, &config.queue.subject);

            let job = service.cancel_job(&job).await?;
            println!("{}", serde_json::to_string_pretty(&job)?);
        }
        Command::Relay => {
            let url = config
                .queue
                .nats_url
                .as_deref()
                .context("NATS_URL must be set to run the relay")?;
            let publisher = NatsJobPublisher::connect(url).await?;
            let relay = OutboxRelay::new(pool, Arc::new(publisher), config.relay.clone());
            relay
                .run(async {
                    let signal = shutdown_signal().await;
                    tracing::info!(signal, "Stopping relay after the current batch");
                })
                .await;
            tracing::info!("Relay shutdown complete");
        }
    }

    Ok(())
}

/// Resolves with the name of the first termination signal received.
///
/// A handler that cannot be installed never fires, so the other one still
/// stops the relay.
async fn shutdown_signal() -> &'static str {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => "SIGINT",
            Err(e) => {
                tracing::error!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending().await
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                "SIGTERM"
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<&'static str>();

    tokio::select! {
        signal = ctrl_c => signal,
        signal = terminate => signal,
    }
}
