mod config;
use anyhow::Context;
use clap::{Parser, Subcommand};
use config::{Settings, load_snapshot, recovery_path, save_snapshot};
use std::path::{Path, PathBuf};
use tierfs_core::{Dispatcher, DuplexChannel, Tier, TierState, serve};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "tierfs")]
#[command(about = "Control process for one storage tier")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the tier protocol to a supervising process
    Serve {
        /// Path to settings file
        #[arg(short, long, default_value = "tierfs.yaml")]
        config: String,

        /// Tier to serve; optional when the settings define a single tier
        #[arg(short, long)]
        tier: Option<String>,

        /// JSON index snapshot loaded at STARTUP instead of scanning
        #[arg(long)]
        index: Option<PathBuf>,

        /// Accept the supervisor on this Unix socket instead of stdin/stdout
        #[arg(long)]
        socket: Option<PathBuf>,
    },
    /// Validate settings and print the selected tier's drives
    Check {
        #[arg(short, long, default_value = "tierfs.yaml")]
        config: String,

        #[arg(short, long)]
        tier: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout may carry the protocol
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tierfs=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            tier,
            index,
            socket,
        } => {
            tracing::info!("Starting tierfs with config: {}", config);
            let tier = build_tier(&config, tier.as_deref(), index.clone())?;
            let max_frame_bytes = tier.config().max_frame_bytes;
            let mut dispatcher = Dispatcher::new(tier)?;

            match socket {
                Some(path) => {
                    let listener = tokio::net::UnixListener::bind(&path)
                        .with_context(|| format!("failed to bind {}", path.display()))?;
                    tracing::info!("Waiting for supervisor on {}", path.display());
                    let (stream, _) = listener.accept().await?;
                    let (reader, writer) = stream.into_split();
                    let result = run(reader, writer, max_frame_bytes, &mut dispatcher).await;
                    if let Err(e) = std::fs::remove_file(&path) {
                        tracing::warn!("Failed to remove socket {}: {}", path.display(), e);
                    }
                    result?;
                }
                None => {
                    run(
                        tokio::io::stdin(),
                        tokio::io::stdout(),
                        max_frame_bytes,
                        &mut dispatcher,
                    )
                    .await?;
                }
            }

            finish(dispatcher.into_tier(), index.as_deref()).await?;
            Ok(())
        }
        Commands::Check { config, tier } => {
            let tier = build_tier(&config, tier.as_deref(), None)?;
            println!(
                "tier {} (number {}): {}",
                tier.config().name,
                tier.config().tier_number,
                tier.registry().list_names().join(", ")
            );
            Ok(())
        }
    }
}

fn build_tier(config: &str, name: Option<&str>, index: Option<PathBuf>) -> anyhow::Result<Tier> {
    let settings = Settings::from_file(config)
        .with_context(|| format!("failed to load settings from {}", config))?;
    let (tier_config, drives) = settings.select(name)?;

    let mut builder = Tier::builder().config(tier_config).drives(drives);
    if let Some(path) = index {
        let snapshot = load_snapshot(&path)
            .with_context(|| format!("failed to read index snapshot {}", path.display()))?;
        tracing::info!(
            "Loaded saved index {} with {} entries",
            path.display(),
            snapshot.len()
        );
        builder = builder.saved_index(snapshot);
    }

    Ok(builder.build()?)
}

async fn run<R, W>(
    reader: R,
    writer: W,
    max_frame_bytes: u32,
    dispatcher: &mut Dispatcher,
) -> anyhow::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut channel = DuplexChannel::new(reader, writer, max_frame_bytes);
    serve(&mut channel, dispatcher).await?;
    Ok(())
}

/// Release drives if the supervisor hung up without SHUTDOWN. The final index
/// is written beside `--index` when one was given.
async fn finish(mut tier: Tier, index: Option<&Path>) -> anyhow::Result<Option<PathBuf>> {
    if tier.state() != TierState::Running {
        return Ok(None);
    }

    tracing::warn!(
        "Channel closed while tier {} was running; shutting down",
        tier.config().name
    );
    let snapshot = tier.shutdown().await?;
    tracing::warn!(
        "Unrequested shutdown of tier {}: final index at revision {} with {} entries",
        tier.config().name,
        snapshot.revision,
        snapshot.len()
    );

    let Some(index) = index else {
        return Ok(None);
    };
    let path = recovery_path(index);
    save_snapshot(&path, &snapshot)
        .with_context(|| format!("failed to write final index to {}", path.display()))?;
    tracing::warn!("Final index written to {}", path.display());
    Ok(Some(path))
}
