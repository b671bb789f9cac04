//! Castforge - Main entry point
//!
//! Exports one episode described by a project manifest: the merged
//! audio track (WAV, or MP3 when the lossy encoder is available) and a
//! synchronized MJPEG/PCM video, written into the output directory.

use std::path::PathBuf;

use anyhow::{Context, Result};
use castforge::config::ExportConfig;
use castforge::events::RenderEvent;
use castforge::video::RenderSession;
use castforge::{audio, encode, manifest};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for castforge
#[derive(Parser, Debug)]
#[command(name = "castforge")]
#[command(about = "Episode exporter for AI drama timelines")]
#[command(version)]
struct Args {
    /// Project manifest (JSON) describing cues and assets
    manifest: PathBuf,

    /// Directory receiving the exported assets
    #[arg(short, long, default_value = "export", env = "CASTFORGE_OUT_DIR")]
    out_dir: PathBuf,

    /// Optional TOML configuration file
    #[arg(short, long, env = "CASTFORGE_CONFIG")]
    config: Option<PathBuf>,

    /// Export merged audio only
    #[arg(long, conflicts_with = "video_only")]
    audio_only: bool,

    /// Export video only
    #[arg(long)]
    video_only: bool,

    /// Render as fast as possible instead of pacing on the wall clock
    #[arg(long)]
    no_realtime_pacing: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ExportConfig::load(path).context("Failed to load configuration")?,
        None => ExportConfig::default(),
    };
    if args.no_realtime_pacing {
        config.realtime_pacing = false;
    }

    // Initialize tracing; RUST_LOG wins over the config file level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("castforge={}", config.logging.level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting Castforge v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    if let Some(path) = &args.config {
        info!("Using configuration from {}", path.display());
    }

    let (timeline, cast, scenes) =
        manifest::load_project(&args.manifest).context("Failed to load project manifest")?;

    std::fs::create_dir_all(&args.out_dir).context("Failed to create output directory")?;

    if !args.video_only {
        let merged = audio::merge(&timeline, config.target_sample_rate, config.target_channels)
            .context("Failed to merge cue audio")?;
        let asset = encode::encode_with_fallback(&merged, &config);
        let path = args
            .out_dir
            .join(format!("episode.{}", asset.kind.extension()));
        std::fs::write(&path, &asset.bytes).context("Failed to write audio asset")?;
        info!(
            "Wrote {} ({} kB, {:.1}s, {})",
            path.display(),
            asset.bytes.len() / 1024,
            asset.duration.as_secs_f64(),
            asset.kind.mime()
        );
    }

    if !args.audio_only {
        let mut session = RenderSession::new(config.clone())?;

        // Ctrl+C cancels between cues; the partial container is discarded
        let cancel = session.cancel_handle();
        tokio::spawn(async move {
            shutdown_signal().await;
            warn!("Cancelling render");
            cancel.cancel();
        });

        let mut events = session.subscribe();
        tokio::spawn(async move {
            while let Ok(event) = events.recv().await {
                if let RenderEvent::CueStarted { index, .. } = event {
                    info!("Rendering cue {}", index);
                }
            }
        });

        let asset = session
            .render(&timeline, &cast, &scenes)
            .await
            .context("Video render failed")?;
        let path = args.out_dir.join("episode.avi");
        std::fs::write(&path, &asset.bytes).context("Failed to write video asset")?;
        info!(
            "Wrote {} ({} frames, {:.1}s)",
            path.display(),
            asset.frame_count,
            asset.duration().as_secs_f64()
        );
    }

    info!("Export complete");
    Ok(())
}

/// Cancellation signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, cancelling");
        },
        _ = terminate => {
            info!("Received terminate signal, cancelling");
        },
    }
}
