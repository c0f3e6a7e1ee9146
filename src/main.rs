use amora_live::app::{build_controller, build_state, DeviceOverrides};
use amora_live::dating::find_profile;
use amora_live::session::{CallPhase, LiveError};
use amora_live::{create_router, Config};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "amora-live", version, about = "Dating app back end with live voice calls")]
struct Cli {
    /// Configuration file (extension optional)
    #[arg(long, short, default_value = "config/amora")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API
    Serve,
    /// Call a profile from the terminal
    Call {
        /// Profile id to call
        #[arg(long)]
        profile: String,
        /// Stream this WAV file instead of the microphone
        #[arg(long)]
        input: Option<PathBuf>,
        /// Render the remote voice to this WAV file
        #[arg(long)]
        record: Option<PathBuf>,
        /// Hang up after this many seconds
        #[arg(long)]
        seconds: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Serve => serve(cfg).await,
        Command::Call {
            profile,
            input,
            record,
            seconds,
        } => {
            call(
                cfg,
                &profile,
                DeviceOverrides {
                    input_file: input,
                    record_path: record,
                },
                seconds.map(Duration::from_secs),
            )
            .await
        }
    }
}

async fn serve(cfg: Config) -> Result<()> {
    let state = build_state(&cfg).await?;
    let app = create_router(state);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("HTTP API listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn call(
    cfg: Config,
    profile_id: &str,
    overrides: DeviceOverrides,
    limit: Option<Duration>,
) -> Result<()> {
    let profile = find_profile(profile_id)
        .ok_or_else(|| LiveError::ProfileNotFound(profile_id.to_string()))?;

    let controller = build_controller(&cfg, overrides).await?;
    let mut phases = controller.subscribe();

    let session_id = controller.start_call(&profile).await?;
    info!("On a call with {} (session {}); Ctrl-C to hang up", profile.name, session_id);

    let remote_closed = phases.wait_for(|phase| *phase == CallPhase::Idle);
    let time_up = async {
        match limit {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Hanging up"),
        _ = time_up => info!("Time limit reached, hanging up"),
        _ = remote_closed => info!("{} hung up", profile.name),
    }

    let transcript = controller.transcript().await;
    let stats = match controller.end_call().await {
        Ok(stats) => Some(stats),
        Err(LiveError::NotActive) => controller.last_stats().await,
        Err(e) => return Err(e.into()),
    };

    for line in transcript {
        info!("{:?}: {}", line.speaker, line.text);
    }
    if let Some(stats) = stats {
        info!(
            "Call lasted {:.1}s: {} frames sent, {} muted, {} chunks played, {} interruptions",
            stats.duration_secs,
            stats.frames_sent,
            stats.frames_muted,
            stats.chunks_scheduled,
            stats.interruptions
        );
    }

    Ok(())
}
