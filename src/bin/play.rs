use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use toroid_snake::clock::SystemClock;
use toroid_snake::config::{ConfigOverrides, GameConfig};
use toroid_snake::control::{parse_command, Command};
use toroid_snake::engine::TickEngine;
use toroid_snake::high_score_store::JsonHighScoreStore;
use toroid_snake::rng::Rng;
use toroid_snake::session::{run_session, GameSession, Snapshot};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Plays a live game driven by commands on stdin; every state change is
/// written to stdout as one JSON line.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    seed: Option<u32>,
    #[arg(long)]
    width: Option<i32>,
    #[arg(long)]
    height: Option<i32>,
    #[arg(long)]
    high_score_path: Option<PathBuf>,
    /// Start with the autopilot in control.
    #[arg(long)]
    autonomous: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = GameConfig::resolve(
        cli.config.as_deref(),
        ConfigOverrides {
            seed: cli.seed,
            grid_width: cli.width,
            grid_height: cli.height,
            high_score_path: cli.high_score_path.clone(),
        },
    )?;

    let rng = match config.seed {
        Some(seed) => Rng::new(seed),
        None => Rng::from_entropy(),
    };
    let store = JsonHighScoreStore::new(config.high_score_path.clone());
    let engine = TickEngine::new(rng, store, config.base_speed_ms);
    let session = GameSession::new(engine, SystemClock, config.grid(), cli.autonomous);
    info!(
        width = config.grid_width,
        height = config.grid_height,
        autonomous = cli.autonomous,
        high_score_path = %config.high_score_path.display(),
        "session ready"
    );

    let (command_tx, command_rx) = mpsc::channel::<Command>(64);
    let (snapshot_tx, mut snapshot_rx) = mpsc::channel::<Snapshot>(256);
    let driver = tokio::spawn(run_session(session, command_rx, snapshot_tx));

    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(snapshot) = snapshot_rx.recv().await {
            let line = match serde_json::to_string(&snapshot) {
                Ok(line) => line,
                Err(error) => {
                    warn!(%error, "failed to encode snapshot");
                    continue;
                }
            };
            if stdout.write_all(line.as_bytes()).await.is_err()
                || stdout.write_all(b"\n").await.is_err()
                || stdout.flush().await.is_err()
            {
                break;
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match parse_command(&line) {
            Some(command) => {
                if command_tx.send(command).await.is_err() {
                    break;
                }
            }
            None => warn!(input = %line, "unrecognised command"),
        }
    }
    drop(command_tx);

    let session = driver.await?;
    writer.await?;
    info!(
        score = session.state().score,
        high_score = session.state().high_score,
        "session closed"
    );
    Ok(())
}
