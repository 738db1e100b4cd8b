use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use toroid_snake::clock::{Clock, ManualClock, SystemClock};
use toroid_snake::config::{ConfigOverrides, GameConfig};
use toroid_snake::constants::MAX_EFFECT_NODES;
use toroid_snake::control::Command;
use toroid_snake::engine::effect_system::calculate_game_speed;
use toroid_snake::engine::TickEngine;
use toroid_snake::high_score_store::{HighScoreStore, JsonHighScoreStore};
use toroid_snake::rng::Rng;
use toroid_snake::session::GameSession;
use toroid_snake::types::{GameState, GridSize, TickEvent};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Runs seeded autonomous games headlessly and prints one JSON result line
/// per game.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    seed: Option<u32>,
    #[arg(long, default_value_t = 5)]
    games: u32,
    #[arg(long)]
    width: Option<i32>,
    #[arg(long)]
    height: Option<i32>,
    #[arg(long, default_value_t = 20_000)]
    max_ticks: u64,
    #[arg(long)]
    high_score_path: Option<PathBuf>,
    #[arg(long)]
    run_id: Option<String>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
enum EndReason {
    Collision,
    TickLimit,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
struct EventCounts {
    #[serde(rename = "foodEaten")]
    food_eaten: u32,
    #[serde(rename = "foodExpired")]
    food_expired: u32,
    #[serde(rename = "effectsApplied")]
    effects_applied: u32,
    #[serde(rename = "shardBursts")]
    shard_bursts: u32,
    #[serde(rename = "obstaclesSpawned")]
    obstacles_spawned: u32,
    #[serde(rename = "obstaclesShattered")]
    obstacles_shattered: u32,
    #[serde(rename = "effectNodesSpawned")]
    effect_nodes_spawned: u32,
    #[serde(rename = "placementExhausted")]
    placement_exhausted: u32,
}

impl EventCounts {
    fn record(&mut self, event: &TickEvent) {
        match event {
            TickEvent::FoodEaten { .. } => self.food_eaten += 1,
            TickEvent::FoodExpired { .. } => self.food_expired += 1,
            TickEvent::EffectApplied { .. } => self.effects_applied += 1,
            TickEvent::ShardBurst { .. } => self.shard_bursts += 1,
            TickEvent::ObstacleSpawned { .. } => self.obstacles_spawned += 1,
            TickEvent::ObstaclesShattered { obstacle_ids } => {
                self.obstacles_shattered += obstacle_ids.len() as u32
            }
            TickEvent::EffectNodeSpawned { .. } => self.effect_nodes_spawned += 1,
            TickEvent::PlacementExhausted { .. } => self.placement_exhausted += 1,
            TickEvent::GameOver { .. } => {}
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
struct GameResultLine {
    game: u32,
    seed: u32,
    reason: EndReason,
    score: u32,
    #[serde(rename = "highScore")]
    high_score: u32,
    ticks: u64,
    length: usize,
    #[serde(rename = "durationMs")]
    duration_ms: u64,
    #[serde(flatten)]
    events: EventCounts,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "runId")]
    run_id: String,
    #[serde(rename = "startedAtMs")]
    started_at_ms: u64,
    #[serde(rename = "finishedAtMs")]
    finished_at_ms: u64,
    #[serde(rename = "gameCount")]
    game_count: usize,
    #[serde(rename = "bestScore")]
    best_score: u32,
    #[serde(rename = "averageScore")]
    average_score: f64,
    #[serde(rename = "averageTicks")]
    average_ticks: u64,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(rename = "reasonCounts")]
    reason_counts: BTreeMap<EndReason, usize>,
    games: Vec<GameResultLine>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .json()
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
    let grid = config.grid();
    let base_seed = config.seed.unwrap_or_else(rand::random);
    let run_started_at_ms = SystemClock.now_ms();
    let run_id = cli
        .run_id
        .clone()
        .unwrap_or_else(|| default_run_id(base_seed, run_started_at_ms));

    let mut results = Vec::new();
    for game in 0..cli.games {
        let seed = base_seed.wrapping_add(game);
        info!(
            event = "game_started",
            run_id = %run_id,
            game,
            seed,
            width = grid.width(),
            height = grid.height()
        );
        let store = JsonHighScoreStore::new(config.high_score_path.clone());
        let result = run_game(game, seed, grid, config.base_speed_ms, cli.max_ticks, store);

        for anomaly in &result.anomalies {
            warn!(event = "anomaly_detected", run_id = %run_id, seed, message = %anomaly);
        }
        info!(
            event = "game_finished",
            run_id = %run_id,
            game,
            seed,
            tick = result.ticks,
            score = result.score,
            reason = ?result.reason
        );
        println!("{}", serde_json::to_string(&result)?);
        results.push(result);
    }

    let summary = build_run_summary(run_id.clone(), run_started_at_ms, SystemClock.now_ms(), results);
    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(err) = write_summary(path, &summary) {
            error!(event = "summary_write_failed", run_id = %run_id, error = %err);
            std::process::exit(2);
        }
    }

    info!(
        event = "run_finished",
        run_id = %run_id,
        games = summary.game_count,
        best_score = summary.best_score,
        average_score = summary.average_score,
        anomalies = summary.anomaly_count
    );

    if summary.anomaly_count > 0 {
        std::process::exit(1);
    }
    Ok(())
}

/// Plays one autonomous game on a logical clock that advances by the
/// current tick interval.
fn run_game<S: HighScoreStore>(
    game: u32,
    seed: u32,
    grid: GridSize,
    base_speed_ms: f64,
    max_ticks: u64,
    store: S,
) -> GameResultLine {
    let clock = ManualClock::new(0);
    let engine = TickEngine::new(Rng::new(seed), store, base_speed_ms);
    let mut session = GameSession::new(engine, clock.clone(), grid, true);
    session.apply_command(Command::Start);

    let mut counts = EventCounts::default();
    let mut anomalies: Vec<String> = Vec::new();
    let mut ticks = 0u64;
    let reason = loop {
        if ticks >= max_ticks {
            break EndReason::TickLimit;
        }
        clock.advance(session.state().game_speed_ms.round().max(1.0) as u64);
        let Some(events) = session.step() else {
            break EndReason::Collision;
        };
        ticks += 1;
        for event in &events {
            counts.record(event);
        }
        for message in collect_state_anomalies(session.state(), grid, base_speed_ms) {
            if !anomalies.contains(&message) {
                anomalies.push(message);
            }
        }
        if session.state().game_over {
            break EndReason::Collision;
        }
    };

    let state = session.state();
    GameResultLine {
        game,
        seed,
        reason,
        score: state.score,
        high_score: state.high_score.max(state.score),
        ticks,
        length: state.snake.len(),
        duration_ms: clock.now_ms(),
        events: counts,
        anomalies,
    }
}

fn collect_state_anomalies(state: &GameState, grid: GridSize, base_speed_ms: f64) -> Vec<String> {
    let mut anomalies = Vec::new();
    if let Some(pos) = state.snake.iter().find(|pos| !grid.contains(**pos)) {
        anomalies.push(format!("snake cell outside grid: ({},{})", pos.x, pos.y));
    }
    if let Some(food) = &state.food {
        if !grid.contains(food.position) || state.snake.contains(&food.position) {
            anomalies.push(format!(
                "food on invalid cell: ({},{})",
                food.position.x, food.position.y
            ));
        }
    }
    if state.effect_nodes.len() > MAX_EFFECT_NODES {
        anomalies.push(format!("too many effect nodes: {}", state.effect_nodes.len()));
    }
    let expected = calculate_game_speed(base_speed_ms, &state.active_effects);
    if (expected - state.game_speed_ms).abs() > f64::EPSILON {
        anomalies.push(format!(
            "game speed drift: {} != {}",
            state.game_speed_ms, expected
        ));
    }
    anomalies
}

fn default_run_id(seed: u32, timestamp_ms: u64) -> String {
    format!("sim-{seed}-{timestamp_ms}")
}

fn build_run_summary(
    run_id: String,
    started_at_ms: u64,
    finished_at_ms: u64,
    games: Vec<GameResultLine>,
) -> RunSummary {
    let game_count = games.len();
    let mut reason_counts = BTreeMap::new();
    for result in &games {
        *reason_counts.entry(result.reason).or_insert(0) += 1;
    }
    let total_score: u64 = games.iter().map(|result| result.score as u64).sum();
    let total_ticks: u64 = games.iter().map(|result| result.ticks).sum();
    let (average_score, average_ticks) = if game_count == 0 {
        (0.0, 0)
    } else {
        (
            total_score as f64 / game_count as f64,
            total_ticks / game_count as u64,
        )
    };
    RunSummary {
        run_id,
        started_at_ms,
        finished_at_ms,
        game_count,
        best_score: games.iter().map(|result| result.score).max().unwrap_or(0),
        average_score,
        average_ticks,
        anomaly_count: games.iter().map(|result| result.anomalies.len()).sum(),
        reason_counts,
        games,
    }
}

fn write_summary(path: &Path, summary: &RunSummary) -> Result<()> {
    let text = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, text)
        .with_context(|| format!("failed to write summary to {}", path.display()))
}
