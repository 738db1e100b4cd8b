use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::ai::Autopilot;
use crate::clock::Clock;
use crate::control::{Command, ControlSource};
use crate::engine::TickEngine;
use crate::high_score_store::HighScoreStore;
use crate::rng::{RandomSource, Rng};
use crate::types::{Direction, GameState, GridSize, TickEvent};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Snapshot {
    pub grid: GridSize,
    #[serde(flatten)]
    pub state: GameState,
}

pub struct GameSession<S, C, R = Rng> {
    engine: TickEngine<S, R>,
    clock: C,
    autopilot: Autopilot,
    grid: GridSize,
    state: GameState,
    control: ControlSource,
    pending_turn: Option<Direction>,
    debug: bool,
}

impl<S: HighScoreStore, C: Clock, R: RandomSource> GameSession<S, C, R> {
    pub fn new(mut engine: TickEngine<S, R>, clock: C, grid: GridSize, autonomous: bool) -> Self {
        let state = engine.new_game(grid, clock.now_ms(), autonomous);
        Self {
            engine,
            clock,
            autopilot: Autopilot::new(grid),
            grid,
            state,
            control: ControlSource::from_autonomous(autonomous),
            pending_turn: None,
            debug: false,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn grid(&self) -> GridSize {
        self.grid
    }

    pub fn control(&self) -> ControlSource {
        self.control
    }

    pub fn debug_enabled(&self) -> bool {
        self.debug
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            grid: self.grid,
            state: self.state.clone(),
        }
    }

    pub fn engine(&self) -> &TickEngine<S, R> {
        &self.engine
    }

    pub fn autopilot(&self) -> &Autopilot {
        &self.autopilot
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_micros((self.state.game_speed_ms.max(1.0) * 1000.0).round() as u64)
    }

    /// Returns whether the visible state changed.
    pub fn apply_command(&mut self, command: Command) -> bool {
        match command {
            Command::Turn(dir) => {
                if self.state.game_over {
                    return false;
                }
                let was_started = self.state.started;
                self.state.started = true;
                if self.control.is_autonomous() || !self.state.direction.accepts_turn(dir) {
                    return !was_started;
                }
                self.pending_turn = Some(dir);
                true
            }
            Command::Start => {
                if self.state.started || self.state.game_over {
                    return false;
                }
                self.state.started = true;
                true
            }
            Command::Restart => {
                let now = self.clock.now_ms();
                self.state = self
                    .engine
                    .new_game(self.grid, now, self.control.is_autonomous());
                self.pending_turn = None;
                info!(high_score = self.state.high_score, "game restarted");
                true
            }
            Command::ToggleDebug => {
                self.debug = !self.debug;
                debug!(enabled = self.debug, "debug toggled");
                false
            }
            Command::ToggleAutonomous => {
                self.control = self.control.toggled();
                self.state.autonomous = self.control.is_autonomous();
                self.pending_turn = None;
                info!(autonomous = self.state.autonomous, "control source switched");
                true
            }
            Command::Resize(grid) => {
                self.grid = grid;
                self.autopilot.update_grid(grid);
                debug!(width = grid.width(), height = grid.height(), "grid resized");
                true
            }
        }
    }

    pub fn step(&mut self) -> Option<Vec<TickEvent>> {
        if !self.state.started || self.state.game_over {
            return None;
        }
        let now = self.clock.now_ms();
        let intent = match self.control {
            ControlSource::Autonomous => {
                if self.debug {
                    debug!(decision = %self.autopilot.explain(&self.state, now), "autopilot");
                }
                self.autopilot.choose_direction(&self.state, now)
            }
            ControlSource::Human => self.pending_turn.take().unwrap_or(self.state.direction),
        };
        self.state = self.engine.tick(&self.state, intent, self.grid, now);
        let events = self.engine.drain_events();
        for event in &events {
            debug!(?event, "tick event");
        }
        Some(events)
    }
}

/// Runs until the command channel closes or the snapshot receiver drops.
pub async fn run_session<S, C, R>(
    mut session: GameSession<S, C, R>,
    mut commands: mpsc::Receiver<Command>,
    snapshots: mpsc::Sender<Snapshot>,
) -> GameSession<S, C, R>
where
    S: HighScoreStore,
    C: Clock,
    R: RandomSource,
{
    if snapshots.send(session.snapshot()).await.is_err() {
        return session;
    }
    let timer = tokio::time::sleep(session.tick_interval());
    tokio::pin!(timer);

    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else {
                    break;
                };
                if session.apply_command(command)
                    && snapshots.send(session.snapshot()).await.is_err()
                {
                    break;
                }
            }
            () = &mut timer => {
                let ticked = session.step().is_some();
                timer.as_mut().reset(Instant::now() + session.tick_interval());
                if ticked && snapshots.send(session.snapshot()).await.is_err() {
                    break;
                }
            }
        }
    }
    session
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::high_score_store::MemoryHighScoreStore;
    use crate::types::{Food, Position};

    fn session(autonomous: bool) -> GameSession<MemoryHighScoreStore, ManualClock> {
        let engine = TickEngine::new(Rng::new(9), MemoryHighScoreStore::new(40), 75.0);
        GameSession::new(engine, ManualClock::new(0), GridSize::new(20, 20), autonomous)
    }

    #[test]
    fn nothing_moves_before_start() {
        let mut s = session(false);
        assert!(s.step().is_none());
        assert_eq!(s.state().snake, vec![Position::new(10, 10)]);
        assert_eq!(s.state().high_score, 40);
    }

    #[test]
    fn start_without_heading_does_not_move() {
        let mut s = session(false);
        assert!(s.apply_command(Command::Start));
        assert!(s.step().is_some());
        assert_eq!(s.state().snake, vec![Position::new(10, 10)]);
    }

    #[test]
    fn turn_starts_the_run_and_steers() {
        let mut s = session(false);
        assert!(s.apply_command(Command::Turn(Direction::Up)));
        s.step();
        assert!(s.state().started);
        assert_eq!(s.state().head(), Position::new(10, 9));
        assert_eq!(s.state().direction, Direction::Up);
    }

    #[test]
    fn reversal_input_is_ignored() {
        let mut s = session(false);
        s.apply_command(Command::Turn(Direction::Right));
        s.step();
        assert!(!s.apply_command(Command::Turn(Direction::Left)));
        s.step();
        assert_eq!(s.state().direction, Direction::Right);
        assert_eq!(s.state().head(), Position::new(12, 10));
    }

    #[test]
    fn turns_are_checked_against_the_last_moved_heading() {
        let mut s = session(false);
        s.apply_command(Command::Turn(Direction::Right));
        s.step();
        // Left reverses the heading last travelled
        assert!(s.apply_command(Command::Turn(Direction::Up)));
        assert!(!s.apply_command(Command::Turn(Direction::Left)));
        s.step();
        assert_eq!(s.state().direction, Direction::Up);
    }

    #[test]
    fn restart_preserves_autonomous_flag_and_reloads_high_score() {
        let mut s = session(false);
        s.apply_command(Command::ToggleAutonomous);
        s.apply_command(Command::Start);
        s.step();
        s.apply_command(Command::Restart);
        assert!(s.state().autonomous);
        assert!(!s.state().started);
        assert_eq!(s.state().score, 0);
        assert_eq!(s.state().high_score, 40);
        assert!(s.state().obstacles.is_empty());
        assert!(s.state().food.is_some());
    }

    #[test]
    fn toggles_do_not_touch_game_fields() {
        let mut s = session(false);
        let before = s.state().clone();
        assert!(!s.apply_command(Command::ToggleDebug));
        assert!(s.debug_enabled());
        assert_eq!(s.state(), &before);
        s.apply_command(Command::ToggleAutonomous);
        assert_eq!(s.control(), ControlSource::Autonomous);
        assert_eq!(s.state().snake, before.snake);
        assert_eq!(s.state().score, before.score);
    }

    #[test]
    fn autopilot_steers_autonomous_runs() {
        let mut s = session(true);
        s.state.food = Some(Food {
            id: "food_x".to_string(),
            position: Position::new(13, 10),
            created_at: 0,
            duration_ms: 9_000,
        });
        s.apply_command(Command::Start);
        s.step();
        assert_eq!(s.state().head(), Position::new(11, 10));
        assert_eq!(s.state().direction, Direction::Right);
    }

    #[test]
    fn human_turns_are_ignored_while_autonomous() {
        let mut s = session(true);
        s.apply_command(Command::Turn(Direction::Up));
        assert!(s.state().started);
        assert!(s.pending_turn.is_none());
    }

    #[test]
    fn resize_moves_wrap_edge() {
        let mut s = session(false);
        s.apply_command(Command::Resize(GridSize::new(11, 11)));
        assert_eq!(s.autopilot().grid(), GridSize::new(11, 11));
        s.state.food = None;
        s.apply_command(Command::Turn(Direction::Right));
        s.step();
        assert_eq!(s.state().head(), Position::new(0, 10));
    }

    #[test]
    fn tick_interval_tracks_game_speed() {
        let mut s = session(false);
        assert_eq!(s.tick_interval(), Duration::from_millis(75));
        s.state.game_speed_ms = 37.5;
        assert_eq!(s.tick_interval(), Duration::from_micros(37_500));
    }

    #[tokio::test]
    async fn run_session_ticks_until_commands_close() {
        let engine = TickEngine::new(Rng::new(1), MemoryHighScoreStore::new(0), 5.0);
        let clock = ManualClock::new(0);
        let session = GameSession::new(engine, clock, GridSize::new(30, 30), false);
        let (command_tx, command_rx) = mpsc::channel(8);
        let (snapshot_tx, mut snapshot_rx) = mpsc::channel(64);
        let driver = tokio::spawn(run_session(session, command_rx, snapshot_tx));

        let initial = snapshot_rx.recv().await.expect("initial snapshot");
        assert_eq!(initial.grid, GridSize::new(30, 30));
        let initial = initial.state;
        assert!(!initial.started);
        command_tx
            .send(Command::Turn(Direction::Down))
            .await
            .expect("driver alive");

        let moved = tokio::time::timeout(Duration::from_secs(5), async {
            while let Some(snapshot) = snapshot_rx.recv().await {
                if snapshot.state.head() != initial.head() {
                    return Some(snapshot.state);
                }
            }
            None
        })
        .await
        .expect("tick within timeout")
        .expect("moved snapshot");
        assert_eq!(moved.direction, Direction::Down);

        drop(command_tx);
        let session = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if snapshot_rx.recv().await.is_none() {
                    break;
                }
            }
        });
        session.await.expect("snapshots close");
        let finished = driver.await.expect("driver joined");
        assert!(finished.state().started);
    }
}
