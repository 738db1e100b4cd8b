use tracing::{debug, info, warn};

use crate::constants::{
    get_effect_node_spawn_interval_ms, get_obstacle_spawn_interval_ms, EFFECT_NODE_SPAWN_CHANCE,
    FOOD_POINTS, INITIAL_SNAKE_HEAD, MAX_EFFECT_NODES, OBSTACLE_SPAWN_CHANCE,
};
use crate::high_score_store::HighScoreStore;
use crate::rng::{RandomSource, Rng};
use crate::types::{Direction, EffectType, GameState, GridSize, TickEvent};

pub mod collision;
pub mod effect_system;
pub mod shard_system;
pub mod spawn_system;
pub(crate) mod utils;

use self::effect_system::{apply_effect, calculate_game_speed, expire_effects};
use self::shard_system::{advance_shards, burst_shards, shatter_obstacles};
use self::spawn_system::{place_effect_node, place_food, place_obstacle, pick_effect_type};

/// Applies one simulation step at a time. Holds the injected randomness and
/// the high score collaborator; the game itself lives in [`GameState`]
/// values passed in and returned.
pub struct TickEngine<S, R = Rng> {
    rng: R,
    high_scores: S,
    base_speed_ms: f64,
    events: Vec<TickEvent>,
}

impl<S: HighScoreStore, R: RandomSource> TickEngine<S, R> {
    pub fn new(rng: R, high_scores: S, base_speed_ms: f64) -> Self {
        Self {
            rng,
            high_scores,
            base_speed_ms,
            events: Vec::new(),
        }
    }

    pub fn base_speed_ms(&self) -> f64 {
        self.base_speed_ms
    }

    pub fn high_scores(&self) -> &S {
        &self.high_scores
    }

    pub fn drain_events(&mut self) -> Vec<TickEvent> {
        std::mem::take(&mut self.events)
    }

    /// Fresh run: one-cell snake, no heading, fresh food, stored high score.
    pub fn new_game(&mut self, grid: GridSize, now_ms: u64, autonomous: bool) -> GameState {
        let mut state = GameState {
            snake: vec![grid.wrap(INITIAL_SNAKE_HEAD.x, INITIAL_SNAKE_HEAD.y)],
            food: None,
            direction: Direction::None,
            game_over: false,
            started: false,
            score: 0,
            high_score: self.high_scores.get_high_score(),
            obstacles: Vec::new(),
            effect_nodes: Vec::new(),
            active_effects: Vec::new(),
            game_speed_ms: self.base_speed_ms,
            shards: Vec::new(),
            autonomous,
            last_effect_spawn_at: now_ms,
            next_id: 0,
        };
        state.food = place_food(&mut self.rng, &mut state, grid, now_ms);
        state
    }

    /// Advances `state` by one step toward `intent`. Returns the state
    /// unchanged when the run is over, not started, or has no heading.
    pub fn tick(
        &mut self,
        state: &GameState,
        intent: Direction,
        grid: GridSize,
        now_ms: u64,
    ) -> GameState {
        if state.game_over || !state.started || intent == Direction::None {
            return state.clone();
        }

        let new_head = grid.step(state.head(), intent);
        if collision::head_collides(new_head, &state.snake, &state.obstacles) {
            return self.finish_game(state);
        }

        let mut next = state.clone();
        next.direction = intent;
        next.snake.insert(0, new_head);

        let mut food = next.food.take();
        if let Some(expired) = food.as_ref().filter(|food| food.is_expired(now_ms)) {
            self.events.push(TickEvent::FoodExpired {
                food_id: expired.id.clone(),
            });
            food = None;
        }

        if food.as_ref().is_some_and(|food| food.position == new_head) {
            next.score += FOOD_POINTS;
            self.events.push(TickEvent::FoodEaten {
                at: new_head,
                score: next.score,
            });
            food = place_food(&mut self.rng, &mut next, grid, now_ms);
        } else {
            next.snake.pop();
        }
        next.food = food;

        self.consume_effect_node(&mut next, now_ms);

        if next.food.is_none() {
            next.food = place_food(&mut self.rng, &mut next, grid, now_ms);
        }

        expire_effects(&mut next.active_effects, now_ms);
        advance_shards(&mut next.shards, grid, now_ms);
        next.effect_nodes.retain(|node| node.is_alive(now_ms));
        next.obstacles.retain(|obstacle| obstacle.is_alive(now_ms));

        self.obstacle_spawn_trial(&mut next, state.score, grid, now_ms);
        self.effect_node_spawn_trial(&mut next, grid, now_ms);

        let destroyed = shatter_obstacles(&mut next.shards, &mut next.obstacles);
        if !destroyed.is_empty() {
            debug!(count = destroyed.len(), "shards destroyed obstacles");
            self.events.push(TickEvent::ObstaclesShattered {
                obstacle_ids: destroyed,
            });
        }

        next.game_speed_ms = calculate_game_speed(self.base_speed_ms, &next.active_effects);
        next
    }

    fn finish_game(&mut self, state: &GameState) -> GameState {
        let mut over = state.clone();
        over.game_over = true;
        over.high_score = state.score.max(state.high_score);
        if state.score > state.high_score {
            if let Err(error) = self.high_scores.set_high_score(state.score) {
                warn!(%error, score = state.score, "failed to persist high score");
            }
        }
        info!(score = over.score, high_score = over.high_score, "game over");
        self.events.push(TickEvent::GameOver {
            score: over.score,
            high_score: over.high_score,
        });
        over
    }

    fn consume_effect_node(&mut self, next: &mut GameState, now_ms: u64) {
        let head = next.head();
        let Some(idx) = next
            .effect_nodes
            .iter()
            .position(|node| node.position == head)
        else {
            return;
        };
        let node = next.effect_nodes.remove(idx);
        match node.effect_type {
            EffectType::ExplodingNode => {
                let burst = burst_shards(next, node.position, now_ms);
                self.events.push(TickEvent::ShardBurst {
                    at: node.position,
                    count: burst.len(),
                });
                next.shards.extend(burst);
            }
            effect_type => {
                let id = next.make_id("active");
                apply_effect(&mut next.active_effects, effect_type, id, now_ms);
                self.events.push(TickEvent::EffectApplied { effect_type });
            }
        }
        debug!(node_id = %node.id, effect_type = ?node.effect_type, "effect node consumed");
    }

    fn obstacle_spawn_trial(
        &mut self,
        next: &mut GameState,
        score: u32,
        grid: GridSize,
        now_ms: u64,
    ) {
        let interval = get_obstacle_spawn_interval_ms(score);
        let due = match next.obstacles.iter().map(|obstacle| obstacle.created_at).max() {
            Some(latest) => now_ms.saturating_sub(latest) > interval,
            None => true,
        };
        if !due || !self.rng.bool(OBSTACLE_SPAWN_CHANCE) {
            return;
        }
        match place_obstacle(&mut self.rng, next, grid, now_ms) {
            Ok(obstacle) => {
                self.events.push(TickEvent::ObstacleSpawned {
                    obstacle_id: obstacle.id.clone(),
                });
                next.obstacles.push(obstacle);
            }
            Err(error) => {
                debug!(%error, "skipping obstacle spawn");
                self.events.push(TickEvent::PlacementExhausted { entity: "obstacle" });
            }
        }
    }

    fn effect_node_spawn_trial(&mut self, next: &mut GameState, grid: GridSize, now_ms: u64) {
        let interval = get_effect_node_spawn_interval_ms(next.score);
        let due = next.effect_nodes.len() < MAX_EFFECT_NODES
            && now_ms.saturating_sub(next.last_effect_spawn_at) > interval;
        if !due || !self.rng.bool(EFFECT_NODE_SPAWN_CHANCE) {
            return;
        }
        let effect_type = pick_effect_type(&mut self.rng);
        match place_effect_node(&mut self.rng, next, grid, effect_type, now_ms) {
            Ok(node) => {
                self.events.push(TickEvent::EffectNodeSpawned {
                    node_id: node.id.clone(),
                    effect_type,
                });
                next.effect_nodes.push(node);
                next.last_effect_spawn_at = now_ms;
            }
            Err(error) => {
                debug!(%error, "skipping effect node spawn");
                self.events.push(TickEvent::PlacementExhausted {
                    entity: "effect_node",
                });
            }
        }
    }
}
