use crate::types::{EffectConfig, EffectType, Position};

pub const BASE_GAME_SPEED_MS: f64 = 75.0;
pub const DEFAULT_GRID_WIDTH: i32 = 40;
pub const DEFAULT_GRID_HEIGHT: i32 = 30;
pub const INITIAL_SNAKE_HEAD: Position = Position { x: 10, y: 10 };

pub const FOOD_POINTS: u32 = 10;
pub const FOOD_MIN_DURATION_MS: u64 = 5_000;
pub const FOOD_DURATION_SPREAD_MS: u64 = 5_000;

pub const OBSTACLE_MIN_DURATION_MS: u64 = 5_000;
pub const OBSTACLE_DURATION_SPREAD_MS: u64 = 5_000;
pub const OBSTACLE_SPAWN_CHANCE: f32 = 0.3;
pub const OBSTACLE_MIN_HEAD_DISTANCE: i32 = 5;

pub const EFFECT_NODE_MIN_DURATION_MS: u64 = 8_000;
pub const EFFECT_NODE_DURATION_SPREAD_MS: u64 = 7_000;
pub const EFFECT_NODE_SPAWN_CHANCE: f32 = 0.4;
pub const EFFECT_NODE_MIN_HEAD_DISTANCE: i32 = 3;
pub const MAX_EFFECT_NODES: usize = 2;

pub const MAX_PLACEMENT_ATTEMPTS: usize = 100;

pub const SHARD_SPEED: f32 = 0.5;
pub const SHARD_DURATION_MS: u64 = 3_000;
pub const SHARD_SIZE: f32 = 0.4;

/// Footprints an obstacle can take, as offsets from its anchor cell.
pub const OBSTACLE_SHAPES: [&[(i32, i32)]; 9] = [
    &[(0, 0), (1, 0), (2, 0)],
    &[(0, 0), (0, 1), (0, 2)],
    &[(0, 0), (1, 0), (0, 1)],
    &[(0, 0), (0, 1), (1, 1)],
    &[(1, 0), (0, 1), (1, 1), (2, 1)],
    &[(0, 0), (0, 1), (0, 2), (1, 1)],
    &[(0, 0), (1, 0), (0, 1), (1, 1)],
    &[(0, 0), (1, 0), (1, 1), (2, 1)],
    &[(1, 0), (2, 0), (0, 1), (1, 1)],
];

pub fn get_effect_config(effect_type: EffectType) -> EffectConfig {
    match effect_type {
        EffectType::SpeedBoost => EffectConfig {
            effect_type,
            duration_ms: 5_000,
            value: 2.0,
            stackable: false,
        },
        EffectType::ExplodingNode => EffectConfig {
            effect_type,
            duration_ms: 0,
            value: 12.0,
            stackable: false,
        },
    }
}

pub fn get_obstacle_spawn_interval_ms(score: u32) -> u64 {
    let reduction = (score as u64).saturating_mul(50);
    7_000u64.saturating_sub(reduction).max(3_000)
}

pub fn get_effect_node_spawn_interval_ms(score: u32) -> u64 {
    let reduction = (score as u64).saturating_mul(100).min(10_000);
    (15_000 - reduction).max(5_000)
}
