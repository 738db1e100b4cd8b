use tracing::debug;

use super::utils::{manhattan, occupied_cells};
use crate::constants::{
    get_effect_config, EFFECT_NODE_DURATION_SPREAD_MS, EFFECT_NODE_MIN_DURATION_MS,
    EFFECT_NODE_MIN_HEAD_DISTANCE, FOOD_DURATION_SPREAD_MS, FOOD_MIN_DURATION_MS,
    MAX_PLACEMENT_ATTEMPTS, OBSTACLE_DURATION_SPREAD_MS, OBSTACLE_MIN_DURATION_MS,
    OBSTACLE_MIN_HEAD_DISTANCE, OBSTACLE_SHAPES,
};
use crate::error::SpawnError;
use crate::rng::RandomSource;
use crate::types::{EffectNode, EffectType, Food, GameState, GridSize, Obstacle, Position};

/// Places food on a free cell, avoiding the body and obstacles. Draws until
/// a free cell turns up; returns `None` only when the grid has none.
pub fn place_food<R: RandomSource>(
    rng: &mut R,
    state: &mut GameState,
    grid: GridSize,
    now_ms: u64,
) -> Option<Food> {
    let blocked = occupied_cells(state, false);
    let blocked_in_grid = blocked.iter().filter(|pos| grid.contains(**pos)).count();
    if blocked_in_grid >= grid.cell_count() {
        debug!(
            width = grid.width(),
            height = grid.height(),
            "grid is full, no food placed"
        );
        return None;
    }

    let position = loop {
        let candidate = Position {
            x: rng.int(0, grid.width() - 1),
            y: rng.int(0, grid.height() - 1),
        };
        if !blocked.contains(&candidate) {
            break candidate;
        }
    };

    Some(Food {
        id: state.make_id("food"),
        position,
        created_at: now_ms,
        duration_ms: rng.duration_ms(FOOD_MIN_DURATION_MS, FOOD_DURATION_SPREAD_MS),
    })
}

/// Places a random polyomino at least five cells (Manhattan) from the head,
/// clear of the body, food and other obstacles, with the whole footprint
/// inside the grid.
pub fn place_obstacle<R: RandomSource>(
    rng: &mut R,
    state: &mut GameState,
    grid: GridSize,
    now_ms: u64,
) -> Result<Obstacle, SpawnError> {
    let shape = OBSTACLE_SHAPES[rng.pick_index(OBSTACLE_SHAPES.len())];
    let span_x = shape.iter().map(|&(dx, _)| dx).max().unwrap_or(0);
    let span_y = shape.iter().map(|&(_, dy)| dy).max().unwrap_or(0);
    let max_x = grid.width() - span_x - 1;
    let max_y = grid.height() - span_y - 1;
    let exhausted = SpawnError::PlacementExhausted {
        entity: "obstacle",
        attempts: MAX_PLACEMENT_ATTEMPTS,
    };
    if max_x < 0 || max_y < 0 {
        return Err(exhausted);
    }

    let head = state.head();
    let blocked = occupied_cells(state, true);
    for _ in 0..MAX_PLACEMENT_ATTEMPTS {
        let base_x = rng.int(0, max_x);
        let base_y = rng.int(0, max_y);
        let positions: Vec<Position> = shape
            .iter()
            .map(|&(dx, dy)| Position::new(base_x + dx, base_y + dy))
            .collect();
        let rejected = positions.iter().any(|pos| {
            manhattan(*pos, head) < OBSTACLE_MIN_HEAD_DISTANCE || blocked.contains(pos)
        });
        if rejected {
            continue;
        }
        return Ok(Obstacle {
            id: state.make_id("obstacle"),
            positions,
            created_at: now_ms,
            duration_ms: rng.duration_ms(OBSTACLE_MIN_DURATION_MS, OBSTACLE_DURATION_SPREAD_MS),
        });
    }
    Err(exhausted)
}

/// Places an effect node at least three cells (Manhattan) from the head,
/// clear of the body, food, obstacles and other nodes.
pub fn place_effect_node<R: RandomSource>(
    rng: &mut R,
    state: &mut GameState,
    grid: GridSize,
    effect_type: EffectType,
    now_ms: u64,
) -> Result<EffectNode, SpawnError> {
    let head = state.head();
    let mut blocked = occupied_cells(state, true);
    blocked.extend(state.effect_nodes.iter().map(|node| node.position));

    for _ in 0..MAX_PLACEMENT_ATTEMPTS {
        let position = Position {
            x: rng.int(0, grid.width() - 1),
            y: rng.int(0, grid.height() - 1),
        };
        if manhattan(position, head) < EFFECT_NODE_MIN_HEAD_DISTANCE || blocked.contains(&position)
        {
            continue;
        }
        return Ok(EffectNode {
            id: state.make_id("effect"),
            position,
            effect_type,
            created_at: now_ms,
            duration_ms: rng.duration_ms(EFFECT_NODE_MIN_DURATION_MS, EFFECT_NODE_DURATION_SPREAD_MS),
            config: get_effect_config(effect_type),
        });
    }
    Err(SpawnError::PlacementExhausted {
        entity: "effect_node",
        attempts: MAX_PLACEMENT_ATTEMPTS,
    })
}

pub fn pick_effect_type<R: RandomSource>(rng: &mut R) -> EffectType {
    EffectType::ALL[rng.pick_index(EffectType::ALL.len())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{Rng, SequenceRandom};
    use crate::types::Direction;

    fn state_with_head(head: Position) -> GameState {
        GameState {
            snake: vec![head],
            food: None,
            direction: Direction::None,
            game_over: false,
            started: true,
            score: 0,
            high_score: 0,
            obstacles: Vec::new(),
            effect_nodes: Vec::new(),
            active_effects: Vec::new(),
            game_speed_ms: 75.0,
            shards: Vec::new(),
            autonomous: false,
            last_effect_spawn_at: 0,
            next_id: 0,
        }
    }

    #[test]
    fn food_never_lands_on_body_or_obstacles() {
        let grid = GridSize::new(6, 6);
        for seed in 0..300u32 {
            let mut rng = Rng::new(seed);
            let mut state = state_with_head(Position::new(2, 2));
            state.snake.extend([Position::new(2, 3), Position::new(2, 4)]);
            state.obstacles.push(Obstacle {
                id: "obstacle_x".to_string(),
                positions: vec![Position::new(4, 4), Position::new(5, 4)],
                created_at: 0,
                duration_ms: 5_000,
            });
            let food = place_food(&mut rng, &mut state, grid, 100).expect("free cells exist");
            assert!(grid.contains(food.position));
            assert!(!state.snake.contains(&food.position));
            assert!(!state.is_obstacle_cell(food.position));
            assert!((5_000..10_000).contains(&food.duration_ms));
        }
    }

    #[test]
    fn food_finds_the_single_free_cell() {
        let grid = GridSize::new(3, 1);
        let mut state = state_with_head(Position::new(0, 0));
        state.snake.push(Position::new(1, 0));
        let mut rng = Rng::new(5);
        let food = place_food(&mut rng, &mut state, grid, 0).expect("one cell free");
        assert_eq!(food.position, Position::new(2, 0));
    }

    #[test]
    fn full_grid_yields_no_food() {
        let grid = GridSize::new(2, 1);
        let mut state = state_with_head(Position::new(0, 0));
        state.snake.push(Position::new(1, 0));
        let mut rng = Rng::new(5);
        assert!(place_food(&mut rng, &mut state, grid, 0).is_none());
    }

    #[test]
    fn obstacles_keep_distance_from_head_and_stay_in_grid() {
        let grid = GridSize::new(20, 20);
        for seed in 0..300u32 {
            let mut rng = Rng::new(seed);
            let mut state = state_with_head(Position::new(10, 10));
            let Ok(obstacle) = place_obstacle(&mut rng, &mut state, grid, 0) else {
                continue;
            };
            for pos in &obstacle.positions {
                assert!(grid.contains(*pos));
                assert!(manhattan(*pos, Position::new(10, 10)) >= 5);
            }
            assert!((3..=4).contains(&obstacle.positions.len()));
        }
    }

    #[test]
    fn obstacles_avoid_food_and_existing_obstacles() {
        let grid = GridSize::new(10, 10);
        let existing: Vec<Position> = (4..9).map(|x| Position::new(x, 6)).collect();
        let food = Position::new(7, 8);
        for seed in 0..500u32 {
            let mut rng = Rng::new(seed);
            let mut state = state_with_head(Position::new(0, 0));
            state.food = Some(Food {
                id: "food_x".to_string(),
                position: food,
                created_at: 0,
                duration_ms: 5_000,
            });
            state.obstacles.push(Obstacle {
                id: "obstacle_x".to_string(),
                positions: existing.clone(),
                created_at: 0,
                duration_ms: 5_000,
            });
            let Ok(obstacle) = place_obstacle(&mut rng, &mut state, grid, 0) else {
                continue;
            };
            assert!(!obstacle.positions.contains(&food), "seed={seed}");
            assert!(
                obstacle.positions.iter().all(|pos| !existing.contains(pos)),
                "seed={seed}"
            );
        }
    }

    #[test]
    fn obstacle_placement_gives_up_after_budget() {
        // 5x5 grid centred on the head has no cell five steps away.
        let grid = GridSize::new(5, 5);
        let mut state = state_with_head(Position::new(2, 2));
        let mut rng = Rng::new(11);
        let result = place_obstacle(&mut rng, &mut state, grid, 0);
        assert_eq!(
            result,
            Err(SpawnError::PlacementExhausted {
                entity: "obstacle",
                attempts: MAX_PLACEMENT_ATTEMPTS
            })
        );
        assert_eq!(state.next_id, 0);
    }

    #[test]
    fn obstacle_shape_wider_than_grid_is_exhausted() {
        let grid = GridSize::new(2, 2);
        let mut state = state_with_head(Position::new(0, 0));
        // first shape is the horizontal 3-line
        let mut rng = SequenceRandom::new([0.0], 0.0);
        assert!(place_obstacle(&mut rng, &mut state, grid, 0).is_err());
    }

    #[test]
    fn effect_nodes_avoid_head_and_existing_nodes() {
        let grid = GridSize::new(8, 8);
        for seed in 0..300u32 {
            let mut rng = Rng::new(seed);
            let mut state = state_with_head(Position::new(0, 0));
            let first = place_effect_node(&mut rng, &mut state, grid, EffectType::SpeedBoost, 0)
                .expect("space available");
            state.effect_nodes.push(first.clone());
            let Ok(second) =
                place_effect_node(&mut rng, &mut state, grid, EffectType::ExplodingNode, 0)
            else {
                continue;
            };
            assert_ne!(first.position, second.position);
            assert!(manhattan(second.position, Position::new(0, 0)) >= 3);
            assert_eq!(second.config.effect_type, EffectType::ExplodingNode);
            assert!((8_000..15_000).contains(&second.duration_ms));
        }
    }

    #[test]
    fn effect_type_is_picked_uniformly_from_draw() {
        let mut rng = SequenceRandom::new([0.1, 0.9], 0.0);
        assert_eq!(pick_effect_type(&mut rng), EffectType::SpeedBoost);
        assert_eq!(pick_effect_type(&mut rng), EffectType::ExplodingNode);
    }
}
