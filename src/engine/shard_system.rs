use std::collections::HashSet;

use crate::constants::{SHARD_DURATION_MS, SHARD_SIZE, SHARD_SPEED};
use crate::types::{GameState, GridSize, Obstacle, Position, Shard, ShardPoint};

/// Spawns one shard per neighbour direction of `center` (eight in total).
pub fn burst_shards(state: &mut GameState, center: Position, now_ms: u64) -> Vec<Shard> {
    let mut shards = Vec::with_capacity(8);
    for dy in -1..=1 {
        for dx in -1..=1 {
            if dx == 0 && dy == 0 {
                continue;
            }
            shards.push(Shard {
                id: state.make_id("shard"),
                position: ShardPoint::from(center),
                velocity: ShardPoint {
                    x: dx as f32 * SHARD_SPEED,
                    y: dy as f32 * SHARD_SPEED,
                },
                created_at: now_ms,
                duration_ms: SHARD_DURATION_MS,
                size: SHARD_SIZE,
            });
        }
    }
    shards
}

/// Drops expired shards, moves the rest and drops those now more than one
/// cell outside the grid.
pub fn advance_shards(shards: &mut Vec<Shard>, grid: GridSize, now_ms: u64) {
    let width = grid.width() as f32;
    let height = grid.height() as f32;
    shards.retain_mut(|shard| {
        if now_ms.saturating_sub(shard.created_at) >= shard.duration_ms {
            return false;
        }
        shard.position.x += shard.velocity.x;
        shard.position.y += shard.velocity.y;
        shard.position.x >= -1.0
            && shard.position.x <= width
            && shard.position.y >= -1.0
            && shard.position.y <= height
    });
}

/// Pairs shards with obstacles whose footprint contains the shard's cell.
/// A shard hits at most one obstacle and an obstacle absorbs at most one
/// shard; both sides of every pair are removed. Returns the destroyed
/// obstacle ids.
pub fn shatter_obstacles(shards: &mut Vec<Shard>, obstacles: &mut Vec<Obstacle>) -> Vec<String> {
    let mut hit_shards: HashSet<usize> = HashSet::new();
    let mut hit_obstacles: HashSet<usize> = HashSet::new();

    for (shard_idx, shard) in shards.iter().enumerate() {
        let cell = shard.position.cell();
        let matched = obstacles
            .iter()
            .enumerate()
            .find(|(obstacle_idx, obstacle)| {
                !hit_obstacles.contains(obstacle_idx) && obstacle.occupies(cell)
            })
            .map(|(obstacle_idx, _)| obstacle_idx);
        if let Some(obstacle_idx) = matched {
            hit_shards.insert(shard_idx);
            hit_obstacles.insert(obstacle_idx);
        }
    }

    if hit_shards.is_empty() {
        return Vec::new();
    }

    let mut idx = 0;
    shards.retain(|_| {
        let keep = !hit_shards.contains(&idx);
        idx += 1;
        keep
    });

    let mut destroyed = Vec::with_capacity(hit_obstacles.len());
    let mut idx = 0;
    obstacles.retain(|obstacle| {
        let keep = !hit_obstacles.contains(&idx);
        idx += 1;
        if !keep {
            destroyed.push(obstacle.id.clone());
        }
        keep
    });
    destroyed
}
