use std::collections::HashSet;

use crate::types::{GameState, Position};

pub(crate) fn manhattan(a: Position, b: Position) -> i32 {
    (a.x - b.x).abs() + (a.y - b.y).abs()
}

/// Cells a placement must avoid: body, food and obstacle footprints.
pub(super) fn occupied_cells(state: &GameState, include_food: bool) -> HashSet<Position> {
    let mut cells: HashSet<Position> = state.snake.iter().copied().collect();
    for obstacle in &state.obstacles {
        cells.extend(obstacle.positions.iter().copied());
    }
    if include_food {
        if let Some(food) = &state.food {
            cells.insert(food.position);
        }
    }
    cells
}
