use crate::types::{Obstacle, Position};

/// Whether a candidate head lands on the pre-move body (tail included) or
/// on any obstacle cell.
pub fn head_collides(head: Position, snake: &[Position], obstacles: &[Obstacle]) -> bool {
    snake.contains(&head) || obstacles.iter().any(|obstacle| obstacle.occupies(head))
}
