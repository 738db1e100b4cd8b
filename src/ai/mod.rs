use std::collections::HashSet;
use std::fmt;

use crate::engine::utils::manhattan;
use crate::types::{Direction, EffectType, GameState, GridSize, Position};

pub mod astar;

const FOOD_BASE_PRIORITY: f64 = 100.0;
const FOOD_URGENCY_WEIGHT: f64 = 50.0;
const NODE_BASE_PRIORITY: f64 = 60.0;
const EXPLODING_NODE_PRIORITY: f64 = 80.0;
const SPEED_BOOST_PRIORITY: f64 = 70.0;
const EXPLODING_NODE_OBSTACLE_THRESHOLD: usize = 2;
const SPEED_BOOST_SCORE_THRESHOLD: u32 = 50;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetKind {
    Food,
    Effect(EffectType),
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKind::Food => write!(f, "food"),
            TargetKind::Effect(_) => write!(f, "effect"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Target {
    pub position: Position,
    pub priority: f64,
    pub kind: TargetKind,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DecisionReason {
    PathStep { target: Target, path_len: usize },
    NoTarget,
    NoPathFound { target: Target },
    RejectedStep { target: Target },
    NoSafeMove,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AutopilotDecision {
    pub direction: Direction,
    pub reason: DecisionReason,
    pub fell_back: bool,
}

#[derive(Clone, Copy, Debug)]
pub struct Autopilot {
    grid: GridSize,
}

impl Autopilot {
    pub fn new(grid: GridSize) -> Self {
        Self { grid }
    }

    pub fn grid(&self) -> GridSize {
        self.grid
    }

    pub fn update_grid(&mut self, grid: GridSize) {
        self.grid = grid;
    }

    pub fn choose_direction(&self, state: &GameState, now_ms: u64) -> Direction {
        self.decide(state, now_ms).direction
    }

    pub fn decide(&self, state: &GameState, now_ms: u64) -> AutopilotDecision {
        let head = state.head();
        let blocked = blocked_cells(state);

        let reason = match self.evaluate_targets(state, now_ms) {
            None => DecisionReason::NoTarget,
            Some(target) => {
                match astar::find_path(head, target.position, self.grid, &blocked) {
                    Some(path) if !path.is_empty() => {
                        match self.step_toward(head, path[0], state.direction, &blocked) {
                            Some(direction) => {
                                return AutopilotDecision {
                                    direction,
                                    reason: DecisionReason::PathStep {
                                        target,
                                        path_len: path.len(),
                                    },
                                    fell_back: false,
                                };
                            }
                            None => DecisionReason::RejectedStep { target },
                        }
                    }
                    _ => DecisionReason::NoPathFound { target },
                }
            }
        };

        let safe = self.safe_moves(head, state.direction, &blocked);
        let direction = if safe.contains(&state.direction) {
            state.direction
        } else if let Some(first) = safe.first() {
            *first
        } else {
            return AutopilotDecision {
                direction: state.direction,
                reason: DecisionReason::NoSafeMove,
                fell_back: true,
            };
        };
        AutopilotDecision {
            direction,
            reason,
            fell_back: true,
        }
    }

    // ties keep the earlier candidate: food, then nodes in board order
    pub fn evaluate_targets(&self, state: &GameState, now_ms: u64) -> Option<Target> {
        let head = state.head();
        let mut best: Option<Target> = None;
        let mut consider = |candidate: Target| {
            if best.map_or(true, |current| candidate.priority > current.priority) {
                best = Some(candidate);
            }
        };

        if let Some(food) = &state.food {
            let distance = manhattan(head, food.position) as f64;
            let duration = food.duration_ms as f64;
            let elapsed = now_ms.saturating_sub(food.created_at) as f64;
            let urgency = if duration > 0.0 {
                (1.0 - (duration - elapsed) / duration).max(0.0)
            } else {
                1.0
            };
            consider(Target {
                position: food.position,
                priority: FOOD_BASE_PRIORITY - distance + urgency * FOOD_URGENCY_WEIGHT,
                kind: TargetKind::Food,
            });
        }

        for node in &state.effect_nodes {
            let base = match node.effect_type {
                EffectType::ExplodingNode
                    if state.obstacles.len() > EXPLODING_NODE_OBSTACLE_THRESHOLD =>
                {
                    EXPLODING_NODE_PRIORITY
                }
                EffectType::SpeedBoost if state.score > SPEED_BOOST_SCORE_THRESHOLD => {
                    SPEED_BOOST_PRIORITY
                }
                _ => NODE_BASE_PRIORITY,
            };
            consider(Target {
                position: node.position,
                priority: base - manhattan(head, node.position) as f64,
                kind: TargetKind::Effect(node.effect_type),
            });
        }

        best
    }

    pub fn safe_moves(
        &self,
        head: Position,
        current: Direction,
        blocked: &HashSet<Position>,
    ) -> Vec<Direction> {
        Direction::CARDINALS
            .into_iter()
            .filter(|dir| !dir.is_reverse_of(current))
            .filter(|dir| !blocked.contains(&self.grid.step(head, *dir)))
            .collect()
    }

    pub fn explain(&self, state: &GameState, now_ms: u64) -> String {
        let head = state.head();
        let blocked = blocked_cells(state);
        let Some(target) = self.evaluate_targets(state, now_ms) else {
            let safe = self.safe_moves(head, state.direction, &blocked);
            return format!("No targets found. {} safe moves available.", safe.len());
        };
        let path_len = astar::find_path(head, target.position, self.grid, &blocked)
            .map_or(0, |path| path.len());
        format!(
            "Target: {} at ({},{}), Distance: {}, Priority: {:.1}, Path length: {}",
            target.kind,
            target.position.x,
            target.position.y,
            manhattan(head, target.position),
            target.priority,
            path_len
        )
    }

    fn step_toward(
        &self,
        head: Position,
        next: Position,
        current: Direction,
        blocked: &HashSet<Position>,
    ) -> Option<Direction> {
        let dx = clamp_wrapped(next.x - head.x);
        let dy = clamp_wrapped(next.y - head.y);
        let direction = Direction::from_delta(dx, dy)?;
        if direction == Direction::None || direction.is_reverse_of(current) {
            return None;
        }
        let landing = self.grid.wrap(head.x + dx, head.y + dy);
        if blocked.contains(&landing) {
            return None;
        }
        Some(direction)
    }
}

/// A step across the seam shows up as a jump of `extent - 1`; flip it
/// back to a single cell in the other direction.
fn clamp_wrapped(delta: i32) -> i32 {
    if delta.abs() > 1 {
        -delta.signum()
    } else {
        delta
    }
}

fn blocked_cells(state: &GameState) -> HashSet<Position> {
    state
        .snake
        .iter()
        .skip(1)
        .copied()
        .chain(
            state
                .obstacles
                .iter()
                .flat_map(|obstacle| obstacle.positions.iter().copied()),
        )
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{get_effect_config, BASE_GAME_SPEED_MS};
    use crate::types::{EffectNode, Food, Obstacle};

    fn state(cells: &[(i32, i32)], direction: Direction) -> GameState {
        GameState {
            snake: cells.iter().map(|&(x, y)| Position::new(x, y)).collect(),
            food: None,
            direction,
            game_over: false,
            started: true,
            score: 0,
            high_score: 0,
            obstacles: Vec::new(),
            effect_nodes: Vec::new(),
            active_effects: Vec::new(),
            game_speed_ms: BASE_GAME_SPEED_MS,
            shards: Vec::new(),
            autonomous: true,
            last_effect_spawn_at: 0,
            next_id: 0,
        }
    }

    fn food(x: i32, y: i32) -> Food {
        Food {
            id: "food_0".to_string(),
            position: Position::new(x, y),
            created_at: 0,
            duration_ms: 8_000,
        }
    }

    fn node(x: i32, y: i32, effect_type: EffectType) -> EffectNode {
        EffectNode {
            id: format!("effect_{x}_{y}"),
            position: Position::new(x, y),
            effect_type,
            created_at: 0,
            duration_ms: 10_000,
            config: get_effect_config(effect_type),
        }
    }

    fn obstacle(cells: &[(i32, i32)]) -> Obstacle {
        Obstacle {
            id: "obstacle_0".to_string(),
            positions: cells.iter().map(|&(x, y)| Position::new(x, y)).collect(),
            created_at: 0,
            duration_ms: 10_000,
        }
    }

    #[test]
    fn heads_straight_for_food() {
        let pilot = Autopilot::new(GridSize::new(20, 20));
        let mut s = state(&[(5, 5)], Direction::None);
        s.food = Some(food(9, 5));
        let decision = pilot.decide(&s, 0);
        assert_eq!(decision.direction, Direction::Right);
        assert!(!decision.fell_back);
        assert!(matches!(
            decision.reason,
            DecisionReason::PathStep { path_len: 4, .. }
        ));
    }

    #[test]
    fn crosses_the_seam_when_shorter() {
        let pilot = Autopilot::new(GridSize::new(10, 10));
        let mut s = state(&[(0, 5)], Direction::Left);
        s.food = Some(food(9, 5));
        assert_eq!(pilot.choose_direction(&s, 0), Direction::Left);
    }

    #[test]
    fn far_food_outranks_a_close_node_and_gains_urgency() {
        let pilot = Autopilot::new(GridSize::new(30, 30));
        let mut s = state(&[(10, 10)], Direction::None);
        s.food = Some(food(25, 10));
        s.effect_nodes = vec![node(11, 10, EffectType::SpeedBoost)];

        let fresh = pilot.evaluate_targets(&s, 0).expect("target");
        assert_eq!(fresh.kind, TargetKind::Food);
        assert_eq!(fresh.priority, 85.0);
        let expiring = pilot.evaluate_targets(&s, 8_000).expect("target");
        assert_eq!(expiring.priority, 135.0);

        s.food = None;
        let only_node = pilot.evaluate_targets(&s, 0).expect("target");
        assert_eq!(only_node.kind, TargetKind::Effect(EffectType::SpeedBoost));
        assert_eq!(only_node.priority, 59.0);
    }

    #[test]
    fn node_priorities_follow_board_conditions() {
        let pilot = Autopilot::new(GridSize::new(30, 30));
        let mut s = state(&[(0, 0)], Direction::None);
        s.effect_nodes = vec![
            node(5, 0, EffectType::SpeedBoost),
            node(0, 5, EffectType::ExplodingNode),
        ];
        // equal priority: the earlier node wins
        assert_eq!(
            pilot.evaluate_targets(&s, 0).map(|t| t.position),
            Some(Position::new(5, 0))
        );

        s.obstacles = vec![
            obstacle(&[(20, 20)]),
            obstacle(&[(22, 22)]),
            obstacle(&[(24, 24)]),
        ];
        let target = pilot.evaluate_targets(&s, 0).expect("target");
        assert_eq!(target.kind, TargetKind::Effect(EffectType::ExplodingNode));
        assert_eq!(target.priority, 75.0);

        s.obstacles.clear();
        s.score = 60;
        let target = pilot.evaluate_targets(&s, 0).expect("target");
        assert_eq!(target.kind, TargetKind::Effect(EffectType::SpeedBoost));
        assert_eq!(target.priority, 65.0);
    }

    #[test]
    fn food_tie_with_node_keeps_food() {
        let pilot = Autopilot::new(GridSize::new(100, 100));
        let mut s = state(&[(0, 0)], Direction::None);
        // both score 59
        s.food = Some(food(41, 0));
        s.effect_nodes = vec![node(1, 0, EffectType::SpeedBoost)];
        let target = pilot.evaluate_targets(&s, 0).expect("target");
        assert_eq!(target.kind, TargetKind::Food);
    }

    #[test]
    fn routes_around_obstacles() {
        let pilot = Autopilot::new(GridSize::new(20, 20));
        let mut s = state(&[(5, 5)], Direction::Right);
        s.food = Some(food(8, 5));
        s.obstacles = vec![obstacle(&[(6, 5), (6, 4), (6, 6)])];
        let dir = pilot.choose_direction(&s, 0);
        assert!(dir == Direction::Up || dir == Direction::Down);
    }

    #[test]
    fn never_reverses_toward_food_behind() {
        let pilot = Autopilot::new(GridSize::new(20, 20));
        let mut s = state(&[(5, 5)], Direction::Right);
        s.food = Some(food(3, 5));
        let decision = pilot.decide(&s, 0);
        assert_ne!(decision.direction, Direction::Left);
        assert!(decision.fell_back);
        assert_eq!(decision.direction, Direction::Right);
    }

    #[test]
    fn falls_back_to_first_safe_turn_when_straight_is_blocked() {
        let pilot = Autopilot::new(GridSize::new(10, 10));
        let mut s = state(&[(5, 5)], Direction::Right);
        s.obstacles = vec![obstacle(&[(6, 5), (5, 4)])];
        let decision = pilot.decide(&s, 0);
        assert_eq!(decision.reason, DecisionReason::NoTarget);
        assert_eq!(decision.direction, Direction::Down);
    }

    #[test]
    fn boxed_in_keeps_current_heading() {
        let pilot = Autopilot::new(GridSize::new(10, 10));
        let mut s = state(&[(5, 5), (4, 5)], Direction::Right);
        s.food = Some(food(0, 0));
        s.obstacles = vec![obstacle(&[(6, 5), (5, 4), (5, 6)])];
        let decision = pilot.decide(&s, 0);
        assert_eq!(decision.direction, Direction::Right);
        assert_eq!(decision.reason, DecisionReason::NoSafeMove);
    }

    #[test]
    fn unreachable_food_reports_no_path() {
        let pilot = Autopilot::new(GridSize::new(10, 10));
        let mut s = state(&[(1, 1)], Direction::Down);
        s.food = Some(food(5, 5));
        s.obstacles = vec![obstacle(&[(5, 4), (4, 5), (6, 5), (5, 6)])];
        let decision = pilot.decide(&s, 0);
        assert!(matches!(decision.reason, DecisionReason::NoPathFound { .. }));
        assert_eq!(decision.direction, Direction::Down);
    }

    #[test]
    fn decisions_are_deterministic() {
        let pilot = Autopilot::new(GridSize::new(15, 15));
        let mut s = state(&[(7, 7), (7, 8), (7, 9)], Direction::Up);
        s.food = Some(food(2, 12));
        s.effect_nodes = vec![node(12, 2, EffectType::ExplodingNode)];
        s.obstacles = vec![obstacle(&[(6, 6), (7, 5), (8, 6)])];
        let first = pilot.decide(&s, 1_000);
        for _ in 0..10 {
            assert_eq!(pilot.decide(&s, 1_000), first);
        }
    }

    #[test]
    fn explain_describes_target_or_safe_moves() {
        let pilot = Autopilot::new(GridSize::new(20, 20));
        let mut s = state(&[(5, 5)], Direction::Right);
        assert_eq!(
            pilot.explain(&s, 0),
            "No targets found. 3 safe moves available."
        );
        s.food = Some(food(8, 5));
        assert_eq!(
            pilot.explain(&s, 0),
            "Target: food at (8,5), Distance: 3, Priority: 97.0, Path length: 3"
        );
    }

    #[test]
    fn resize_changes_wrap_geometry() {
        let mut pilot = Autopilot::new(GridSize::new(10, 10));
        let mut s = state(&[(0, 0)], Direction::None);
        s.food = Some(food(4, 0));
        assert_eq!(pilot.choose_direction(&s, 0), Direction::Right);
        pilot.update_grid(GridSize::new(6, 6));
        assert_eq!(pilot.grid(), GridSize::new(6, 6));
        assert_eq!(pilot.choose_direction(&s, 0), Direction::Left);
    }
}
