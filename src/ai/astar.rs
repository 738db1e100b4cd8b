use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::engine::utils::manhattan;
use crate::types::{Direction, GridSize, Position};

#[derive(Clone, Copy, Debug)]
struct SearchNode {
    position: Position,
    g: i32,
    parent: Option<usize>,
}

/// Heap entry ordered by `f`, then by insertion order so equal `f` values
/// pop first-in first-out.
type OpenEntry = Reverse<(i32, u64, usize)>;

/// A* over the 4-connected toroidal grid with unit step cost and a plain
/// (non-wrapping) Manhattan heuristic. `blocked` cells are never entered.
/// Returns the cells from the first step up to and including `goal`, or
/// `None` when the open set runs dry.
pub fn find_path(
    start: Position,
    goal: Position,
    grid: GridSize,
    blocked: &HashSet<Position>,
) -> Option<Vec<Position>> {
    let mut arena: Vec<SearchNode> = Vec::new();
    let mut open: BinaryHeap<OpenEntry> = BinaryHeap::new();
    let mut open_index: HashMap<Position, usize> = HashMap::new();
    let mut closed: HashSet<Position> = HashSet::new();
    let mut sequence = 0u64;

    arena.push(SearchNode {
        position: start,
        g: 0,
        parent: None,
    });
    open_index.insert(start, 0);
    open.push(Reverse((manhattan(start, goal), sequence, 0)));

    while let Some(Reverse((f, _, idx))) = open.pop() {
        let current = arena[idx];
        if closed.contains(&current.position) {
            continue;
        }
        // superseded by a cheaper entry for the same node
        if f != current.g + manhattan(current.position, goal) {
            continue;
        }
        closed.insert(current.position);
        open_index.remove(&current.position);

        if current.position == goal {
            return Some(reconstruct(&arena, idx));
        }

        for dir in Direction::CARDINALS {
            let neighbor = grid.step(current.position, dir);
            if closed.contains(&neighbor) || blocked.contains(&neighbor) {
                continue;
            }
            let g = current.g + 1;
            let h = manhattan(neighbor, goal);
            match open_index.get(&neighbor).copied() {
                Some(existing) if g >= arena[existing].g => {}
                Some(existing) => {
                    arena[existing].g = g;
                    arena[existing].parent = Some(idx);
                    sequence += 1;
                    open.push(Reverse((g + h, sequence, existing)));
                }
                None => {
                    let node_idx = arena.len();
                    arena.push(SearchNode {
                        position: neighbor,
                        g,
                        parent: Some(idx),
                    });
                    open_index.insert(neighbor, node_idx);
                    sequence += 1;
                    open.push(Reverse((g + h, sequence, node_idx)));
                }
            }
        }
    }

    None
}

fn reconstruct(arena: &[SearchNode], goal_idx: usize) -> Vec<Position> {
    let mut path = Vec::new();
    let mut cursor = goal_idx;
    while let Some(parent) = arena[cursor].parent {
        path.push(arena[cursor].position);
        cursor = parent;
    }
    path.reverse();
    path
}
