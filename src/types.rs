use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    None,
}

impl Direction {
    pub const CARDINALS: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn parse_move(value: &str) -> Option<Self> {
        match value {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "none" => Some(Self::None),
            _ => None,
        }
    }

    /// Unit vector with y growing downwards.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
            Direction::None => (0, 0),
        }
    }

    pub fn from_delta(dx: i32, dy: i32) -> Option<Self> {
        match (dx, dy) {
            (0, -1) => Some(Direction::Up),
            (0, 1) => Some(Direction::Down),
            (-1, 0) => Some(Direction::Left),
            (1, 0) => Some(Direction::Right),
            (0, 0) => Some(Direction::None),
            _ => None,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::None => Direction::None,
        }
    }

    pub fn is_reverse_of(self, other: Direction) -> bool {
        self != Direction::None && self == other.opposite()
    }

    /// Whether an input intent may replace `self` as the heading.
    pub fn accepts_turn(self, intent: Direction) -> bool {
        intent != Direction::None && !intent.is_reverse_of(self)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct GridSize {
    width: i32,
    height: i32,
}

impl GridSize {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn wrap(&self, x: i32, y: i32) -> Position {
        Position {
            x: x.rem_euclid(self.width),
            y: y.rem_euclid(self.height),
        }
    }

    pub fn step(&self, from: Position, dir: Direction) -> Position {
        let (dx, dy) = dir.delta();
        self.wrap(from.x + dx, from.y + dy)
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width && pos.y < self.height
    }

    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EffectType {
    SpeedBoost,
    ExplodingNode,
}

impl EffectType {
    pub const ALL: [EffectType; 2] = [EffectType::SpeedBoost, EffectType::ExplodingNode];
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct EffectConfig {
    #[serde(rename = "type")]
    pub effect_type: EffectType,
    #[serde(rename = "durationMs")]
    pub duration_ms: u64,
    pub value: f64,
    pub stackable: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Food {
    pub id: String,
    pub position: Position,
    #[serde(rename = "createdAt")]
    pub created_at: u64,
    #[serde(rename = "durationMs")]
    pub duration_ms: u64,
}

impl Food {
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.created_at) > self.duration_ms
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Obstacle {
    pub id: String,
    pub positions: Vec<Position>,
    #[serde(rename = "createdAt")]
    pub created_at: u64,
    #[serde(rename = "durationMs")]
    pub duration_ms: u64,
}

impl Obstacle {
    pub fn occupies(&self, pos: Position) -> bool {
        self.positions.contains(&pos)
    }

    pub fn is_alive(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.created_at) < self.duration_ms
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EffectNode {
    pub id: String,
    pub position: Position,
    #[serde(rename = "effectType")]
    pub effect_type: EffectType,
    #[serde(rename = "createdAt")]
    pub created_at: u64,
    #[serde(rename = "durationMs")]
    pub duration_ms: u64,
    pub config: EffectConfig,
}

impl EffectNode {
    pub fn is_alive(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.created_at) < self.duration_ms
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ActiveEffect {
    pub id: String,
    #[serde(rename = "type")]
    pub effect_type: EffectType,
    #[serde(rename = "startTime")]
    pub start_time: u64,
    #[serde(rename = "durationMs")]
    pub duration_ms: u64,
    pub value: f64,
}

impl ActiveEffect {
    pub fn is_alive(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.start_time) < self.duration_ms
    }
}

/// Sub-cell coordinate pair used by shards.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ShardPoint {
    pub x: f32,
    pub y: f32,
}

impl ShardPoint {
    pub fn cell(&self) -> Position {
        Position {
            x: self.x.floor() as i32,
            y: self.y.floor() as i32,
        }
    }
}

impl From<Position> for ShardPoint {
    fn from(pos: Position) -> Self {
        Self {
            x: pos.x as f32,
            y: pos.y as f32,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Shard {
    pub id: String,
    pub position: ShardPoint,
    pub velocity: ShardPoint,
    #[serde(rename = "createdAt")]
    pub created_at: u64,
    #[serde(rename = "durationMs")]
    pub duration_ms: u64,
    pub size: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GameState {
    pub snake: Vec<Position>,
    pub food: Option<Food>,
    pub direction: Direction,
    #[serde(rename = "gameOver")]
    pub game_over: bool,
    pub started: bool,
    pub score: u32,
    #[serde(rename = "highScore")]
    pub high_score: u32,
    pub obstacles: Vec<Obstacle>,
    #[serde(rename = "effectNodes")]
    pub effect_nodes: Vec<EffectNode>,
    #[serde(rename = "activeEffects")]
    pub active_effects: Vec<ActiveEffect>,
    #[serde(rename = "gameSpeedMs")]
    pub game_speed_ms: f64,
    pub shards: Vec<Shard>,
    pub autonomous: bool,
    #[serde(rename = "lastEffectSpawnAt")]
    pub last_effect_spawn_at: u64,
    #[serde(skip)]
    pub next_id: u64,
}

impl GameState {
    pub fn head(&self) -> Position {
        self.snake[0]
    }

    pub fn is_obstacle_cell(&self, pos: Position) -> bool {
        self.obstacles.iter().any(|obstacle| obstacle.occupies(pos))
    }

    pub fn with_direction(&self, direction: Direction) -> Self {
        Self {
            direction,
            ..self.clone()
        }
    }

    pub(crate) fn make_id(&mut self, prefix: &str) -> String {
        let id = format!("{}_{}", prefix, self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        id
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TickEvent {
    FoodEaten { at: Position, score: u32 },
    FoodExpired { food_id: String },
    EffectApplied { effect_type: EffectType },
    ShardBurst { at: Position, count: usize },
    ObstacleSpawned { obstacle_id: String },
    EffectNodeSpawned { node_id: String, effect_type: EffectType },
    ObstaclesShattered { obstacle_ids: Vec<String> },
    PlacementExhausted { entity: &'static str },
    GameOver { score: u32, high_score: u32 },
}
