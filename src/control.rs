use serde_json::Value;

use crate::types::{Direction, GridSize};

/// Who supplies direction intents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlSource {
    Human,
    Autonomous,
}

impl ControlSource {
    pub fn from_autonomous(autonomous: bool) -> Self {
        if autonomous {
            ControlSource::Autonomous
        } else {
            ControlSource::Human
        }
    }

    pub fn is_autonomous(self) -> bool {
        self == ControlSource::Autonomous
    }

    pub fn toggled(self) -> Self {
        match self {
            ControlSource::Human => ControlSource::Autonomous,
            ControlSource::Autonomous => ControlSource::Human,
        }
    }
}

/// Input and lifecycle signals accepted by a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Turn(Direction),
    Start,
    Restart,
    ToggleDebug,
    ToggleAutonomous,
    Resize(GridSize),
}

/// Parses one input line. Accepts JSON messages
/// (`{"type":"input","dir":"up"}`, `{"type":"resize","width":40,"height":30}`,
/// `{"type":"start"}`, ...) or the bare keywords `up`, `w`, `start`,
/// `restart`, `debug`, `auto`, `resize 40 30`.
pub fn parse_command(raw: &str) -> Option<Command> {
    let trimmed = raw.trim();
    if trimmed.starts_with('{') {
        return parse_json_command(trimmed);
    }
    parse_text_command(trimmed)
}

fn parse_json_command(raw: &str) -> Option<Command> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    let message_type = object.get("type")?.as_str()?;

    match message_type {
        "input" => {
            let dir = Direction::parse_move(object.get("dir")?.as_str()?)?;
            turn(dir)
        }
        "start" => Some(Command::Start),
        "restart" => Some(Command::Restart),
        "toggle_debug" => Some(Command::ToggleDebug),
        "toggle_autonomous" => Some(Command::ToggleAutonomous),
        "resize" => {
            let width = parse_dimension(object.get("width")?)?;
            let height = parse_dimension(object.get("height")?)?;
            Some(Command::Resize(GridSize::new(width, height)))
        }
        _ => None,
    }
}

fn parse_text_command(raw: &str) -> Option<Command> {
    let mut parts = raw.split_whitespace();
    let keyword = parts.next()?.to_ascii_lowercase();
    let command = match keyword.as_str() {
        "w" | "up" => turn(Direction::Up)?,
        "s" | "down" => turn(Direction::Down)?,
        "a" | "left" => turn(Direction::Left)?,
        "d" | "right" => turn(Direction::Right)?,
        "start" | "space" => Command::Start,
        "restart" | "r" => Command::Restart,
        "debug" => Command::ToggleDebug,
        "auto" | "autonomous" => Command::ToggleAutonomous,
        "resize" => {
            let width: i32 = parts.next()?.parse().ok()?;
            let height: i32 = parts.next()?.parse().ok()?;
            if width < 1 || height < 1 {
                return None;
            }
            Command::Resize(GridSize::new(width, height))
        }
        _ => return None,
    };
    if parts.next().is_some() {
        return None;
    }
    Some(command)
}

fn turn(dir: Direction) -> Option<Command> {
    if dir == Direction::None {
        return None;
    }
    Some(Command::Turn(dir))
}

fn parse_dimension(value: &Value) -> Option<i32> {
    let raw = value.as_i64()?;
    if raw < 1 || raw > i32::MAX as i64 {
        return None;
    }
    Some(raw as i32)
}
