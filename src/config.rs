use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{BASE_GAME_SPEED_MS, DEFAULT_GRID_HEIGHT, DEFAULT_GRID_WIDTH};
use crate::error::ConfigError;
use crate::types::GridSize;

pub const HIGH_SCORE_PATH_ENV: &str = "SNAKE_HIGH_SCORE_PATH";
pub const SEED_ENV: &str = "SNAKE_SEED";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    #[serde(rename = "gridWidth", alias = "grid_width")]
    pub grid_width: i32,
    #[serde(rename = "gridHeight", alias = "grid_height")]
    pub grid_height: i32,
    #[serde(rename = "baseSpeedMs", alias = "base_speed_ms")]
    pub base_speed_ms: f64,
    pub seed: Option<u32>,
    #[serde(rename = "highScorePath", alias = "high_score_path")]
    pub high_score_path: PathBuf,
}

/// Command-line values that win over file and environment settings.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub seed: Option<u32>,
    pub grid_width: Option<i32>,
    pub grid_height: Option<i32>,
    pub high_score_path: Option<PathBuf>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            grid_width: DEFAULT_GRID_WIDTH,
            grid_height: DEFAULT_GRID_HEIGHT,
            base_speed_ms: BASE_GAME_SPEED_MS,
            seed: None,
            high_score_path: PathBuf::from(".data/high_score.json"),
        }
    }
}

impl GameConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `SNAKE_HIGH_SCORE_PATH` and `SNAKE_SEED` when set.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(raw) = std::env::var(HIGH_SCORE_PATH_ENV) {
            if !raw.trim().is_empty() {
                self.high_score_path = PathBuf::from(raw);
            }
        }
        if let Some(seed) = std::env::var(SEED_ENV)
            .ok()
            .and_then(|value| value.trim().parse::<u32>().ok())
        {
            self.seed = Some(seed);
        }
        self
    }

    /// Resolves the layered configuration: optional file, then environment,
    /// then command-line values, validated at the end.
    pub fn resolve(
        file: Option<&Path>,
        overrides: ConfigOverrides,
    ) -> Result<Self, ConfigError> {
        let mut config = match file {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        }
        .with_env_overrides();
        if let Some(seed) = overrides.seed {
            config.seed = Some(seed);
        }
        if let Some(width) = overrides.grid_width {
            config.grid_width = width;
        }
        if let Some(height) = overrides.grid_height {
            config.grid_height = height;
        }
        if let Some(path) = overrides.high_score_path {
            config.high_score_path = path;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid_width < 1 || self.grid_height < 1 {
            return Err(ConfigError::InvalidGrid {
                width: self.grid_width,
                height: self.grid_height,
            });
        }
        if !self.base_speed_ms.is_finite() || self.base_speed_ms <= 0.0 {
            return Err(ConfigError::InvalidSpeed(self.base_speed_ms));
        }
        Ok(())
    }

    pub fn grid(&self) -> GridSize {
        GridSize::new(self.grid_width, self.grid_height)
    }
}
