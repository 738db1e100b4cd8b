use std::fs;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::clock::{Clock, SystemClock};
use crate::error::StoreError;

/// Persistence collaborator for the best score ever reached.
pub trait HighScoreStore {
    /// Best stored score, `0` when nothing was stored yet.
    fn get_high_score(&self) -> u32;

    fn set_high_score(&mut self, score: u32) -> Result<(), StoreError>;
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct StoredHighScore {
    #[serde(rename = "bestScore", alias = "best_score")]
    best_score: u32,
    #[serde(rename = "updatedAtMs", alias = "updated_at_ms")]
    updated_at_ms: u64,
    #[serde(rename = "updatedAtIso", alias = "updated_at_iso", default)]
    updated_at_iso: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct HighScoreFile {
    version: u8,
    best: StoredHighScore,
}

#[derive(Clone, Debug, Deserialize)]
struct HighScoreFileRaw {
    version: u8,
    best: serde_json::Value,
}

pub struct JsonHighScoreStore {
    file_path: PathBuf,
    best: Option<StoredHighScore>,
}

impl JsonHighScoreStore {
    pub fn new(file_path: PathBuf) -> Self {
        let best = load_best(&file_path);
        Self { file_path, best }
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    fn save(&self, entry: &StoredHighScore) -> Result<(), StoreError> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let payload = HighScoreFile {
            version: 1,
            best: entry.clone(),
        };
        let text = serde_json::to_string_pretty(&payload)?;
        fs::write(&self.file_path, text).map_err(|source| StoreError::Io {
            path: self.file_path.clone(),
            source,
        })
    }
}

impl HighScoreStore for JsonHighScoreStore {
    fn get_high_score(&self) -> u32 {
        self.best.as_ref().map(|entry| entry.best_score).unwrap_or(0)
    }

    fn set_high_score(&mut self, score: u32) -> Result<(), StoreError> {
        let entry = StoredHighScore {
            best_score: score,
            updated_at_ms: SystemClock.now_ms(),
            updated_at_iso: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        self.save(&entry)?;
        self.best = Some(entry);
        Ok(())
    }
}

/// In-process store; `failing()` rejects every write.
#[derive(Clone, Debug, Default)]
pub struct MemoryHighScoreStore {
    best: u32,
    fail_writes: bool,
    writes: usize,
}

impl MemoryHighScoreStore {
    pub fn new(best: u32) -> Self {
        Self {
            best,
            ..Self::default()
        }
    }

    pub fn failing(best: u32) -> Self {
        Self {
            best,
            fail_writes: true,
            writes: 0,
        }
    }

    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl HighScoreStore for MemoryHighScoreStore {
    fn get_high_score(&self) -> u32 {
        self.best
    }

    fn set_high_score(&mut self, score: u32) -> Result<(), StoreError> {
        self.writes += 1;
        if self.fail_writes {
            return Err(StoreError::Rejected);
        }
        self.best = score;
        Ok(())
    }
}

fn load_best(path: &Path) -> Option<StoredHighScore> {
    let text = match fs::read_to_string(path) {
        Ok(value) => value,
        Err(error) => {
            if error.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), %error, "failed to read high score file");
            }
            return None;
        }
    };
    let parsed = match serde_json::from_str::<HighScoreFileRaw>(&text) {
        Ok(value) if value.version == 1 => value,
        Ok(value) => {
            warn!(
                path = %path.display(),
                error = %StoreError::UnsupportedVersion(value.version),
                "ignoring high score file"
            );
            return None;
        }
        Err(error) => {
            warn!(path = %path.display(), %error, "failed to parse high score file");
            return None;
        }
    };

    match serde_json::from_value::<StoredHighScore>(parsed.best) {
        Ok(entry) => Some(entry),
        Err(error) => {
            warn!(path = %path.display(), %error, "failed to parse high score entry");
            None
        }
    }
}
