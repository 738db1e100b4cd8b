use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SpawnError {
    #[error("no free placement for {entity} after {attempts} attempts")]
    PlacementExhausted {
        entity: &'static str,
        attempts: usize,
    },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode high score payload: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("unsupported high score file version {0}")]
    UnsupportedVersion(u8),
    #[error("high score store rejected the write")]
    Rejected,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("grid must be at least 1x1, got {width}x{height}")]
    InvalidGrid { width: i32, height: i32 },
    #[error("base speed must be positive, got {0}")]
    InvalidSpeed(f64),
}
