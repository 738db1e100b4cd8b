pub mod ai;
pub mod clock;
pub mod config;
pub mod constants;
pub mod control;
pub mod engine;
pub mod error;
pub mod high_score_store;
pub mod rng;
pub mod session;
pub mod types;
