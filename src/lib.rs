// Core modules
pub mod backtest;
pub mod config;
pub mod engine;
pub mod error;
pub mod exchange;
pub mod indicators;
pub mod models;
pub mod portfolio;
pub mod risk;
pub mod strategy;

// Re-export commonly used types
pub use config::{Config, ConfigPatch};
pub use engine::{Engine, EngineStatus};
pub use error::EngineError;
pub use models::*;
