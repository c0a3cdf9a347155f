// Orchestration - the decision loop, lifecycle control and status surface

pub mod orchestrator;

pub use orchestrator::{Engine, EngineStatus};
