// Risk management module
pub mod manager;

pub use manager::{RejectReason, RiskManager, RiskVerdict};
