// Portfolio bookkeeping module
pub mod ledger;

pub use ledger::{PerformanceStats, PortfolioLedger, PortfolioSnapshot, PortfolioSummary};
