// Exchange seam - market data and order execution traits plus the paper venue

pub mod paper;
pub mod synthetic;

pub use paper::PaperExchange;
pub use synthetic::{MarketScenario, SyntheticSeries};

use crate::models::{Candle, Fill, Side};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;

/// Read side of a venue
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Most recent `lookback` candles for `symbol`, oldest first
    async fn candles(&self, symbol: &str, lookback: usize) -> Result<Vec<Candle>>;
}

/// Write side of a venue
#[async_trait]
pub trait Execution: Send + Sync {
    /// Place a market order and report the fill actually obtained
    async fn place_order(&self, symbol: &str, side: Side, amount: f64) -> Result<Fill>;

    /// Account balances keyed by currency
    async fn balances(&self) -> Result<HashMap<String, f64>>;

    /// Cheap liveness probe
    async fn test_connection(&self) -> bool;
}
