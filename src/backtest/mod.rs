// Offline evaluation - replays the decision pipeline over synthetic candles

pub mod metrics;
pub mod runner;

pub use metrics::BacktestReport;
pub use runner::Backtester;
