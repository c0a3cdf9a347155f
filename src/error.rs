use thiserror::Error;

/// Errors surfaced by the decision engine.
///
/// Risk rejections are deliberately absent: a rejected entry is normal
/// control flow and travels as `risk::RiskVerdict`, not as an error.
/// `Invariant` is the only variant that stops the decision loop.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Invalid parameter on load or update. The previous config stays in effect.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Candle window too short to evaluate a symbol this cycle.
    #[error("insufficient data for {symbol}: have {have} candles, need {need}")]
    InsufficientData {
        symbol: String,
        have: usize,
        need: usize,
    },

    /// Market data or order placement failed after the adapter's retries.
    #[error("exchange error on {symbol}: {message}")]
    Exchange { symbol: String, message: String },

    /// Ledger corruption (e.g. two open positions on one symbol).
    #[error("ledger invariant violated: {0}")]
    Invariant(String),
}

impl EngineError {
    /// True for faults that abort only the affected symbol's iteration.
    pub fn is_symbol_scoped(&self) -> bool {
        matches!(
            self,
            EngineError::InsufficientData { .. } | EngineError::Exchange { .. }
        )
    }
}
