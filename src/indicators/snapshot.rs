use serde::{Deserialize, Serialize};

use super::{
    calculate_bollinger, calculate_ema, calculate_macd, calculate_rsi, calculate_sma,
    calculate_stochastic, calculate_volume_trend,
};
use crate::config::Config;
use crate::models::Candle;

/// Every indicator for one symbol at the latest bar, recomputed each
/// cycle from the candle window.
///
/// A `None` field means the window was too short for that indicator.
/// Consumers must drop the indicator from their decision, never read it
/// as zero or neutral. The `prev_*` fields carry the prior bar's values
/// for the crossing checks, so one snapshot is self-contained.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub close: f64,
    pub rsi: Option<f64>,
    pub macd_line: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub prev_macd_histogram: Option<f64>,
    pub bollinger_upper: Option<f64>,
    pub bollinger_middle: Option<f64>,
    pub bollinger_lower: Option<f64>,
    pub sma_20: Option<f64>,
    pub sma_50: Option<f64>,
    pub ema_12: Option<f64>,
    pub ema_26: Option<f64>,
    pub stochastic_k: Option<f64>,
    pub stochastic_d: Option<f64>,
    pub prev_stochastic_k: Option<f64>,
    pub prev_stochastic_d: Option<f64>,
    pub volume_trend: Option<f64>,
}

impl IndicatorSnapshot {
    /// Compute whatever the window supports. Pure; no I/O, no clock.
    pub fn compute(candles: &[Candle], config: &Config) -> Self {
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let volumes: Vec<f64> = candles.iter().map(|c| c.volume).collect();
        let close = closes.last().copied().unwrap_or(0.0);

        let macd = calculate_macd(&closes, config.macd_fast, config.macd_slow, config.macd_signal);
        let prev_macd = closes.split_last().and_then(|(_, rest)| {
            calculate_macd(rest, config.macd_fast, config.macd_slow, config.macd_signal)
        });
        let bollinger = calculate_bollinger(&closes, config.bollinger_period, config.bollinger_k);
        let stochastic =
            calculate_stochastic(candles, config.stochastic_period, config.stochastic_smoothing);
        let prev_stochastic = candles.split_last().and_then(|(_, rest)| {
            calculate_stochastic(rest, config.stochastic_period, config.stochastic_smoothing)
        });

        Self {
            close,
            rsi: calculate_rsi(&closes, config.rsi_period),
            macd_line: macd.as_ref().map(|m| m.line),
            macd_signal: macd.as_ref().map(|m| m.signal),
            macd_histogram: macd.as_ref().map(|m| m.histogram),
            prev_macd_histogram: prev_macd.map(|m| m.histogram),
            bollinger_upper: bollinger.as_ref().map(|b| b.upper),
            bollinger_middle: bollinger.as_ref().map(|b| b.middle),
            bollinger_lower: bollinger.as_ref().map(|b| b.lower),
            sma_20: calculate_sma(&closes, config.sma_short_period),
            sma_50: calculate_sma(&closes, config.sma_long_period),
            ema_12: calculate_ema(&closes, config.macd_fast),
            ema_26: calculate_ema(&closes, config.macd_slow),
            stochastic_k: stochastic.as_ref().map(|s| s.k),
            stochastic_d: stochastic.as_ref().map(|s| s.d),
            prev_stochastic_k: prev_stochastic.as_ref().map(|s| s.k),
            prev_stochastic_d: prev_stochastic.as_ref().map(|s| s.d),
            volume_trend: calculate_volume_trend(&volumes, config.volume_lookback),
        }
    }
}
