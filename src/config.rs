use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Runtime configuration. Loaded once from the environment, then only
/// replaced wholesale through `with_patch` so a cycle never observes a
/// half-updated value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Capital and risk policy
    pub investment_amount: f64,
    pub max_position_size: f64, // fraction of available balance, (0, 1]
    pub stop_loss_percentage: f64,
    pub take_profit_percentage: f64,
    pub max_daily_trades: u32,
    pub max_daily_loss: f64,
    pub cooldown_period_secs: u64,
    pub trading_pairs: Vec<String>,
    pub quote_currency: String,

    // Indicator parameters
    pub rsi_period: usize,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bollinger_period: usize,
    pub bollinger_k: f64,
    pub stochastic_period: usize,
    pub stochastic_smoothing: usize,
    pub sma_short_period: usize,
    pub sma_long_period: usize,
    pub volume_lookback: usize,

    // Signal voting
    pub min_vote_quorum: usize,

    // Decision loop cadence
    pub cycle_interval_secs: u64,
    pub candle_lookback: usize,

    // Daily counter rollover: hours added to UTC before taking the date
    pub day_boundary_offset_hours: i32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            investment_amount: 100.0,
            max_position_size: 0.1,
            stop_loss_percentage: 5.0,
            take_profit_percentage: 15.0,
            max_daily_trades: 10,
            max_daily_loss: 50.0,
            cooldown_period_secs: 3600,
            trading_pairs: vec![
                "KSM/USD".to_string(),
                "SUI/USD".to_string(),
                "DOT/USD".to_string(),
                "ETH/USD".to_string(),
            ],
            quote_currency: "USD".to_string(),
            rsi_period: 14,
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            bollinger_period: 20,
            bollinger_k: 2.0,
            stochastic_period: 14,
            stochastic_smoothing: 3,
            sma_short_period: 20,
            sma_long_period: 50,
            volume_lookback: 20,
            min_vote_quorum: 3,
            cycle_interval_secs: 300,
            candle_lookback: 100,
            day_boundary_offset_hours: 0,
        }
    }
}

fn env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Build a config from environment variables, falling back to the
    /// defaults above. Call `validate` on the result before use.
    pub fn from_env() -> Result<Self, EngineError> {
        let base = Self::default();
        let config = Self {
            investment_amount: env_f64("INVESTMENT_AMOUNT", base.investment_amount),
            max_position_size: env_f64("MAX_POSITION_SIZE", base.max_position_size),
            stop_loss_percentage: env_f64("STOP_LOSS_PERCENTAGE", base.stop_loss_percentage),
            take_profit_percentage: env_f64(
                "TAKE_PROFIT_PERCENTAGE",
                base.take_profit_percentage,
            ),
            max_daily_trades: env_u64("MAX_DAILY_TRADES", base.max_daily_trades as u64) as u32,
            max_daily_loss: env_f64("MAX_DAILY_LOSS", base.max_daily_loss),
            cooldown_period_secs: env_u64("COOLDOWN_PERIOD", base.cooldown_period_secs),
            trading_pairs: std::env::var("TRADING_PAIRS")
                .map(|raw| {
                    raw.split(',')
                        .map(|p| p.trim().to_string())
                        .filter(|p| !p.is_empty())
                        .collect()
                })
                .unwrap_or(base.trading_pairs),
            quote_currency: std::env::var("QUOTE_CURRENCY").unwrap_or(base.quote_currency),
            cycle_interval_secs: env_u64("CYCLE_INTERVAL", base.cycle_interval_secs),
            candle_lookback: env_u64("CANDLE_LOOKBACK", base.candle_lookback as u64) as usize,
            ..base
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject out-of-range parameters before they can take effect.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.max_position_size <= 0.0 || self.max_position_size > 1.0 {
            return Err(EngineError::Config(format!(
                "max_position_size must be in (0, 1], got {}",
                self.max_position_size
            )));
        }
        if self.investment_amount < 0.0 {
            return Err(EngineError::Config(
                "investment_amount must be non-negative".to_string(),
            ));
        }
        if self.stop_loss_percentage < 0.0 || self.stop_loss_percentage >= 100.0 {
            return Err(EngineError::Config(format!(
                "stop_loss_percentage must be in [0, 100), got {}",
                self.stop_loss_percentage
            )));
        }
        if self.take_profit_percentage < 0.0 {
            return Err(EngineError::Config(
                "take_profit_percentage must be non-negative".to_string(),
            ));
        }
        if self.max_daily_loss < 0.0 {
            return Err(EngineError::Config(
                "max_daily_loss must be non-negative".to_string(),
            ));
        }
        if self.trading_pairs.is_empty() {
            return Err(EngineError::Config(
                "trading_pairs must not be empty".to_string(),
            ));
        }
        if self.macd_fast >= self.macd_slow {
            return Err(EngineError::Config(format!(
                "macd_fast ({}) must be below macd_slow ({})",
                self.macd_fast, self.macd_slow
            )));
        }
        if self.sma_short_period >= self.sma_long_period {
            return Err(EngineError::Config(format!(
                "sma_short_period ({}) must be below sma_long_period ({})",
                self.sma_short_period, self.sma_long_period
            )));
        }
        if self.min_vote_quorum == 0 {
            return Err(EngineError::Config(
                "min_vote_quorum must be at least 1".to_string(),
            ));
        }
        if self.cycle_interval_secs == 0 {
            return Err(EngineError::Config(
                "cycle_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.candle_lookback < self.min_candles() {
            return Err(EngineError::Config(format!(
                "candle_lookback ({}) is below the longest indicator warmup ({})",
                self.candle_lookback,
                self.min_candles()
            )));
        }
        Ok(())
    }

    /// Candles required before every indicator in the snapshot is defined.
    pub fn min_candles(&self) -> usize {
        [
            self.rsi_period + 1,
            self.macd_slow + self.macd_signal,
            self.bollinger_period,
            self.stochastic_period + self.stochastic_smoothing - 1,
            self.sma_long_period,
            self.volume_lookback,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }

    /// Merge a partial update into a validated candidate. The caller
    /// swaps the candidate in only on `Ok`; on `Err` the current config
    /// stays untouched.
    pub fn with_patch(&self, patch: &ConfigPatch) -> Result<Config, EngineError> {
        let mut candidate = self.clone();
        if let Some(v) = patch.investment_amount {
            candidate.investment_amount = v;
        }
        if let Some(v) = patch.max_position_size {
            candidate.max_position_size = v;
        }
        if let Some(v) = patch.stop_loss_percentage {
            candidate.stop_loss_percentage = v;
        }
        if let Some(v) = patch.take_profit_percentage {
            candidate.take_profit_percentage = v;
        }
        if let Some(v) = patch.max_daily_trades {
            candidate.max_daily_trades = v;
        }
        if let Some(v) = patch.max_daily_loss {
            candidate.max_daily_loss = v;
        }
        if let Some(v) = patch.cooldown_period_secs {
            candidate.cooldown_period_secs = v;
        }
        if let Some(pairs) = &patch.trading_pairs {
            candidate.trading_pairs = pairs.clone();
        }
        candidate.validate()?;
        Ok(candidate)
    }
}

/// Partial config update accepted from the control surface. Absent
/// fields keep their current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigPatch {
    pub investment_amount: Option<f64>,
    pub max_position_size: Option<f64>,
    pub stop_loss_percentage: Option<f64>,
    pub take_profit_percentage: Option<f64>,
    pub max_daily_trades: Option<u32>,
    pub max_daily_loss: Option<f64>,
    pub cooldown_period_secs: Option<u64>,
    pub trading_pairs: Option<Vec<String>>,
}

impl ConfigPatch {
    pub fn is_empty(&self) -> bool {
        self.investment_amount.is_none()
            && self.max_position_size.is_none()
            && self.stop_loss_percentage.is_none()
            && self.take_profit_percentage.is_none()
            && self.max_daily_trades.is_none()
            && self.max_daily_loss.is_none()
            && self.cooldown_period_secs.is_none()
            && self.trading_pairs.is_none()
    }
}
