use crate::models::Candle;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::str::FromStr;

/// Market shapes the synthetic feed can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketScenario {
    /// Steady climb with light noise (+2% daily average)
    TrendingUp,
    /// Steady decline with light noise (-2% daily average)
    TrendingDown,
    /// Mean-reverting chop around the starting price
    Ranging,
    /// Large swings (±5% per bar)
    Volatile,
}

impl FromStr for MarketScenario {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trending-up" | "up" => Ok(MarketScenario::TrendingUp),
            "trending-down" | "down" => Ok(MarketScenario::TrendingDown),
            "ranging" | "sideways" => Ok(MarketScenario::Ranging),
            "volatile" => Ok(MarketScenario::Volatile),
            other => Err(format!(
                "unknown scenario '{}' (expected trending-up, trending-down, ranging or volatile)",
                other
            )),
        }
    }
}

impl fmt::Display for MarketScenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MarketScenario::TrendingUp => "trending-up",
            MarketScenario::TrendingDown => "trending-down",
            MarketScenario::Ranging => "ranging",
            MarketScenario::Volatile => "volatile",
        };
        write!(f, "{}", name)
    }
}

/// Seeded random-walk candle source for a single symbol.
///
/// `backfill` produces history ending near the construction time and
/// `next_candle` keeps extending the same series bar by bar, so a live
/// paper session sees one continuous price path.
pub struct SyntheticSeries {
    rng: StdRng,
    scenario: MarketScenario,
    interval_minutes: i64,
    base_price: f64,
    base_volume: f64,
    current_price: f64,
    next_timestamp: DateTime<Utc>,
}

impl SyntheticSeries {
    pub fn new(scenario: MarketScenario, base_price: f64, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            scenario,
            interval_minutes: 5,
            base_price,
            base_volume: 1_000_000.0,
            current_price: base_price,
            next_timestamp: Utc::now(),
        }
    }

    pub fn with_interval_minutes(mut self, minutes: i64) -> Self {
        self.interval_minutes = minutes.max(1);
        self
    }

    /// Price of the most recently generated bar
    pub fn last_price(&self) -> f64 {
        self.current_price
    }

    /// Generate `num_candles` bars of history ending at the series cursor
    pub fn backfill(&mut self, num_candles: usize) -> Vec<Candle> {
        let start =
            self.next_timestamp - Duration::minutes(num_candles as i64 * self.interval_minutes);

        let mut candles = Vec::with_capacity(num_candles);
        for i in 0..num_candles {
            let timestamp = start + Duration::minutes(i as i64 * self.interval_minutes);
            let close = self.step();
            candles.push(self.make_candle(close, timestamp));
        }

        candles
    }

    /// Extend the series by one bar
    pub fn next_candle(&mut self) -> Candle {
        let timestamp = self.next_timestamp;
        self.next_timestamp = timestamp + Duration::minutes(self.interval_minutes);
        let close = self.step();
        self.make_candle(close, timestamp)
    }

    /// Advance the walk one bar and return the new close
    fn step(&mut self) -> f64 {
        match self.scenario {
            MarketScenario::TrendingUp => {
                let drift = self.current_price * self.drift_per_bar(0.02);
                let noise = self.current_price * self.rng.gen_range(-0.001..0.001);
                self.current_price += drift + noise;
            }
            MarketScenario::TrendingDown => {
                let drift = self.current_price * self.drift_per_bar(-0.02);
                let noise = self.current_price * self.rng.gen_range(-0.001..0.001);
                self.current_price += drift + noise;
            }
            MarketScenario::Ranging => {
                // 10% pull back toward the base keeps the chop bounded
                let reversion = (self.base_price - self.current_price) * 0.1;
                let noise = self.current_price * self.rng.gen_range(-0.01..0.01);
                self.current_price += reversion + noise;
            }
            MarketScenario::Volatile => {
                let change = self.current_price * self.rng.gen_range(-0.05..0.05);
                self.current_price += change;

                let floor = self.base_price * 0.5;
                if self.current_price < floor {
                    self.current_price = floor;
                }
            }
        }

        self.current_price
    }

    /// Convert a daily drift rate into a per-bar rate
    fn drift_per_bar(&self, daily: f64) -> f64 {
        daily / (24.0 * 60.0 / self.interval_minutes as f64)
    }

    /// Dress a close price into a full OHLCV bar
    fn make_candle(&mut self, close: f64, timestamp: DateTime<Utc>) -> Candle {
        let intrabar = 0.002; // ±0.2% wick room

        let high = close * (1.0 + self.rng.gen_range(0.0..intrabar));
        let low = close * (1.0 - self.rng.gen_range(0.0..intrabar));
        let open = (close * (1.0 + self.rng.gen_range(-intrabar..intrabar))).clamp(low, high);
        let volume = self.base_volume * self.rng.gen_range(0.7..1.3);

        Candle {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}
