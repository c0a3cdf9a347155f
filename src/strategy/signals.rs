use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::Config;
use crate::indicators::IndicatorSnapshot;
use crate::models::{Direction, Signal};

/// One indicator's opinion on the latest bar
#[derive(Debug, Clone, Copy, PartialEq)]
enum Vote {
    Buy,
    Sell,
    Neutral,
}

/// Reduces an indicator snapshot to a directional signal by majority
/// vote.
///
/// Five voters: RSI thresholds, MACD histogram sign change, close vs
/// Bollinger bands, stochastic %K/%D crossing, and the SMA 20/50 trend.
/// An indicator whose snapshot fields are missing simply does not vote.
/// Strength is the share of usable voters agreeing with the majority;
/// below-average volume scales strength toward zero but never flips
/// the direction. Fewer usable voters than the quorum, or a buy/sell
/// tie, yields HOLD.
#[derive(Debug, Clone)]
pub struct SignalGenerator {
    rsi_oversold: f64,
    rsi_overbought: f64,
    min_quorum: usize,
}

impl SignalGenerator {
    pub fn new(config: &Config) -> Self {
        Self {
            rsi_oversold: config.rsi_oversold,
            rsi_overbought: config.rsi_overbought,
            min_quorum: config.min_vote_quorum,
        }
    }

    /// Evaluate one snapshot into a fresh Signal.
    pub fn evaluate(
        &self,
        symbol: &str,
        snapshot: &IndicatorSnapshot,
        now: DateTime<Utc>,
    ) -> Signal {
        let votes = [
            self.rsi_vote(snapshot),
            self.macd_vote(snapshot),
            self.bollinger_vote(snapshot),
            self.stochastic_vote(snapshot),
            self.trend_vote(snapshot),
        ];

        let usable: Vec<Vote> = votes.into_iter().flatten().collect();
        if usable.len() < self.min_quorum {
            debug!(
                "{}: only {}/{} indicators usable, holding",
                symbol,
                usable.len(),
                votes.len()
            );
            return Signal::hold(symbol, now);
        }

        let buys = usable.iter().filter(|v| **v == Vote::Buy).count();
        let sells = usable.iter().filter(|v| **v == Vote::Sell).count();

        let (direction, agreeing) = if buys > sells {
            (Direction::Buy, buys)
        } else if sells > buys {
            (Direction::Sell, sells)
        } else {
            debug!("{}: vote tie {} buy / {} sell, holding", symbol, buys, sells);
            return Signal::hold(symbol, now);
        };

        let mut strength = agreeing as f64 / usable.len() as f64;

        // Thin volume drains conviction; it never flips the direction
        if let Some(trend) = snapshot.volume_trend {
            if trend < 1.0 {
                strength *= trend.max(0.0);
            }
        }

        debug!(
            "{}: {} buy / {} sell of {} usable → {} ({:.2})",
            symbol,
            buys,
            sells,
            usable.len(),
            direction,
            strength
        );

        Signal {
            symbol: symbol.to_string(),
            direction,
            strength,
            timestamp: now,
        }
    }

    fn rsi_vote(&self, s: &IndicatorSnapshot) -> Option<Vote> {
        let rsi = s.rsi?;
        Some(if rsi < self.rsi_oversold {
            Vote::Buy
        } else if rsi > self.rsi_overbought {
            Vote::Sell
        } else {
            Vote::Neutral
        })
    }

    fn macd_vote(&self, s: &IndicatorSnapshot) -> Option<Vote> {
        let histogram = s.macd_histogram?;
        let prev = s.prev_macd_histogram?;
        Some(if prev <= 0.0 && histogram > 0.0 {
            Vote::Buy
        } else if prev >= 0.0 && histogram < 0.0 {
            Vote::Sell
        } else {
            Vote::Neutral
        })
    }

    fn bollinger_vote(&self, s: &IndicatorSnapshot) -> Option<Vote> {
        let upper = s.bollinger_upper?;
        let lower = s.bollinger_lower?;
        Some(if s.close < lower {
            Vote::Buy
        } else if s.close > upper {
            Vote::Sell
        } else {
            Vote::Neutral
        })
    }

    fn stochastic_vote(&self, s: &IndicatorSnapshot) -> Option<Vote> {
        let k = s.stochastic_k?;
        let d = s.stochastic_d?;
        let prev_k = s.prev_stochastic_k?;
        let prev_d = s.prev_stochastic_d?;
        Some(if prev_k <= prev_d && k > d {
            Vote::Buy
        } else if prev_k >= prev_d && k < d {
            Vote::Sell
        } else {
            Vote::Neutral
        })
    }

    fn trend_vote(&self, s: &IndicatorSnapshot) -> Option<Vote> {
        let short = s.sma_20?;
        let long = s.sma_50?;
        Some(if short > long {
            Vote::Buy
        } else if short < long {
            Vote::Sell
        } else {
            Vote::Neutral
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator() -> SignalGenerator {
        SignalGenerator::new(&Config::default())
    }

    /// Oversold across the board: RSI 25, MACD histogram just turned
    /// positive, close under the lower band, %K crossing %D from below.
    fn buy_confluence() -> IndicatorSnapshot {
        IndicatorSnapshot {
            close: 95.0,
            rsi: Some(25.0),
            macd_histogram: Some(0.4),
            prev_macd_histogram: Some(-0.2),
            bollinger_upper: Some(106.0),
            bollinger_middle: Some(101.0),
            bollinger_lower: Some(96.0),
            stochastic_k: Some(22.0),
            stochastic_d: Some(18.0),
            prev_stochastic_k: Some(12.0),
            prev_stochastic_d: Some(15.0),
            sma_20: Some(100.0),
            sma_50: Some(99.0),
            volume_trend: Some(1.2),
            ..Default::default()
        }
    }

    #[test]
    fn test_oversold_confluence_generates_strong_buy() {
        let signal = generator().evaluate("ETH/USD", &buy_confluence(), Utc::now());
        assert_eq!(signal.direction, Direction::Buy);
        assert!(
            signal.strength >= 0.75,
            "expected at least 3/4 agreement, got {}",
            signal.strength
        );
    }

    #[test]
    fn test_overbought_confluence_generates_sell() {
        let snapshot = IndicatorSnapshot {
            close: 107.0,
            rsi: Some(78.0),
            macd_histogram: Some(-0.3),
            prev_macd_histogram: Some(0.1),
            bollinger_upper: Some(106.0),
            bollinger_middle: Some(101.0),
            bollinger_lower: Some(96.0),
            stochastic_k: Some(80.0),
            stochastic_d: Some(85.0),
            prev_stochastic_k: Some(92.0),
            prev_stochastic_d: Some(90.0),
            sma_20: Some(100.0),
            sma_50: Some(103.0),
            volume_trend: Some(1.0),
            ..Default::default()
        };
        let signal = generator().evaluate("ETH/USD", &snapshot, Utc::now());
        assert_eq!(signal.direction, Direction::Sell);
        assert_eq!(signal.strength, 1.0);
    }

    #[test]
    fn test_vote_tie_holds() {
        // RSI says buy, MACD says sell, everything else neutral
        let snapshot = IndicatorSnapshot {
            close: 100.0,
            rsi: Some(25.0),
            macd_histogram: Some(-0.3),
            prev_macd_histogram: Some(0.1),
            bollinger_upper: Some(106.0),
            bollinger_lower: Some(96.0),
            stochastic_k: Some(50.0),
            stochastic_d: Some(50.0),
            prev_stochastic_k: Some(50.0),
            prev_stochastic_d: Some(50.0),
            sma_20: Some(100.0),
            sma_50: Some(100.0),
            ..Default::default()
        };
        let signal = generator().evaluate("DOT/USD", &snapshot, Utc::now());
        assert_eq!(signal.direction, Direction::Hold);
        assert_eq!(signal.strength, 0.0);
    }

    #[test]
    fn test_below_quorum_holds_even_on_agreement() {
        // Only RSI and Bollinger usable; both vote buy, but 2 < quorum 3
        let snapshot = IndicatorSnapshot {
            close: 90.0,
            rsi: Some(20.0),
            bollinger_upper: Some(106.0),
            bollinger_lower: Some(96.0),
            ..Default::default()
        };
        let signal = generator().evaluate("SUI/USD", &snapshot, Utc::now());
        assert_eq!(signal.direction, Direction::Hold);
    }

    #[test]
    fn test_missing_indicator_excluded_from_denominator() {
        // Stochastic unusable: 4 voters left, 3 buy + 1 neutral trend
        let mut snapshot = buy_confluence();
        snapshot.stochastic_k = None;
        snapshot.sma_20 = Some(100.0);
        snapshot.sma_50 = Some(100.0);
        snapshot.volume_trend = Some(1.0);

        let signal = generator().evaluate("KSM/USD", &snapshot, Utc::now());
        assert_eq!(signal.direction, Direction::Buy);
        assert_eq!(signal.strength, 0.75);
    }

    #[test]
    fn test_weak_volume_scales_strength_not_direction() {
        let mut snapshot = buy_confluence();
        snapshot.volume_trend = Some(0.5);

        let strong = generator().evaluate("ETH/USD", &buy_confluence(), Utc::now());
        let damped = generator().evaluate("ETH/USD", &snapshot, Utc::now());

        assert_eq!(damped.direction, Direction::Buy);
        assert!((damped.strength - strong.strength * 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_hot_volume_does_not_inflate_strength() {
        let mut snapshot = buy_confluence();
        snapshot.volume_trend = Some(3.0);

        let baseline = generator().evaluate("ETH/USD", &buy_confluence(), Utc::now());
        let hot = generator().evaluate("ETH/USD", &snapshot, Utc::now());
        assert_eq!(hot.strength, baseline.strength);
    }

    #[test]
    fn test_empty_snapshot_holds() {
        let signal = generator().evaluate("ETH/USD", &IndicatorSnapshot::default(), Utc::now());
        assert_eq!(signal.direction, Direction::Hold);
        assert_eq!(signal.strength, 0.0);
    }
}
