use crate::models::Candle;

/// Stochastic oscillator values at the latest bar
#[derive(Debug, Clone, PartialEq)]
pub struct Stochastic {
    pub k: f64,
    pub d: f64,
}

/// Calculate the Stochastic Oscillator
///
/// %K places the latest close inside the high/low range of the last
/// `period` bars; %D is the SMA of the last `smoothing` %K values, so
/// the minimum window is `period + smoothing - 1` bars. A flat range
/// pins %K at 50.
pub fn calculate_stochastic(
    candles: &[Candle],
    period: usize,
    smoothing: usize,
) -> Option<Stochastic> {
    if period == 0 || smoothing == 0 || candles.len() < period + smoothing - 1 {
        return None;
    }

    let mut k_values = Vec::with_capacity(smoothing);
    for end in (candles.len() - smoothing + 1)..=candles.len() {
        let window = &candles[end - period..end];
        let high = window.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
        let low = window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
        let close = candles[end - 1].close;

        let k = if high > low {
            (close - low) / (high - low) * 100.0
        } else {
            50.0
        };
        k_values.push(k);
    }

    let k = *k_values.last()?;
    let d = k_values.iter().sum::<f64>() / k_values.len() as f64;
    Some(Stochastic { k, d })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn candle(high: f64, low: f64, close: f64) -> Candle {
        Candle {
            timestamp: Utc::now(),
            open: close,
            high,
            low,
            close,
            volume: 1000.0,
        }
    }

    #[test]
    fn test_stochastic_close_at_range_top() {
        let mut candles: Vec<Candle> = (0..16).map(|_| candle(110.0, 90.0, 100.0)).collect();
        if let Some(last) = candles.last_mut() {
            last.close = 110.0;
        }
        let stoch = calculate_stochastic(&candles, 14, 3).unwrap();
        assert_eq!(stoch.k, 100.0);
        assert!(stoch.d < stoch.k); // earlier %K values drag %D down
    }

    #[test]
    fn test_stochastic_close_at_range_bottom() {
        let mut candles: Vec<Candle> = (0..16).map(|_| candle(110.0, 90.0, 100.0)).collect();
        if let Some(last) = candles.last_mut() {
            last.close = 90.0;
        }
        let stoch = calculate_stochastic(&candles, 14, 3).unwrap();
        assert_eq!(stoch.k, 0.0);
    }

    #[test]
    fn test_stochastic_flat_range_reads_midline() {
        let candles: Vec<Candle> = (0..16).map(|_| candle(100.0, 100.0, 100.0)).collect();
        let stoch = calculate_stochastic(&candles, 14, 3).unwrap();
        assert_eq!(stoch.k, 50.0);
        assert_eq!(stoch.d, 50.0);
    }

    #[test]
    fn test_stochastic_insufficient_data() {
        let candles: Vec<Candle> = (0..15).map(|_| candle(110.0, 90.0, 100.0)).collect();
        assert!(calculate_stochastic(&candles, 14, 3).is_none()); // needs 16
    }
}
