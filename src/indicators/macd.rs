use super::moving_average::ema_series;

/// MACD values at the latest bar
#[derive(Debug, Clone, PartialEq)]
pub struct Macd {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Calculate Moving Average Convergence Divergence (MACD)
///
/// Line = EMA(fast) - EMA(slow) of close; signal = EMA(signal_period)
/// of the line; histogram = line - signal. The line first exists at bar
/// `slow`, and the signal needs `signal_period` line values, so the
/// minimum window is `slow + signal_period - 1` bars.
pub fn calculate_macd(
    prices: &[f64],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> Option<Macd> {
    if fast == 0 || signal_period == 0 || fast >= slow {
        return None;
    }
    if prices.len() < slow + signal_period - 1 {
        return None;
    }

    let fast_series = ema_series(prices, fast);
    let slow_series = ema_series(prices, slow);

    // Both series end at the latest bar; trim the fast one's head so
    // they pair up
    let offset = fast_series.len() - slow_series.len();
    let line_series: Vec<f64> = fast_series[offset..]
        .iter()
        .zip(slow_series.iter())
        .map(|(f, s)| f - s)
        .collect();

    let signal_series = ema_series(&line_series, signal_period);

    let line = *line_series.last()?;
    let signal = *signal_series.last()?;
    Some(Macd {
        line,
        signal,
        histogram: line - signal,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_macd_positive_on_uptrend() {
        let prices: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let macd = calculate_macd(&prices, 12, 26, 9).unwrap();
        assert!(macd.line > 0.0);
        assert!(macd.signal > 0.0);
    }

    #[test]
    fn test_macd_negative_on_downtrend() {
        let prices: Vec<f64> = (0..60).map(|i| 200.0 - i as f64).collect();
        let macd = calculate_macd(&prices, 12, 26, 9).unwrap();
        assert!(macd.line < 0.0);
    }

    #[test]
    fn test_macd_histogram_is_line_minus_signal() {
        let prices: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.3).sin() * 5.0).collect();
        let macd = calculate_macd(&prices, 12, 26, 9).unwrap();
        assert!((macd.histogram - (macd.line - macd.signal)).abs() < 1e-12);
    }

    #[test]
    fn test_macd_warmup_boundary() {
        // 26 + 9 - 1 = 34 bars is the exact minimum for 12/26/9
        let prices: Vec<f64> = (0..33).map(|i| 100.0 + i as f64).collect();
        assert!(calculate_macd(&prices, 12, 26, 9).is_none());

        let prices: Vec<f64> = (0..34).map(|i| 100.0 + i as f64).collect();
        assert!(calculate_macd(&prices, 12, 26, 9).is_some());
    }

    #[test]
    fn test_macd_rejects_degenerate_periods() {
        let prices: Vec<f64> = (0..60).map(|i| i as f64).collect();
        assert!(calculate_macd(&prices, 26, 12, 9).is_none());
        assert!(calculate_macd(&prices, 0, 26, 9).is_none());
    }
}
