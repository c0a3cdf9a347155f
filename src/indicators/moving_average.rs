/// Calculate Simple Moving Average (SMA) over the last `period` values
pub fn calculate_sma(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period {
        return None;
    }

    let sum: f64 = prices.iter().rev().take(period).sum();
    Some(sum / period as f64)
}

/// Calculate Exponential Moving Average (EMA) at the latest value
pub fn calculate_ema(prices: &[f64], period: usize) -> Option<f64> {
    ema_series(prices, period).last().copied()
}

/// EMA at every bar from the first full period onward.
///
/// Seeds with the SMA of the first `period` values, so the result has
/// `prices.len() - period + 1` entries; empty when the input is shorter
/// than `period`. The last entry lines up with the last input value.
pub fn ema_series(prices: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || prices.len() < period {
        return Vec::new();
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let seed: f64 = prices[..period].iter().sum::<f64>() / period as f64;

    let mut series = Vec::with_capacity(prices.len() - period + 1);
    series.push(seed);

    let mut ema = seed;
    for price in &prices[period..] {
        ema = (price - ema) * multiplier + ema;
        series.push(ema);
    }

    series
}
