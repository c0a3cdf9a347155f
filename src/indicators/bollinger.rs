use super::moving_average::calculate_sma;

/// Bollinger band levels at the latest bar
#[derive(Debug, Clone, PartialEq)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Calculate Bollinger Bands: SMA(period) ± k standard deviations of
/// the same window (population std-dev).
pub fn calculate_bollinger(prices: &[f64], period: usize, k: f64) -> Option<BollingerBands> {
    if period == 0 || prices.len() < period {
        return None;
    }

    let middle = calculate_sma(prices, period)?;
    let window = &prices[prices.len() - period..];
    let variance = window.iter().map(|p| (p - middle).powi(2)).sum::<f64>() / period as f64;
    let band = k * variance.sqrt();

    Some(BollingerBands {
        upper: middle + band,
        middle,
        lower: middle - band,
    })
}
