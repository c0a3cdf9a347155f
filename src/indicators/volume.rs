/// Latest volume over its rolling average (window includes the latest
/// bar). Above 1.0 means trading is running hotter than usual.
///
/// Returns None on a short window or an all-zero average, so a dead
/// market cannot masquerade as confirmation.
pub fn calculate_volume_trend(volumes: &[f64], lookback: usize) -> Option<f64> {
    if lookback == 0 || volumes.len() < lookback {
        return None;
    }

    let avg: f64 = volumes.iter().rev().take(lookback).sum::<f64>() / lookback as f64;
    if avg <= 0.0 {
        return None;
    }

    let latest = *volumes.last()?;
    Some(latest / avg)
}
