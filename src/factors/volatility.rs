use crate::store::types::SeriesPoint;

pub struct VolatilityResult {
    pub range_pct: f64,
    pub high: bool,
}

/// 4h price range relative to the 4h average price.
pub fn volatility(price: &[SeriesPoint], now_ms: i64) -> Option<VolatilityResult> {
    let cutoff = now_ms - 4 * 3_600_000;
    let window: Vec<f64> = price.iter().filter(|p| p.timestamp_ms >= cutoff).map(|p| p.value).collect();
    if window.is_empty() {
        return None;
    }
    let max = window.iter().cloned().fold(f64::MIN, f64::max);
    let min = window.iter().cloned().fold(f64::MAX, f64::min);
    let avg = window.iter().sum::<f64>() / window.len() as f64;
    if avg == 0.0 {
        return None;
    }
    let range_pct = (max - min) / avg * 100.0;
    Some(VolatilityResult {
        range_pct,
        high: range_pct > 3.0,
    })
}
