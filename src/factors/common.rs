use crate::store::types::SeriesPoint;

/// Every factor returns a score in [-1, 1] plus a human-readable label, never
/// performing I/O: callers clone the relevant store slice under the lock first.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorResult {
    pub score: f64,
    pub label: String,
}

impl FactorResult {
    pub fn new(score: f64, label: impl Into<String>) -> Self {
        Self {
            score: score.clamp(-1.0, 1.0),
            label: label.into(),
        }
    }

    pub fn insufficient_data() -> Self {
        Self::new(0.0, "INSUFFICIENT_DATA")
    }
}

/// Percent change between the first point at or after `window_start_ms` and
/// the latest point, or `None` if no point is old enough to anchor the window.
pub fn percent_change_over(points: &[SeriesPoint], now_ms: i64, window_ms: i64) -> Option<f64> {
    let latest = points.last()?;
    let window_start = now_ms - window_ms;
    let anchor = points.iter().find(|p| p.timestamp_ms >= window_start)?;
    if anchor.value == 0.0 {
        return None;
    }
    Some((latest.value - anchor.value) / anchor.value * 100.0)
}

pub fn sum_since(points: &[SeriesPoint], now_ms: i64, window_ms: i64) -> f64 {
    let cutoff = now_ms - window_ms;
    points.iter().filter(|p| p.timestamp_ms >= cutoff).map(|p| p.value).sum()
}

/// Per-coin scale used to normalise CVD-family factors. Consolidates the
/// legacy dual BTC constants (the 12h code's flat $10M and the 4h code's
/// coin-scaled table) into one table, per the open question in the design notes.
pub fn cvd_strong_scale_usd(coin: &str) -> f64 {
    match coin.to_uppercase().as_str() {
        "BTC" => 10_000_000.0,
        "ETH" => 5_000_000.0,
        "SOL" => 2_000_000.0,
        _ => 1_000_000.0,
    }
}

pub fn cvd_weak_threshold_usd(coin: &str) -> f64 {
    cvd_strong_scale_usd(coin) * 0.2
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Up,
    Flat,
    Down,
}

pub fn classify_trend(value: f64, weak_threshold: f64) -> Trend {
    if value > weak_threshold {
        Trend::Up
    } else if value < -weak_threshold {
        Trend::Down
    } else {
        Trend::Flat
    }
}
