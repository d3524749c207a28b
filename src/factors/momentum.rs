use super::common::{percent_change_over, FactorResult};
use crate::store::types::SeriesPoint;

/// Momentum: weighted percent change over 5m / 30m / 4h windows, saturating at ±5%.
pub fn momentum(price: &[SeriesPoint], now_ms: i64) -> FactorResult {
    if price.len() < 2 {
        return FactorResult::insufficient_data();
    }
    let d5m = percent_change_over(price, now_ms, 5 * 60_000);
    let d30m = percent_change_over(price, now_ms, 30 * 60_000);
    let d4h = percent_change_over(price, now_ms, 4 * 3_600_000);

    let (d5m, d30m, d4h) = match (d5m, d30m, d4h) {
        (Some(a), Some(b), Some(c)) => (a, b, c),
        _ => return FactorResult::insufficient_data(),
    };

    let raw = 0.1 * d5m + 0.3 * d30m + 0.6 * d4h;
    FactorResult::new(raw / 5.0, "MOMENTUM")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(vals: &[(i64, f64)]) -> Vec<SeriesPoint> {
        vals.iter()
            .map(|(t, v)| SeriesPoint { timestamp_ms: *t, value: *v })
            .collect()
    }

    #[test]
    fn flat_price_is_zero_momentum() {
        let now = 10_000_000;
        let price = pts(&[(now - 4 * 3_600_000, 50_000.0), (now, 50_000.0)]);
        let result = momentum(&price, now);
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn saturates_at_five_percent() {
        let now = 10_000_000;
        let price = pts(&[(now - 4 * 3_600_000, 40_000.0), (now, 50_000.0)]);
        let result = momentum(&price, now);
        assert!(result.score <= 1.0 && result.score > 0.9);
    }
}
