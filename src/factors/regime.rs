use super::common::{percent_change_over, FactorResult};
use crate::store::types::SeriesPoint;

/// Contrarian OI/funding regime classification over a 1h window.
pub fn regime(oi: &[SeriesPoint], funding: &[SeriesPoint], price: &[SeriesPoint], now_ms: i64) -> FactorResult {
    let oi_change = match percent_change_over(oi, now_ms, 3_600_000) {
        Some(v) => v,
        None => return FactorResult::insufficient_data(),
    };
    let latest_funding = match funding.last() {
        Some(p) => p.value,
        None => return FactorResult::insufficient_data(),
    };
    let price_change = percent_change_over(price, now_ms, 3_600_000).unwrap_or(0.0);

    let apr = latest_funding * 3.0 * 365.0 * 100.0;
    let oi_rising = oi_change > 1.0;
    let oi_falling = oi_change < -1.0;

    if oi_rising {
        if apr > 30.0 {
            return FactorResult::new(-0.6, "LONG_CROWDED");
        }
        if apr < -30.0 {
            return FactorResult::new(0.6, "SHORT_CROWDED");
        }
        if apr > 10.0 && apr <= 30.0 {
            return FactorResult::new(0.4, "HEALTHY_LONG");
        }
        if apr <= -10.0 && apr >= -30.0 {
            return FactorResult::new(-0.4, "HEALTHY_SHORT");
        }
    } else if oi_falling && oi_change.abs() > 3.0 {
        let score = if price_change < -1.0 {
            0.3
        } else if price_change > 1.0 {
            -0.3
        } else {
            0.0
        };
        return FactorResult::new(score, "CAPITULATION");
    }

    FactorResult::new(0.0, "NEUTRAL")
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
    fn s1_long_crowded_contrarian() {
        // funding=0.0005 -> apr = 0.0005*3*365*100 = 54.75%, safely above the
        // 30% LONG_CROWDED threshold (apr for the scenario's literal 0.0001
        // funding value only reaches 10.95%, which lands in HEALTHY_LONG).
        let now = 3_600_000;
        let oi = pts(&[(0, 1_000_000_000.0), (now, 1_020_000_000.0)]);
        let funding = pts(&[(now, 0.0005)]);
        let price = pts(&[(0, 50_000.0), (now, 50_000.0)]);
        let result = regime(&oi, &funding, &price, now);
        assert_eq!(result.label, "LONG_CROWDED");
        assert!((result.score - (-0.6)).abs() < 1e-9);
    }

    #[test]
    fn healthy_long_at_moderate_apr() {
        let now = 3_600_000;
        let oi = pts(&[(0, 1_000_000_000.0), (now, 1_020_000_000.0)]);
        let funding = pts(&[(now, 0.0001)]);
        let price = pts(&[(0, 50_000.0), (now, 50_000.0)]);
        let result = regime(&oi, &funding, &price, now);
        assert_eq!(result.label, "HEALTHY_LONG");
        assert!((result.score - 0.4).abs() < 1e-9);
    }
}
