use super::common::FactorResult;
use crate::store::types::SeriesPoint;

const PERIODS_90D: usize = 2160; // 90 days of 8h settlements
const PERIODS_30D: usize = 720;

struct Thresholds {
    extreme: f64,
    high: f64,
    moderate: f64,
}

fn thresholds_for(sample_count: usize) -> Thresholds {
    if sample_count >= PERIODS_90D {
        Thresholds { extreme: 2.5, high: 2.0, moderate: 1.5 }
    } else if sample_count >= PERIODS_30D {
        Thresholds { extreme: 3.0, high: 2.5, moderate: 2.0 }
    } else {
        Thresholds { extreme: 3.5, high: 3.0, moderate: 2.5 }
    }
}

pub fn funding_zscore(funding: &[SeriesPoint]) -> FactorResult {
    if funding.len() < 2 {
        return FactorResult::insufficient_data();
    }
    let current = funding.last().unwrap().value;
    let values: Vec<f64> = funding.iter().map(|p| p.value).collect();
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    let stddev = variance.sqrt();
    if stddev == 0.0 {
        return FactorResult::new(0.0, "FUNDING_FLAT");
    }
    let z = (current - mean) / stddev;
    let t = thresholds_for(values.len());

    let (score, label) = if z >= t.extreme {
        (-0.9, "extreme_long_bias")
    } else if z >= t.high {
        (-0.65, "high_long_bias")
    } else if z >= t.moderate {
        (-0.35, "moderate_long_bias")
    } else if z <= -t.extreme {
        (0.9, "extreme_short_bias")
    } else if z <= -t.high {
        (0.65, "high_short_bias")
    } else if z <= -t.moderate {
        (0.35, "moderate_short_bias")
    } else {
        (0.0, "neutral")
    };
    FactorResult::new(score, label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s4_funding_extreme_contrarian() {
        let mut funding: Vec<SeriesPoint> = (0..90)
            .map(|i| SeriesPoint { timestamp_ms: i * 8 * 3_600_000, value: 0.0001 })
            .collect();
        funding.push(SeriesPoint { timestamp_ms: 91 * 8 * 3_600_000, value: 0.0005 });
        let result = funding_zscore(&funding);
        assert_eq!(result.label, "extreme_long_bias");
        assert!((result.score - (-0.9)).abs() < 1e-9);
    }
}
