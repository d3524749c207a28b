use super::common::{classify_trend, cvd_weak_threshold_usd, FactorResult, Trend};

pub fn spot_perp_divergence(spot_cvd_6h: f64, perp_cvd_6h: f64, coin: &str) -> FactorResult {
    let weak = cvd_weak_threshold_usd(coin);
    let spot = classify_trend(spot_cvd_6h, weak);
    let perp = classify_trend(perp_cvd_6h, weak);

    if spot == Trend::Up && perp == Trend::Down {
        return FactorResult::new(0.75, "CAPITULATION_BOTTOM");
    }
    if perp == Trend::Up && spot == Trend::Down {
        return FactorResult::new(-0.85, "FAKE_PUMP");
    }
    if spot == Trend::Up && perp != Trend::Up {
        return FactorResult::new(0.85, "SPOT_ACCUMULATION");
    }
    if spot == Trend::Down && perp != Trend::Down {
        return FactorResult::new(-0.70, "DISTRIBUTION");
    }
    if spot == perp && spot != Trend::Flat {
        let sign = if spot == Trend::Up { 0.50 } else { -0.50 };
        return FactorResult::new(sign, "ALIGNED");
    }
    FactorResult::new(0.0, "NEUTRAL")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s2_capitulation_bottom() {
        let result = spot_perp_divergence(60_000_000.0, -40_000_000.0, "BTC");
        assert_eq!(result.label, "CAPITULATION_BOTTOM");
        assert!((result.score - 0.75).abs() < 1e-9);
    }
}
