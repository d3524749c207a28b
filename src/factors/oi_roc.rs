use super::common::{percent_change_over, FactorResult};
use crate::store::types::SeriesPoint;

pub fn oi_roc(oi: &[SeriesPoint], price: &[SeriesPoint], now_ms: i64) -> FactorResult {
    let oi_4h = match percent_change_over(oi, now_ms, 4 * 3_600_000) {
        Some(v) => v,
        None => return FactorResult::insufficient_data(),
    };
    let price_4h = match percent_change_over(price, now_ms, 4 * 3_600_000) {
        Some(v) => v,
        None => return FactorResult::insufficient_data(),
    };

    if oi_4h > 1.0 && price_4h > 0.5 {
        FactorResult::new(0.8, "OI_PRICE_CONFIRM_BULL")
    } else if oi_4h > 0.5 && oi_4h <= 1.0 && price_4h > 0.0 {
        FactorResult::new(0.5, "OI_PRICE_LEAN_BULL")
    } else if oi_4h > 1.0 && price_4h < -0.5 {
        FactorResult::new(-0.7, "TRAPPED_LONGS")
    } else if oi_4h < -1.0 && price_4h < -0.5 {
        FactorResult::new(-0.8, "OI_PRICE_CONFIRM_BEAR")
    } else {
        FactorResult::new(0.0, "NEUTRAL")
    }
}
