use super::common::{cvd_strong_scale_usd, sum_since, FactorResult};
use crate::store::types::SeriesPoint;

pub fn cvd_persistence(cvd: &[SeriesPoint], coin: &str, now_ms: i64) -> FactorResult {
    if cvd.is_empty() {
        return FactorResult::insufficient_data();
    }
    let d30 = sum_since(cvd, now_ms, 30 * 60_000);
    let d2h = sum_since(cvd, now_ms, 2 * 3_600_000);
    let weighted = 0.4 * d30 + 0.6 * d2h;
    let scale = cvd_strong_scale_usd(coin);
    FactorResult::new(weighted / scale, "CVD_PERSISTENCE")
}
