pub const PRICE_OI_CVD_TARGET_POINTS: usize = 288; // 24h at 5 min spacing
pub const FUNDING_TARGET_POINTS: usize = 720; // 30 days at 8h settlement

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletenessBand {
    WarmingUp,
    Low,
    Medium,
    Full,
}

#[derive(Debug, Clone, Copy)]
pub struct Completeness {
    pub ratio: f64,
    pub band: CompletenessBand,
}

pub fn data_completeness(price_points: usize, oi_points: usize, cvd_points: usize, funding_points: usize) -> Completeness {
    let ratio_of = |count: usize, target: usize| (count as f64 / target as f64).min(1.0);
    let price_ratio = ratio_of(price_points, PRICE_OI_CVD_TARGET_POINTS);
    let oi_ratio = ratio_of(oi_points, PRICE_OI_CVD_TARGET_POINTS);
    let cvd_ratio = ratio_of(cvd_points, PRICE_OI_CVD_TARGET_POINTS);
    let funding_ratio = ratio_of(funding_points, FUNDING_TARGET_POINTS);
    let overall = (price_ratio + oi_ratio + cvd_ratio + funding_ratio) / 4.0;

    let band = if overall < 0.25 {
        CompletenessBand::WarmingUp
    } else if overall < 0.5 {
        CompletenessBand::Low
    } else if overall < 0.75 {
        CompletenessBand::Medium
    } else {
        CompletenessBand::Full
    };

    Completeness { ratio: overall, band }
}
