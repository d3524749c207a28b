use super::common::FactorResult;

pub struct WhaleConsensus {
    pub position_count: usize,
    pub long_pct: f64,
    pub consistent_longs: i64,
    pub consistent_shorts: i64,
}

pub fn whale_alignment(consensus: Option<&WhaleConsensus>) -> FactorResult {
    let Some(c) = consensus else {
        return FactorResult::insufficient_data();
    };
    if c.position_count < 3 {
        return FactorResult::insufficient_data();
    }
    let score = 2.0 * (c.long_pct - 0.5) + 0.1 * (c.consistent_longs - c.consistent_shorts) as f64;
    FactorResult::new(score, "WHALE_ALIGNMENT")
}
