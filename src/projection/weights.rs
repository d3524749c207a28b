/// A named weight paired with its score; absent factors are simply omitted
/// from the slice rather than included with a zero weight, so `weighted_sum`
/// naturally redistributes by excluding their weight from the denominator.
pub struct WeightedFactor {
    pub weight: f64,
    pub score: f64,
}

/// `score = (sum wi*si) / sum wi` over the factors that contributed.
pub fn weighted_sum(factors: &[WeightedFactor]) -> f64 {
    let total_weight: f64 = factors.iter().map(|f| f.weight).sum();
    if total_weight == 0.0 {
        return 0.0;
    }
    let total: f64 = factors.iter().map(|f| f.weight * f.score).sum();
    total / total_weight
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_excludes_absent_weight_from_denominator() {
        let with_whale = weighted_sum(&[
            WeightedFactor { weight: 0.30, score: 0.5 },
            WeightedFactor { weight: 0.15, score: 1.0 },
        ]);
        let without_whale = weighted_sum(&[WeightedFactor { weight: 0.30, score: 0.5 }]);
        assert!((without_whale - 0.5).abs() < 1e-9);
        assert!(with_whale != without_whale);
    }
}
