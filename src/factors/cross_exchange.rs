use super::common::FactorResult;
use crate::models::Direction;

pub const CROSS_EXCHANGE_LIST: [&str; 3] = ["hyperliquid", "binance", "bybit"];

fn bias_of(pct_change: f64) -> Direction {
    if pct_change > 0.3 {
        Direction::Bullish
    } else if pct_change < -0.3 {
        Direction::Bearish
    } else {
        Direction::Neutral
    }
}

pub struct CrossExchangeResult {
    pub factor: FactorResult,
    pub agreement: f64,
}

/// `changes` are 1h percent price changes, one per entry in `CROSS_EXCHANGE_LIST`
/// that had data; missing exchanges are simply absent from the slice.
pub fn cross_exchange_confluence(changes: &[f64]) -> CrossExchangeResult {
    if changes.is_empty() {
        return CrossExchangeResult {
            factor: FactorResult::insufficient_data(),
            agreement: 0.0,
        };
    }
    let biases: Vec<Direction> = changes.iter().map(|c| bias_of(*c)).collect();
    let bullish = biases.iter().filter(|b| **b == Direction::Bullish).count();
    let bearish = biases.iter().filter(|b| **b == Direction::Bearish).count();
    let count = biases.len();
    let agreement = bullish.max(bearish) as f64 / count as f64;
    let dominant_bullish = bullish >= bearish;

    let magnitude = if agreement >= 0.9 {
        0.70
    } else if agreement >= 0.7 {
        0.40
    } else {
        0.0
    };
    let score = if dominant_bullish { magnitude } else { -magnitude };
    let label = if magnitude == 0.0 {
        "NO_CONSENSUS"
    } else if dominant_bullish {
        "CROSS_EXCHANGE_BULLISH"
    } else {
        "CROSS_EXCHANGE_BEARISH"
    };

    CrossExchangeResult {
        factor: FactorResult::new(score, label),
        agreement,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s5_veto_below_seventy_percent_agreement() {
        let result = cross_exchange_confluence(&[1.0, 0.9, -0.8]);
        assert!((result.agreement - 2.0 / 3.0).abs() < 1e-9);
        assert!(result.agreement < 0.70);
    }
}
