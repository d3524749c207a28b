use super::common::{cvd_weak_threshold_usd, FactorResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dir {
    Up,
    Down,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Strength {
    Weak,
    Moderate,
    Strong,
}

fn classify(value: f64, weak: f64, moderate: f64, strong: f64) -> (Dir, Strength) {
    let abs = value.abs();
    if abs < weak {
        return (Dir::Neutral, Strength::Weak);
    }
    let dir = if value > 0.0 { Dir::Up } else { Dir::Down };
    let strength = if abs >= strong {
        Strength::Strong
    } else if abs >= moderate {
        Strength::Moderate
    } else {
        Strength::Weak
    };
    (dir, strength)
}

/// Inputs are percent changes for price/OI and raw USD for CVD, each computed
/// over 1h and 2h windows by the caller.
pub struct FlowInputs {
    pub price_1h_pct: f64,
    pub oi_1h_pct: f64,
    pub cvd_1h_usd: f64,
    pub price_2h_pct: f64,
    pub oi_2h_pct: f64,
    pub cvd_2h_usd: f64,
}

fn classify_triplet(price: f64, oi: f64, cvd: f64, coin: &str) -> [(Dir, Strength); 3] {
    let cvd_weak = cvd_weak_threshold_usd(coin);
    [
        classify(price, 0.3, 0.5, 0.5),
        classify(oi, 0.5, 1.0, 1.0),
        classify(cvd, cvd_weak, cvd_weak * 2.0, cvd_weak * 2.0),
    ]
}

pub fn flow_confluence(inputs: &FlowInputs, coin: &str) -> FactorResult {
    let one_hour = classify_triplet(inputs.price_1h_pct, inputs.oi_1h_pct, inputs.cvd_1h_usd, coin);
    let two_hour = classify_triplet(inputs.price_2h_pct, inputs.oi_2h_pct, inputs.cvd_2h_usd, coin);

    let up_1h = one_hour.iter().filter(|(d, _)| *d == Dir::Up).count();
    let down_1h = one_hour.iter().filter(|(d, _)| *d == Dir::Down).count();

    let (dominant, agree_count) = if up_1h >= down_1h {
        (Dir::Up, up_1h)
    } else {
        (Dir::Down, down_1h)
    };

    if agree_count == 0 {
        return FactorResult::new(0.0, "NO_CONFLUENCE");
    }

    let strong_count = one_hour.iter().filter(|(d, s)| *d == dominant && *s == Strength::Strong).count();

    let (mut score, mut label) = if agree_count == 3 {
        let magnitude = if strong_count == 3 {
            1.0
        } else if strong_count >= 1 {
            0.75
        } else {
            0.5
        };
        (magnitude, "TRIPLE_CONFLUENCE")
    } else if agree_count == 2 {
        let both_strong = one_hour
            .iter()
            .filter(|(d, s)| *d == dominant && *s == Strength::Strong)
            .count()
            == 2;
        let magnitude = if both_strong { 0.5 } else { 0.35 };
        (magnitude, "PARTIAL_CONFLUENCE")
    } else {
        return FactorResult::new(0.0, "NO_CONFLUENCE");
    };

    if dominant == Dir::Down {
        score = -score;
    }

    let opposing_2h = two_hour.iter().filter(|(d, _)| *d != Dir::Neutral && *d != dominant).count();
    if opposing_2h >= 2 {
        score *= 0.5;
        label = if label == "TRIPLE_CONFLUENCE" { "TRIPLE_CONFLUENCE_VETOED" } else { "PARTIAL_CONFLUENCE_VETOED" };
    }

    FactorResult::new(score, label)
}
