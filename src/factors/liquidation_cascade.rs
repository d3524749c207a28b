use super::common::FactorResult;
use crate::models::LiquidationEvent;

fn notional_in_window(events: &[LiquidationEvent], now_ms: i64, window_ms: i64) -> (f64, f64) {
    let cutoff = now_ms - window_ms;
    let mut long_notional = 0.0;
    let mut short_notional = 0.0;
    for e in events.iter().filter(|e| e.timestamp_ms >= cutoff) {
        if e.liquidated_long() {
            long_notional += e.notional();
        } else {
            short_notional += e.notional();
        }
    }
    (long_notional, short_notional)
}

pub fn liquidation_cascade(events: &[LiquidationEvent], now_ms: i64) -> FactorResult {
    if events.is_empty() {
        return FactorResult::insufficient_data();
    }

    let (long_5m, short_5m) = notional_in_window(events, now_ms, 5 * 60_000);
    let (long_15m, short_15m) = notional_in_window(events, now_ms, 15 * 60_000);
    let (long_1h, short_1h) = notional_in_window(events, now_ms, 3_600_000);
    let (long_2h, short_2h) = notional_in_window(events, now_ms, 2 * 3_600_000);

    let total_5m = long_5m + short_5m;
    let total_15m = long_15m + short_15m;
    let total_1h = long_1h + short_1h;
    let total_2h = long_2h + short_2h;

    let rate_5m = total_5m / 5.0;
    let rate_15m = total_15m / 15.0;
    let rate_1h = total_1h / 60.0;

    let accelerating = rate_5m > 1.5 * rate_15m && rate_15m > 1.2 * rate_1h;

    let long_dominant_1h = long_1h > 1.5 * short_1h;
    let short_dominant_1h = short_1h > 1.5 * long_1h;

    if accelerating {
        if long_dominant_1h {
            let score = if long_1h >= 50_000_000.0 {
                -0.85
            } else if long_1h >= 20_000_000.0 {
                -0.55
            } else if long_1h >= 10_000_000.0 {
                -0.30
            } else {
                0.0
            };
            let label = if score != 0.0 { "LONG_CASCADE" } else { "NEUTRAL" };
            return FactorResult::new(score, label);
        }
        if short_dominant_1h {
            let score = if short_1h >= 50_000_000.0 {
                0.85
            } else if short_1h >= 20_000_000.0 {
                0.55
            } else if short_1h >= 10_000_000.0 {
                0.30
            } else {
                0.0
            };
            let label = if score != 0.0 { "SHORT_CASCADE" } else { "NEUTRAL" };
            return FactorResult::new(score, label);
        }
        return FactorResult::new(0.0, "NEUTRAL");
    }

    if total_2h > 50_000_000.0 {
        let long_dominant_2h = long_2h > short_2h;
        let score = if long_dominant_2h { 0.40 } else { -0.40 };
        return FactorResult::new(score, "CASCADE_EXHAUSTION");
    }

    FactorResult::new(0.0, "NEUTRAL")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Side;

    fn liq(side: Side, notional: f64, age_ms: i64, now: i64) -> LiquidationEvent {
        LiquidationEvent {
            symbol: "BTC".into(),
            side,
            price: 1.0,
            quantity: notional,
            timestamp_ms: now - age_ms,
            source_exchange: "binance".into(),
        }
    }

    #[test]
    fn s3_long_cascade_bearish() {
        let now = 10_000_000_000;
        let mut events = Vec::new();
        // 1h totals: long $55M, short $5M, split so 5m/15m/1h rates accelerate.
        events.push(liq(Side::Sell, 40_000_000.0, 60_000, now));
        events.push(liq(Side::Sell, 15_000_000.0, 10 * 60_000, now));
        events.push(liq(Side::Buy, 5_000_000.0, 50 * 60_000, now));
        let result = liquidation_cascade(&events, now);
        assert_eq!(result.label, "LONG_CASCADE");
        assert!((result.score - (-0.85)).abs() < 1e-9);
    }
}
