#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probability {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy)]
pub struct LiquidationZones {
    pub long_liq_price: f64,
    pub short_liq_price: f64,
    pub leverage_estimate: f64,
    pub oi_at_risk_usd: f64,
    pub probability: Probability,
}

/// Estimates an average leverage from funding and 24h OI velocity, then
/// derives the price levels where a cascade of forced liquidations becomes
/// likely. `avg_funding_apr` is the cross-exchange average funding rate
/// expressed as an annualised percentage; `oi_velocity_24h_pct` is the 24h
/// percent change in aggregated open interest.
pub fn liquidation_zones(
    price: f64,
    avg_funding_apr: f64,
    aggregated_oi_usd: f64,
    oi_velocity_24h_pct: f64,
) -> LiquidationZones {
    let base_leverage: f64 = if avg_funding_apr.abs() >= 50.0 {
        100.0
    } else if avg_funding_apr.abs() >= 20.0 {
        85.0
    } else {
        75.0
    };

    let bump = if oi_velocity_24h_pct.abs() > 5.0 {
        10.0
    } else if oi_velocity_24h_pct.abs() > 2.0 {
        5.0
    } else {
        0.0
    };

    let leverage = (base_leverage + bump).clamp(50.0, 125.0);

    let raw_long = price * (1.0 - 1.0 / leverage);
    let raw_short = price * (1.0 + 1.0 / leverage);
    let cap = price * 0.02;
    let long_liq_price = raw_long.max(price - cap);
    let short_liq_price = raw_short.min(price + cap);

    let oi_at_risk_usd = 0.3 * aggregated_oi_usd;
    let zone_distance = 1.0 / leverage;

    let probability = if zone_distance <= 0.01 && oi_at_risk_usd > 100_000_000.0 {
        Probability::High
    } else if zone_distance <= 0.015 && oi_at_risk_usd > 30_000_000.0 {
        Probability::Medium
    } else {
        Probability::Low
    };

    LiquidationZones {
        long_liq_price,
        short_liq_price,
        leverage_estimate: leverage,
        oi_at_risk_usd,
        probability,
    }
}
