use std::collections::HashMap;

use parking_lot::RwLock;

use crate::models::TimestampMs;

use super::types::{Projection, ProjectionStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Horizon {
    TwelveHour,
    FourHour,
    Daily,
}

impl Horizon {
    pub fn ttl_ms(&self) -> i64 {
        match self {
            Horizon::TwelveHour => 3_600_000,
            Horizon::Daily => 4 * 3_600_000,
            Horizon::FourHour => 30 * 60_000,
        }
    }
}

struct CacheEntry {
    projection: Projection,
    generated_at_ms: TimestampMs,
}

/// Single-slot per (coin, horizon) cache with a horizon-specific TTL.
#[derive(Default)]
pub struct ProjectionCache {
    slots: RwLock<HashMap<(String, Horizon), CacheEntry>>,
}

impl ProjectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a cached projection if its age is within TTL.
    pub fn get(&self, coin: &str, horizon: Horizon, now_ms: TimestampMs) -> Option<Projection> {
        let slots = self.slots.read();
        let entry = slots.get(&(coin.to_string(), horizon))?;
        if now_ms - entry.generated_at_ms < horizon.ttl_ms() {
            Some(entry.projection.clone())
        } else {
            None
        }
    }

    /// Only ACTIVE projections are cached; COLLECTING/WARMING_UP/VETO are not.
    pub fn put(&self, coin: &str, horizon: Horizon, projection: Projection) {
        if !matches!(projection.status, ProjectionStatus::Active) {
            return;
        }
        let generated_at_ms = projection.generated_at_ms;
        self.slots
            .write()
            .insert((coin.to_string(), horizon), CacheEntry { projection, generated_at_ms });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Direction;
    use crate::projection::types::{Confidence, ConfidenceLevel, Prediction};
    use std::collections::HashMap as Map;

    fn active_projection(now_ms: i64) -> Projection {
        Projection {
            coin: "BTC".into(),
            horizon: "12h".into(),
            current_price: 50_000.0,
            status: ProjectionStatus::Active,
            prediction: Some(Prediction {
                bias: "NEUTRAL".into(),
                strength: "NONE".into(),
                score: 0.0,
                grade: "C".into(),
                direction: Direction::Neutral,
            }),
            confidence: Some(Confidence { level: ConfidenceLevel::Low, score: 0.5 }),
            invalidation: None,
            key_factors: vec![],
            components: Map::new(),
            generated_at_ms: now_ms,
            valid_until_ms: now_ms + 3_600_000,
            next_refresh_ms: now_ms + 3_600_000,
        }
    }

    #[test]
    fn cache_coherence_within_ttl_returns_identical_generated_at() {
        let cache = ProjectionCache::new();
        let now = 1_000_000;
        cache.put("BTC", Horizon::TwelveHour, active_projection(now));

        let first = cache.get("BTC", Horizon::TwelveHour, now + 1_000).unwrap();
        let second = cache.get("BTC", Horizon::TwelveHour, now + 2_000).unwrap();
        assert_eq!(first.generated_at_ms, second.generated_at_ms);
    }

    #[test]
    fn cache_expires_after_ttl() {
        let cache = ProjectionCache::new();
        let now = 1_000_000;
        cache.put("BTC", Horizon::TwelveHour, active_projection(now));
        assert!(cache.get("BTC", Horizon::TwelveHour, now + Horizon::TwelveHour.ttl_ms() + 1).is_none());
    }
}
