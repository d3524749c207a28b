pub mod types;

use std::collections::VecDeque;
use std::path::PathBuf;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::models::{now_ms, EtfFlowState, LargeTrade, LiquidationEvent, TimestampMs};
use types::{
    CurrentSnapshot, ExchangeSeries, FlowBucket, SpotCvd, StoreInner, VwapBundle,
    LARGE_TRADE_CAP, LIQUIDATION_CAP, LIQUIDATION_RETENTION_MS, RETENTION_MS,
};

/// Owns every in-memory series and stateful record. A single coarse lock
/// protects the whole store; mutation methods hold it only for O(1)
/// amortised work and never perform I/O while holding it.
pub struct Store {
    inner: RwLock<StoreInner>,
    data_dir: PathBuf,
}

#[derive(Serialize, Deserialize)]
struct StoreSnapshot {
    #[serde(rename = "savedAt")]
    saved_at: TimestampMs,
    data: StoreInner,
    #[serde(rename = "lastUpdate")]
    last_update: TimestampMs,
}

impl Store {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            inner: RwLock::new(StoreInner::default()),
            data_dir: data_dir.into(),
        }
    }

    fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join("datastore.json")
    }

    // ---- mutation surface -------------------------------------------------

    pub fn add_price(&self, exchange: &str, coin: &str, value: f64) {
        self.add_price_at(exchange, coin, value, now_ms());
    }

    pub fn add_price_at(&self, exchange: &str, coin: &str, value: f64, timestamp_ms: TimestampMs) {
        let mut inner = self.inner.write();
        inner.exchange_series_mut(exchange, coin).push_price(timestamp_ms, value);
        inner.dirty = true;
    }

    pub fn add_oi(&self, exchange: &str, coin: &str, value: f64) {
        self.add_oi_at(exchange, coin, value, now_ms());
    }

    pub fn add_oi_at(&self, exchange: &str, coin: &str, value: f64, timestamp_ms: TimestampMs) {
        let mut inner = self.inner.write();
        inner.exchange_series_mut(exchange, coin).push_oi(timestamp_ms, value);
        inner.dirty = true;
    }

    pub fn add_funding(&self, exchange: &str, coin: &str, value: f64) {
        self.add_funding_at(exchange, coin, value, now_ms());
    }

    pub fn add_funding_at(&self, exchange: &str, coin: &str, value: f64, timestamp_ms: TimestampMs) {
        let mut inner = self.inner.write();
        inner.exchange_series_mut(exchange, coin).push_funding(timestamp_ms, value);
        inner.dirty = true;
    }

    pub fn add_orderbook(&self, exchange: &str, coin: &str, imbalance_pct: f64, bid_depth: f64, ask_depth: f64) {
        let mut inner = self.inner.write();
        inner
            .exchange_series_mut(exchange, coin)
            .push_orderbook(now_ms(), imbalance_pct, bid_depth, ask_depth);
        inner.dirty = true;
    }

    pub fn add_cvd(&self, exchange: &str, coin: &str, delta: f64) {
        self.add_cvd_at(exchange, coin, delta, now_ms());
    }

    pub fn add_cvd_at(&self, exchange: &str, coin: &str, delta: f64, timestamp_ms: TimestampMs) {
        let mut inner = self.inner.write();
        inner.exchange_series_mut(exchange, coin).push_cvd(timestamp_ms, delta);
        inner.dirty = true;
    }

    pub fn update_spot_cvd(&self, exchange: &str, coin: &str, delta: f64) {
        let mut inner = self.inner.write();
        inner.spot_cvd_mut(exchange, coin).push(now_ms(), delta);
        inner.dirty = true;
    }

    pub fn add_liquidation(&self, coin: &str, event: LiquidationEvent) {
        let mut inner = self.inner.write();
        let q = inner.liquidations.entry(coin.to_string()).or_insert_with(VecDeque::new);
        q.push_back(event);
        let cutoff = now_ms() - LIQUIDATION_RETENTION_MS;
        while let Some(front) = q.front() {
            if front.timestamp_ms < cutoff {
                q.pop_front();
            } else {
                break;
            }
        }
        while q.len() > LIQUIDATION_CAP {
            q.pop_front();
        }
        inner.dirty = true;
    }

    pub fn add_large_trade(&self, trade: LargeTrade) {
        let mut inner = self.inner.write();
        let dup = inner.large_trades.iter().any(|t| {
            t.exchange == trade.exchange && t.trade_id == trade.trade_id && t.symbol == trade.symbol
        });
        if dup {
            return;
        }
        inner.large_trades.push_front(trade);
        while inner.large_trades.len() > LARGE_TRADE_CAP {
            inner.large_trades.pop_back();
        }
        inner.dirty = true;
    }

    pub fn update_exchange_flow(&self, coin: &str, exchange: &str, venue: &str, buy_vol_usd: f64, sell_vol_usd: f64) {
        let mut inner = self.inner.write();
        let key = format!("{coin}:{exchange}:{venue}");
        inner.exchange_flow.entry(coin.to_string()).or_default().insert(
            key,
            FlowBucket {
                buy_vol_usd,
                sell_vol_usd,
                timestamp_ms: now_ms(),
            },
        );
        inner.dirty = true;
    }

    pub fn update_etf_flows(&self, state: EtfFlowState) {
        let mut inner = self.inner.write();
        inner.etf = state;
        inner.dirty = true;
    }

    pub fn update_vwap(&self, coin: &str, vwap: f64, volume: f64) {
        let mut inner = self.inner.write();
        inner.vwap.insert(
            coin.to_string(),
            VwapBundle {
                vwap,
                volume,
                updated_at_ms: now_ms(),
            },
        );
        inner.dirty = true;
    }

    // ---- queries ------------------------------------------------------------

    pub fn get_exchange_data(&self, exchange: &str) -> Option<std::collections::HashMap<String, ExchangeSeries>> {
        self.inner.read().series.get(exchange).cloned()
    }

    pub fn get_all_series(&self) -> std::collections::HashMap<String, std::collections::HashMap<String, ExchangeSeries>> {
        self.inner.read().series.clone()
    }

    pub fn exchanges(&self) -> Vec<String> {
        self.inner.read().series.keys().cloned().collect()
    }

    pub fn get_current_snapshot(&self, exchange: &str) -> std::collections::HashMap<String, CurrentSnapshot> {
        self.inner
            .read()
            .series
            .get(exchange)
            .map(|coins| coins.iter().map(|(k, v)| (k.clone(), v.current.clone())).collect())
            .unwrap_or_default()
    }

    pub fn get_series(&self, exchange: &str, coin: &str) -> Option<ExchangeSeries> {
        self.inner.read().series.get(exchange)?.get(coin).cloned()
    }

    pub fn get_liquidations(&self, coin: &str) -> Vec<LiquidationEvent> {
        self.inner
            .read()
            .liquidations
            .get(coin)
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn get_etf_flows(&self) -> EtfFlowState {
        self.inner.read().etf.clone()
    }

    pub fn get_large_trades(&self, limit: usize) -> Vec<LargeTrade> {
        self.inner.read().large_trades.iter().take(limit).cloned().collect()
    }

    pub fn get_vwap(&self, coin: &str) -> Option<VwapBundle> {
        self.inner.read().vwap.get(coin).cloned()
    }

    pub fn get_spot_cvd(&self, exchange: &str, coin: &str) -> Option<SpotCvd> {
        self.inner.read().spot_cvd.get(exchange)?.get(coin).cloned()
    }

    /// 5-second-bucketed sum of CVD deltas for `coin`, across the given spot exchanges.
    pub fn get_aggregated_spot_cvd_history(&self, coin: &str, exchanges: &[&str]) -> Vec<(TimestampMs, f64)> {
        let inner = self.inner.read();
        aggregate_bucketed(&inner.spot_cvd, coin, exchanges)
    }

    /// 5-second-bucketed sum of perp CVD deltas for `coin`, across the given perp exchanges.
    pub fn get_aggregated_perp_cvd_history(&self, coin: &str, exchanges: &[&str]) -> Vec<(TimestampMs, f64)> {
        let inner = self.inner.read();
        let mut buckets: std::collections::BTreeMap<i64, f64> = std::collections::BTreeMap::new();
        for exchange in exchanges {
            if let Some(coins) = inner.series.get(*exchange) {
                if let Some(series) = coins.get(coin) {
                    for p in &series.cvd {
                        let bucket = (p.timestamp_ms / 5000) * 5000;
                        *buckets.entry(bucket).or_insert(0.0) += p.value;
                    }
                }
            }
        }
        buckets.into_iter().collect()
    }

    pub fn get_exchange_flow(&self, coin: &str) -> std::collections::HashMap<String, FlowBucket> {
        self.inner.read().exchange_flow.get(coin).cloned().unwrap_or_default()
    }

    pub fn stats(&self) -> StoreStats {
        let inner = self.inner.read();
        let mut total_points = 0usize;
        for coins in inner.series.values() {
            for series in coins.values() {
                total_points += series.price.len()
                    + series.open_interest.len()
                    + series.funding_rate.len()
                    + series.orderbook.len()
                    + series.cvd.len();
            }
        }
        StoreStats {
            total_points,
            exchanges: inner.series.len(),
            large_trades: inner.large_trades.len(),
            dirty: inner.dirty,
        }
    }

    // ---- maintenance -----------------------------------------------------

    /// Drops series points older than 24h. Tolerates empty stores.
    pub fn cleanup(&self) {
        let cutoff = now_ms() - RETENTION_MS;
        let mut inner = self.inner.write();
        for coins in inner.series.values_mut() {
            for series in coins.values_mut() {
                series.trim(cutoff);
            }
        }
        for coin_map in inner.spot_cvd.values_mut() {
            for cvd in coin_map.values_mut() {
                while let Some(front) = cvd.points.front() {
                    if front.timestamp_ms < cutoff {
                        cvd.points.pop_front();
                    } else {
                        break;
                    }
                }
            }
        }
        let liq_cutoff = now_ms() - LIQUIDATION_RETENTION_MS;
        for q in inner.liquidations.values_mut() {
            while let Some(front) = q.front() {
                if front.timestamp_ms < liq_cutoff {
                    q.pop_front();
                } else {
                    break;
                }
            }
        }
        inner.dirty = true;
    }

    /// Serialises the whole store to `datastore.json` if dirty. Swallows I/O errors.
    pub async fn snapshot_save(&self) {
        let should_save = self.inner.read().dirty;
        if !should_save {
            return;
        }
        let data = self.inner.read().clone_for_snapshot();
        let payload = StoreSnapshot {
            saved_at: now_ms(),
            data,
            last_update: now_ms(),
        };
        let path = self.snapshot_path();
        let result = write_json_atomic(&path, &payload).await;
        match result {
            Ok(()) => {
                self.inner.write().dirty = false;
                tracing::info!(path = %path.display(), "store snapshot saved");
            }
            Err(err) => {
                tracing::warn!(error = %err, "store snapshot save failed, state remains in memory");
            }
        }
    }

    /// Reads `datastore.json` back on startup, filtering points older than 24h.
    pub async fn restore(&self) {
        let path = self.snapshot_path();
        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(_) => return,
        };
        let parsed: Result<StoreSnapshot, _> = serde_json::from_slice(&bytes);
        match parsed {
            Ok(snapshot) => {
                let mut inner = self.inner.write();
                *inner = snapshot.data;
                let cutoff = now_ms() - RETENTION_MS;
                for coins in inner.series.values_mut() {
                    for series in coins.values_mut() {
                        series.trim(cutoff);
                    }
                }
                inner.dirty = false;
                tracing::info!("store restored from snapshot");
            }
            Err(err) => {
                tracing::warn!(error = %err, "store snapshot restore failed, starting empty");
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub total_points: usize,
    pub exchanges: usize,
    pub large_trades: usize,
    pub dirty: bool,
}

impl StoreInner {
    fn clone_for_snapshot(&self) -> StoreInner {
        self.clone()
    }
}

fn aggregate_bucketed(
    spot_cvd: &std::collections::HashMap<String, std::collections::HashMap<String, SpotCvd>>,
    coin: &str,
    exchanges: &[&str],
) -> Vec<(TimestampMs, f64)> {
    let mut buckets: std::collections::BTreeMap<i64, f64> = std::collections::BTreeMap::new();
    for exchange in exchanges {
        if let Some(coins) = spot_cvd.get(*exchange) {
            if let Some(cvd) = coins.get(coin) {
                for p in &cvd.points {
                    let bucket = (p.timestamp_ms / 5000) * 5000;
                    *buckets.entry(bucket).or_insert(0.0) += p.value;
                }
            }
        }
    }
    buckets.into_iter().collect()
}

async fn write_json_atomic<T: Serialize>(path: &PathBuf, value: &T) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp_path = path.with_extension("json.tmp");
    let body = serde_json::to_vec_pretty(value)?;
    tokio::fs::write(&tmp_path, body).await?;
    tokio::fs::rename(&tmp_path, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn series_stays_monotone_and_updates_current() {
        let store = Store::new("data");
        store.add_price_at("binance", "BTC", 50_000.0, 1_000);
        store.add_price_at("binance", "BTC", 50_100.0, 2_000);
        let series = store.get_series("binance", "BTC").unwrap();
        let timestamps: Vec<_> = series.price.iter().map(|p| p.timestamp_ms).collect();
        assert_eq!(timestamps, vec![1_000, 2_000]);
        assert_eq!(series.current.price, Some(50_100.0));
    }

    #[test]
    fn cleanup_drops_points_older_than_24h() {
        let store = Store::new("data");
        let now = now_ms();
        store.add_price_at("binance", "BTC", 1.0, now - 25 * 3_600_000);
        store.add_price_at("binance", "BTC", 2.0, now);
        store.cleanup();
        let series = store.get_series("binance", "BTC").unwrap();
        assert_eq!(series.price.len(), 1);
        assert!(series.price[0].timestamp_ms >= now - RETENTION_MS);
    }

    #[test]
    fn large_trade_dedup_by_exchange_trade_id_symbol() {
        let store = Store::new("data");
        let mk = |id: &str| crate::models::LargeTrade {
            exchange: "binance".into(),
            venue: crate::models::Venue::Perp,
            symbol: "BTC".into(),
            price: 50_000.0,
            size: 10.0,
            side: crate::models::Side::Buy,
            trade_id: id.into(),
            timestamp_ms: now_ms(),
            received_at_ms: now_ms(),
        };
        store.add_large_trade(mk("1"));
        store.add_large_trade(mk("1"));
        store.add_large_trade(mk("2"));
        assert_eq!(store.get_large_trades(10).len(), 2);
    }

    #[test]
    fn liquidation_retention_caps_at_1000_and_2h() {
        let store = Store::new("data");
        let now = now_ms();
        for i in 0..1100 {
            store.add_liquidation(
                "BTC",
                LiquidationEvent {
                    symbol: "BTC".into(),
                    side: crate::models::Side::Sell,
                    price: 50_000.0,
                    quantity: 1.0,
                    timestamp_ms: now - i,
                    source_exchange: "binance".into(),
                },
            );
        }
        assert!(store.get_liquidations("BTC").len() <= 1000);
    }

    #[tokio::test]
    async fn snapshot_round_trips_and_clears_dirty() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        store.add_price_at("binance", "BTC", 50_000.0, now_ms());
        store.snapshot_save().await;
        assert!(!store.inner.read().dirty);

        let restored = Store::new(dir.path());
        restored.restore().await;
        let series = restored.get_series("binance", "BTC").unwrap();
        assert_eq!(series.price.len(), 1);
    }

    #[test]
    fn cvd_bucket_aggregation_is_commutative_across_exchanges() {
        let store = Store::new("data");
        store.update_spot_cvd("binance", "BTC", 100.0);
        store.update_spot_cvd("coinbase", "BTC", -40.0);
        let a = store.get_aggregated_spot_cvd_history("BTC", &["binance", "coinbase"]);
        let b = store.get_aggregated_spot_cvd_history("BTC", &["coinbase", "binance"]);
        let sum_a: f64 = a.iter().map(|(_, v)| v).sum();
        let sum_b: f64 = b.iter().map(|(_, v)| v).sum();
        assert_eq!(sum_a, sum_b);
    }
}
