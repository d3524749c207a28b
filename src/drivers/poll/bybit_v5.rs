use async_trait::async_trait;

use crate::store::Store;

use super::{PollDriver, COINS};

/// Bybit v5 unified market tickers, linear category.
pub struct BybitV5Driver;

#[async_trait]
impl PollDriver for BybitV5Driver {
    fn name(&self) -> &'static str {
        "bybit_v5"
    }

    fn interval_secs(&self) -> u64 {
        10
    }

    async fn poll_once(&self, client: &reqwest::Client, store: &Store) -> anyhow::Result<()> {
        for (coin, symbol) in COINS {
            if let Err(err) = poll_symbol(client, store, coin, symbol).await {
                tracing::warn!(driver = self.name(), coin, error = %err, "symbol cycle failed");
            }
        }
        Ok(())
    }
}

async fn poll_symbol(client: &reqwest::Client, store: &Store, coin: &str, symbol: &str) -> anyhow::Result<()> {
    let body: serde_json::Value = client
        .get("https://api.bybit.com/v5/market/tickers")
        .query(&[("category", "linear"), ("symbol", symbol)])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    let entry = body
        .get("result")
        .and_then(|r| r.get("list"))
        .and_then(|l| l.as_array())
        .and_then(|l| l.first());
    let entry = match entry {
        Some(e) => e,
        None => return Ok(()),
    };
    let last_price: f64 = entry
        .get("lastPrice")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.0);
    let funding_rate: f64 = entry
        .get("fundingRate")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.0);
    let open_interest_base: f64 = entry
        .get("openInterest")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.0);
    if last_price <= 0.0 {
        return Ok(());
    }
    store.add_price("bybit", coin, last_price);
    store.add_funding("bybit", coin, funding_rate);
    store.add_oi("bybit", coin, open_interest_base * last_price);
    Ok(())
}
