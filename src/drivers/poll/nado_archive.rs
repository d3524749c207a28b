use async_trait::async_trait;

use crate::store::Store;

use super::{PollDriver, COINS};

/// Nado's archive API is the slowest poll source (60 s cadence per spec);
/// it serves last-known mark price per market with no funding/OI fields.
pub struct NadoArchiveDriver;

#[async_trait]
impl PollDriver for NadoArchiveDriver {
    fn name(&self) -> &'static str {
        "nado_archive"
    }

    fn interval_secs(&self) -> u64 {
        60
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
    let url = format!("https://archive.nado.xyz/v1/markets/{symbol}");
    let body: serde_json::Value = client.get(url).send().await?.error_for_status()?.json().await?;
    let price = body
        .get("price")
        .and_then(|v| v.as_f64())
        .or_else(|| body.get("markPrice").and_then(|v| v.as_str()).and_then(|s| s.parse().ok()));
    if let Some(price) = price {
        if price > 0.0 {
            store.add_price("nado", coin, price);
        }
    }
    Ok(())
}
