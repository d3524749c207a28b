use async_trait::async_trait;

use crate::store::Store;

use super::{PollDriver, COINS};

/// Binance USD-M futures REST: `premiumIndex` for mark price and funding,
/// `openInterest` for base-asset OI, combined into one USD-notional OI figure.
pub struct BinanceFapiDriver;

#[async_trait]
impl PollDriver for BinanceFapiDriver {
    fn name(&self) -> &'static str {
        "binance_fapi"
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
    let premium: serde_json::Value = client
        .get("https://fapi.binance.com/fapi/v1/premiumIndex")
        .query(&[("symbol", symbol)])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    let mark_price: f64 = premium
        .get("markPrice")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.0);
    let funding_rate: f64 = premium
        .get("lastFundingRate")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.0);

    let oi: serde_json::Value = client
        .get("https://fapi.binance.com/fapi/v1/openInterest")
        .query(&[("symbol", symbol)])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    let open_interest_base: f64 = oi
        .get("openInterest")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.0);

    if mark_price <= 0.0 {
        return Ok(());
    }
    store.add_price("binance", coin, mark_price);
    store.add_funding("binance", coin, funding_rate);
    store.add_oi("binance", coin, open_interest_base * mark_price);
    Ok(())
}
