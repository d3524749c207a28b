use async_trait::async_trait;
use serde_json::json;

use crate::store::Store;

use super::{PollDriver, COINS};

/// Hyperliquid `/info` REST endpoint: one `metaAndAssetCtxs` call covers
/// every coin, so this driver issues a single request per cycle rather
/// than one per coin.
pub struct HyperliquidInfoDriver;

#[async_trait]
impl PollDriver for HyperliquidInfoDriver {
    fn name(&self) -> &'static str {
        "hyperliquid_info"
    }

    fn interval_secs(&self) -> u64 {
        10
    }

    async fn poll_once(&self, client: &reqwest::Client, store: &Store) -> anyhow::Result<()> {
        let response = client
            .post("https://api.hyperliquid.xyz/info")
            .json(&json!({ "type": "metaAndAssetCtxs" }))
            .send()
            .await?
            .error_for_status()?;
        let body: serde_json::Value = response.json().await?;
        let array = body.as_array().ok_or_else(|| anyhow::anyhow!("unexpected info response shape"))?;
        let universe = array
            .first()
            .and_then(|m| m.get("universe"))
            .and_then(|u| u.as_array())
            .ok_or_else(|| anyhow::anyhow!("missing universe"))?;
        let contexts = array
            .get(1)
            .and_then(|c| c.as_array())
            .ok_or_else(|| anyhow::anyhow!("missing asset contexts"))?;

        for (coin, _) in COINS {
            let idx = universe
                .iter()
                .position(|entry| entry.get("name").and_then(|n| n.as_str()) == Some(*coin));
            let (idx, ctx) = match idx.and_then(|i| contexts.get(i).map(|c| (i, c))) {
                Some(pair) => pair,
                None => continue,
            };
            let _ = idx;
            let mark_px: f64 = ctx
                .get("markPx")
                .and_then(|v| v.as_str())
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.0);
            let funding: f64 = ctx
                .get("funding")
                .and_then(|v| v.as_str())
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.0);
            let open_interest_base: f64 = ctx
                .get("openInterest")
                .and_then(|v| v.as_str())
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.0);
            if mark_px <= 0.0 {
                continue;
            }
            store.add_price("hyperliquid", coin, mark_px);
            store.add_funding("hyperliquid", coin, funding);
            store.add_oi("hyperliquid", coin, open_interest_base * mark_px);
        }
        Ok(())
    }
}
