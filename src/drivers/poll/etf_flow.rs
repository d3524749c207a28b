use async_trait::async_trait;

use crate::models::{EtfFlowDay, EtfFlowState};
use crate::store::Store;
use crate::us_eastern::market_status;

use super::PollDriver;

const TICKERS: &[&str] = &["IBIT", "FBTC", "ARKB"];

const CANDIDATE_ENDPOINTS: &[&str] = &[
    "https://api.sosovalue.xyz/openapi/v2/etf/currentEtfDataMetrics",
    "https://api.sosovalue.com/openapi/v2/etf/currentEtfDataMetrics",
];

/// Polls a curated set of spot-BTC-ETF tickers for same-day net flow.
/// Skipped entirely (with a warning) when no API key is configured.
pub struct EtfFlowDriver {
    pub api_key: Option<String>,
}

#[async_trait]
impl PollDriver for EtfFlowDriver {
    fn name(&self) -> &'static str {
        "etf_flow"
    }

    fn interval_secs(&self) -> u64 {
        30 * 60
    }

    async fn poll_once(&self, client: &reqwest::Client, store: &Store) -> anyhow::Result<()> {
        let api_key = match &self.api_key {
            Some(key) => key,
            None => {
                tracing::warn!("SOSOVALUE_API_KEY not configured, skipping ETF flow poll");
                return Ok(());
            }
        };

        let mut last_err = None;
        let mut body: Option<serde_json::Value> = None;
        for endpoint in CANDIDATE_ENDPOINTS {
            match client.get(*endpoint).header("x-soso-api-key", api_key.as_str()).send().await {
                Ok(response) if response.status().is_success() => match response.json().await {
                    Ok(json) => {
                        body = Some(json);
                        break;
                    }
                    Err(err) => last_err = Some(err.into()),
                },
                Ok(response) => last_err = Some(anyhow::anyhow!("endpoint returned {}", response.status())),
                Err(err) => last_err = Some(err.into()),
            }
        }
        let body = match body {
            Some(b) => b,
            None => return Err(last_err.unwrap_or_else(|| anyhow::anyhow!("no ETF endpoint succeeded"))),
        };

        let mut today_net_flow_usd = 0.0;
        let mut today_breakdown = std::collections::HashMap::new();
        let rows = body
            .get("data")
            .and_then(|d| d.as_array())
            .cloned()
            .unwrap_or_default();
        for row in &rows {
            let ticker = row.get("ticker").and_then(|v| v.as_str()).unwrap_or_default();
            if !TICKERS.contains(&ticker) {
                continue;
            }
            let flow: f64 = row
                .get("netFlowUsd")
                .and_then(|v| v.as_f64())
                .or_else(|| row.get("netFlowUsd").and_then(|v| v.as_str()).and_then(|s| s.parse().ok()))
                .unwrap_or(0.0);
            today_breakdown.insert(ticker.to_string(), flow);
            today_net_flow_usd += flow;
        }

        let history = store.get_etf_flows().history;
        let state = EtfFlowState {
            last_updated_ms: crate::models::now_ms(),
            market_status: market_status(chrono::Utc::now()),
            today_net_flow_usd,
            today_breakdown,
            history: roll_history(history, today_net_flow_usd),
        };
        store.update_etf_flows(state);
        Ok(())
    }
}

fn roll_history(mut history: Vec<EtfFlowDay>, today_net_flow_usd: f64) -> Vec<EtfFlowDay> {
    let today = chrono::Utc::now().format("%Y-%m-%d").to_string();
    if history.last().map(|d| d.date == today).unwrap_or(false) {
        history.last_mut().unwrap().net_flow_usd = today_net_flow_usd;
    } else {
        history.push(EtfFlowDay {
            date: today,
            net_flow_usd: today_net_flow_usd,
        });
    }
    if history.len() > 90 {
        let drop = history.len() - 90;
        history.drain(0..drop);
    }
    history
}
