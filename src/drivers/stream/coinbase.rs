use tokio_tungstenite::tungstenite::Message;

use crate::models::{now_ms, Side, Trade, Venue};

use super::StreamDriver;

/// Coinbase Exchange `matches` channel, one instance per coin. Spot-only;
/// feeds the spot CVD series rather than a perp exchange series.
pub struct CoinbaseDriver {
    coin: &'static str,
    product_id: &'static str,
}

impl CoinbaseDriver {
    pub fn new(coin: &'static str, product_id: &'static str) -> Self {
        Self { coin, product_id }
    }
}

impl StreamDriver for CoinbaseDriver {
    fn name(&self) -> &'static str {
        "coinbase"
    }

    fn exchange(&self) -> &'static str {
        "coinbase"
    }

    fn coin(&self) -> &'static str {
        self.coin
    }

    fn url(&self) -> &'static str {
        "wss://ws-feed.exchange.coinbase.com"
    }

    fn subscribe_payload(&self) -> Option<String> {
        Some(format!(
            r#"{{"type":"subscribe","product_ids":["{}"],"channels":["matches"]}}"#,
            self.product_id
        ))
    }

    fn ping_interval_secs(&self) -> u64 {
        30
    }

    fn venue(&self) -> Venue {
        Venue::Spot
    }

    fn parse(&self, msg: &Message) -> Vec<Trade> {
        let text = match msg {
            Message::Text(t) => t,
            _ => return Vec::new(),
        };
        let value: serde_json::Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(_) => return Vec::new(),
        };
        if value.get("type").and_then(|v| v.as_str()) != Some("match") {
            return Vec::new();
        }
        let price: Option<f64> = value.get("price").and_then(|v| v.as_str()).and_then(|s| s.parse().ok());
        let size: Option<f64> = value.get("size").and_then(|v| v.as_str()).and_then(|s| s.parse().ok());
        let side = match value.get("side").and_then(|v| v.as_str()) {
            Some("buy") => Side::Buy,
            _ => Side::Sell,
        };
        let trade_id = value
            .get("trade_id")
            .map(|v| v.to_string())
            .unwrap_or_default();
        let timestamp_ms = value
            .get("time")
            .and_then(|v| v.as_str())
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.timestamp_millis())
            .unwrap_or_else(now_ms);
        match (price, size) {
            (Some(price), Some(size)) => vec![Trade {
                symbol: self.product_id.to_string(),
                price,
                size,
                side,
                timestamp_ms,
                trade_id,
            }],
            _ => Vec::new(),
        }
    }
}
