use tokio_tungstenite::tungstenite::Message;

use crate::models::{now_ms, Side, Trade};

use super::StreamDriver;

/// Hyperliquid perp trades feed, one instance per coin.
pub struct HyperliquidDriver {
    coin: &'static str,
}

impl HyperliquidDriver {
    pub fn new(coin: &'static str) -> Self {
        Self { coin }
    }
}

impl StreamDriver for HyperliquidDriver {
    fn name(&self) -> &'static str {
        "hyperliquid"
    }

    fn exchange(&self) -> &'static str {
        "hyperliquid"
    }

    fn coin(&self) -> &'static str {
        self.coin
    }

    fn url(&self) -> &'static str {
        "wss://api.hyperliquid.xyz/ws"
    }

    fn subscribe_payload(&self) -> Option<String> {
        Some(format!(
            r#"{{"method":"subscribe","subscription":{{"type":"trades","coin":"{}"}}}}"#,
            self.coin
        ))
    }

    fn ping_payload(&self) -> Option<Message> {
        Some(Message::Text(r#"{"method":"ping"}"#.to_string()))
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
        if value.get("channel").and_then(|v| v.as_str()) != Some("trades") {
            return Vec::new();
        }
        let entries = match value.get("data").and_then(|v| v.as_array()) {
            Some(a) => a,
            None => return Vec::new(),
        };
        entries
            .iter()
            .filter_map(|entry| {
                let price: f64 = entry.get("px")?.as_str()?.parse().ok()?;
                let size: f64 = entry.get("sz")?.as_str()?.parse().ok()?;
                let side = match entry.get("side")?.as_str()? {
                    "B" => Side::Buy,
                    _ => Side::Sell,
                };
                let trade_id = entry.get("tid").map(|v| v.to_string()).unwrap_or_default();
                let timestamp_ms = entry.get("time").and_then(|v| v.as_i64()).unwrap_or_else(now_ms);
                Some(Trade {
                    symbol: self.coin.to_string(),
                    price,
                    size,
                    side,
                    timestamp_ms,
                    trade_id,
                })
            })
            .collect()
    }
}
