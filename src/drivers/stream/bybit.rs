use tokio_tungstenite::tungstenite::Message;

use crate::models::{now_ms, Side, Trade};

use super::StreamDriver;

/// Bybit v5 public trade stream (linear perps), one instance per coin.
pub struct BybitDriver {
    coin: &'static str,
    symbol: &'static str,
    topic: String,
}

impl BybitDriver {
    pub fn new(coin: &'static str, symbol: &'static str) -> Self {
        Self {
            coin,
            symbol,
            topic: format!("publicTrade.{symbol}"),
        }
    }
}

impl StreamDriver for BybitDriver {
    fn name(&self) -> &'static str {
        "bybit"
    }

    fn exchange(&self) -> &'static str {
        "bybit"
    }

    fn coin(&self) -> &'static str {
        self.coin
    }

    fn url(&self) -> &'static str {
        "wss://stream.bybit.com/v5/public/linear"
    }

    fn subscribe_payload(&self) -> Option<String> {
        Some(format!(r#"{{"op":"subscribe","args":["{}"]}}"#, self.topic))
    }

    fn ping_payload(&self) -> Option<Message> {
        Some(Message::Text(r#"{"op":"ping"}"#.to_string()))
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
        if value.get("topic").and_then(|v| v.as_str()) != Some(self.topic.as_str()) {
            return Vec::new();
        }
        let entries = match value.get("data").and_then(|v| v.as_array()) {
            Some(a) => a,
            None => return Vec::new(),
        };
        entries
            .iter()
            .filter_map(|entry| {
                let price: f64 = entry.get("p")?.as_str()?.parse().ok()?;
                let size: f64 = entry.get("v")?.as_str()?.parse().ok()?;
                let side = match entry.get("S")?.as_str()? {
                    "Buy" => Side::Buy,
                    _ => Side::Sell,
                };
                let trade_id = entry.get("i").and_then(|v| v.as_str()).unwrap_or_default().to_string();
                let timestamp_ms = entry.get("T").and_then(|v| v.as_i64()).unwrap_or_else(now_ms);
                Some(Trade {
                    symbol: self.symbol.to_string(),
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
