use tokio_tungstenite::tungstenite::Message;

use crate::models::{now_ms, Side, Trade};

use super::StreamDriver;

/// OKX public trades channel for USDT-margined swaps, one instance per coin.
pub struct OkxDriver {
    coin: &'static str,
    inst_id: &'static str,
}

impl OkxDriver {
    pub fn new(coin: &'static str, inst_id: &'static str) -> Self {
        Self { coin, inst_id }
    }
}

impl StreamDriver for OkxDriver {
    fn name(&self) -> &'static str {
        "okx"
    }

    fn exchange(&self) -> &'static str {
        "okx"
    }

    fn coin(&self) -> &'static str {
        self.coin
    }

    fn url(&self) -> &'static str {
        "wss://ws.okx.com:8443/ws/v5/public"
    }

    fn subscribe_payload(&self) -> Option<String> {
        Some(format!(
            r#"{{"op":"subscribe","args":[{{"channel":"trades","instId":"{}"}}]}}"#,
            self.inst_id
        ))
    }

    fn ping_payload(&self) -> Option<Message> {
        Some(Message::Text("ping".to_string()))
    }

    fn parse(&self, msg: &Message) -> Vec<Trade> {
        let text = match msg {
            Message::Text(t) => t,
            _ => return Vec::new(),
        };
        if text == "pong" {
            return Vec::new();
        }
        let value: serde_json::Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(_) => return Vec::new(),
        };
        let channel = value
            .get("arg")
            .and_then(|v| v.get("channel"))
            .and_then(|v| v.as_str());
        if channel != Some("trades") {
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
                    "buy" => Side::Buy,
                    _ => Side::Sell,
                };
                let trade_id = entry
                    .get("tradeId")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                let timestamp_ms = entry
                    .get("ts")
                    .and_then(|v| v.as_str())
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(now_ms);
                Some(Trade {
                    symbol: self.inst_id.to_string(),
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
