use tokio_tungstenite::tungstenite::Message;

use crate::models::{now_ms, Side, Trade, Venue};

use super::StreamDriver;

/// Kraken spot `trade` feed, one instance per coin.
pub struct KrakenDriver {
    coin: &'static str,
    pair: &'static str,
}

impl KrakenDriver {
    pub fn new(coin: &'static str, pair: &'static str) -> Self {
        Self { coin, pair }
    }
}

impl StreamDriver for KrakenDriver {
    fn name(&self) -> &'static str {
        "kraken"
    }

    fn exchange(&self) -> &'static str {
        "kraken"
    }

    fn coin(&self) -> &'static str {
        self.coin
    }

    fn url(&self) -> &'static str {
        "wss://ws.kraken.com"
    }

    fn subscribe_payload(&self) -> Option<String> {
        Some(format!(
            r#"{{"event":"subscribe","pair":["{}"],"subscription":{{"name":"trade"}}}}"#,
            self.pair
        ))
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
        // Channel payloads are top-level arrays: [channelID, trades, "trade", pair].
        let array = match value.as_array() {
            Some(a) if a.len() >= 3 => a,
            _ => return Vec::new(),
        };
        if array.get(2).and_then(|v| v.as_str()) != Some("trade") {
            return Vec::new();
        }
        let trades = match array.get(1).and_then(|v| v.as_array()) {
            Some(t) => t,
            None => return Vec::new(),
        };
        trades
            .iter()
            .filter_map(|entry| {
                let fields = entry.as_array()?;
                let price: f64 = fields.first()?.as_str()?.parse().ok()?;
                let volume: f64 = fields.get(1)?.as_str()?.parse().ok()?;
                let time_secs: f64 = fields.get(2)?.as_str()?.parse().ok()?;
                let side = match fields.get(3)?.as_str()? {
                    "b" => Side::Buy,
                    _ => Side::Sell,
                };
                let timestamp_ms = (time_secs * 1000.0) as i64;
                Some(Trade {
                    symbol: self.pair.to_string(),
                    price,
                    size: volume,
                    side,
                    timestamp_ms,
                    trade_id: format!("{}-{}", timestamp_ms, price),
                })
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|t| {
                if t.timestamp_ms <= 0 {
                    Trade { timestamp_ms: now_ms(), ..t }
                } else {
                    t
                }
            })
            .collect()
    }
}
