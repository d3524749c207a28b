use tokio_tungstenite::tungstenite::Message;

use crate::models::{now_ms, Side, Trade, Venue};

use super::StreamDriver;

/// Binance spot raw trade stream, one instance per coin.
pub struct BinanceSpotDriver {
    coin: &'static str,
    symbol: &'static str,
    url: String,
}

impl BinanceSpotDriver {
    pub fn new(coin: &'static str, symbol: &'static str) -> Self {
        let stream = format!("{}@trade", symbol.to_lowercase());
        Self {
            coin,
            symbol,
            url: format!("wss://stream.binance.com:9443/ws/{stream}"),
        }
    }
}

impl StreamDriver for BinanceSpotDriver {
    fn name(&self) -> &'static str {
        "binance_spot"
    }

    fn exchange(&self) -> &'static str {
        "binance"
    }

    fn coin(&self) -> &'static str {
        self.coin
    }

    fn url(&self) -> &'static str {
        Box::leak(self.url.clone().into_boxed_str())
    }

    fn subscribe_payload(&self) -> Option<String> {
        None
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
        if value.get("e").and_then(|v| v.as_str()) != Some("trade") {
            return Vec::new();
        }
        let price = parse_f64(&value, "p");
        let size = parse_f64(&value, "q");
        let trade_id = value.get("t").map(|v| v.to_string()).unwrap_or_default();
        let timestamp_ms = value.get("T").and_then(|v| v.as_i64()).unwrap_or_else(now_ms);
        // `m` true means the buyer was the resting (maker) order, so the
        // aggressor sold.
        let buyer_is_maker = value.get("m").and_then(|v| v.as_bool()).unwrap_or(false);
        let side = if buyer_is_maker { Side::Sell } else { Side::Buy };
        match (price, size) {
            (Some(price), Some(size)) => vec![Trade {
                symbol: self.symbol.to_string(),
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

pub(super) fn parse_f64(value: &serde_json::Value, key: &str) -> Option<f64> {
    value.get(key)?.as_str()?.parse().ok()
}
