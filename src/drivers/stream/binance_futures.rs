use tokio_tungstenite::tungstenite::Message;

use crate::models::{now_ms, Side, Trade};

use super::binance_spot::parse_f64;
use super::StreamDriver;

/// Binance USD-M futures aggregate-trade stream, one instance per coin.
pub struct BinanceFuturesDriver {
    coin: &'static str,
    symbol: &'static str,
    url: String,
}

impl BinanceFuturesDriver {
    pub fn new(coin: &'static str, symbol: &'static str) -> Self {
        let stream = format!("{}@aggTrade", symbol.to_lowercase());
        Self {
            coin,
            symbol,
            url: format!("wss://fstream.binance.com/ws/{stream}"),
        }
    }
}

impl StreamDriver for BinanceFuturesDriver {
    fn name(&self) -> &'static str {
        "binance_futures"
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

    fn parse(&self, msg: &Message) -> Vec<Trade> {
        let text = match msg {
            Message::Text(t) => t,
            _ => return Vec::new(),
        };
        let value: serde_json::Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(_) => return Vec::new(),
        };
        if value.get("e").and_then(|v| v.as_str()) != Some("aggTrade") {
            return Vec::new();
        }
        let price = parse_f64(&value, "p");
        let size = parse_f64(&value, "q");
        let trade_id = value.get("a").map(|v| v.to_string()).unwrap_or_default();
        let timestamp_ms = value.get("T").and_then(|v| v.as_i64()).unwrap_or_else(now_ms);
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
