use tokio_tungstenite::tungstenite::Message;

use crate::models::{now_ms, LiquidationEvent, Side};
use crate::store::Store;

/// Liquidation streams don't fit `StreamDriver` (they publish
/// `LiquidationEvent`, not `Trade`), so they get their own small runtime
/// loop rather than a shared one. Same reconnect policy as stream drivers.
pub async fn run_binance_liquidations(store: std::sync::Arc<Store>) {
    run(
        "wss://fstream.binance.com/ws/!forceOrder@arr",
        parse_binance_force_order,
        store,
    )
    .await;
}

pub async fn run_bybit_liquidations(coin: &'static str, symbol: &'static str, store: std::sync::Arc<Store>) {
    let url = "wss://stream.bybit.com/v5/public/linear".to_string();
    let subscribe = format!(r#"{{"op":"subscribe","args":["liquidation.{symbol}"]}}"#);
    run_with_subscribe(&url, Some(subscribe), move |msg| parse_bybit_liquidation(msg, coin), store).await;
}

async fn run<F>(url: &str, parse: F, store: std::sync::Arc<Store>)
where
    F: Fn(&Message) -> Vec<(String, LiquidationEvent)> + Copy,
{
    run_with_subscribe(url, None, parse, store).await;
}

async fn run_with_subscribe<F>(
    url: &str,
    subscribe: Option<String>,
    parse: F,
    store: std::sync::Arc<Store>,
) where
    F: Fn(&Message) -> Vec<(String, LiquidationEvent)>,
{
    let mut attempt: u32 = 0;
    let mut backoff = std::time::Duration::from_secs(5);
    loop {
        match run_once(url, subscribe.as_deref(), &parse, &store).await {
            Ok(()) => {
                attempt = 0;
                backoff = std::time::Duration::from_secs(5);
            }
            Err(err) => {
                attempt += 1;
                tracing::warn!(url, error = %err, attempt, "liquidation stream error");
                if attempt >= 10 {
                    tracing::error!(url, "liquidation stream reconnect budget exhausted");
                    return;
                }
            }
        }
        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(std::time::Duration::from_secs(300));
    }
}

async fn run_once<F>(
    url: &str,
    subscribe: Option<&str>,
    parse: &F,
    store: &std::sync::Arc<Store>,
) -> anyhow::Result<()>
where
    F: Fn(&Message) -> Vec<(String, LiquidationEvent)>,
{
    use futures_util::{SinkExt, StreamExt};

    let (ws_stream, _) = tokio_tungstenite::connect_async(url).await?;
    let (mut write, mut read) = ws_stream.split();
    if let Some(payload) = subscribe {
        write.send(Message::Text(payload.to_string())).await?;
    }
    while let Some(msg) = read.next().await {
        let msg = msg?;
        if matches!(msg, Message::Close(_)) {
            return Ok(());
        }
        for (coin, event) in parse(&msg) {
            store.add_liquidation(&coin, event);
        }
    }
    Ok(())
}

fn parse_binance_force_order(msg: &Message) -> Vec<(String, LiquidationEvent)> {
    let text = match msg {
        Message::Text(t) => t,
        _ => return Vec::new(),
    };
    let value: serde_json::Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(_) => return Vec::new(),
    };
    if value.get("e").and_then(|v| v.as_str()) != Some("forceOrder") {
        return Vec::new();
    }
    let order = match value.get("o") {
        Some(o) => o,
        None => return Vec::new(),
    };
    let symbol = match order.get("s").and_then(|v| v.as_str()) {
        Some(s) => s.to_string(),
        None => return Vec::new(),
    };
    let coin = symbol.trim_end_matches("USDT").to_string();
    let side = match order.get("S").and_then(|v| v.as_str()) {
        Some("SELL") => Side::Sell,
        Some("BUY") => Side::Buy,
        _ => return Vec::new(),
    };
    let price: f64 = order
        .get("ap")
        .or_else(|| order.get("p"))
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.0);
    let quantity: f64 = order
        .get("z")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.0);
    let timestamp_ms = order.get("T").and_then(|v| v.as_i64()).unwrap_or_else(now_ms);
    if price <= 0.0 || quantity <= 0.0 {
        return Vec::new();
    }
    vec![(
        coin,
        LiquidationEvent {
            symbol,
            side,
            price,
            quantity,
            timestamp_ms,
            source_exchange: "binance".to_string(),
        },
    )]
}

fn parse_bybit_liquidation(msg: &Message, coin: &'static str) -> Vec<(String, LiquidationEvent)> {
    let text = match msg {
        Message::Text(t) => t,
        _ => return Vec::new(),
    };
    let value: serde_json::Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(_) => return Vec::new(),
    };
    let topic = value.get("topic").and_then(|v| v.as_str()).unwrap_or("");
    if !topic.starts_with("liquidation.") {
        return Vec::new();
    }
    let data = match value.get("data") {
        Some(d) => d,
        None => return Vec::new(),
    };
    let symbol = data.get("symbol").and_then(|v| v.as_str()).unwrap_or_default().to_string();
    let side = match data.get("side").and_then(|v| v.as_str()) {
        Some("Sell") => Side::Sell,
        Some("Buy") => Side::Buy,
        _ => return Vec::new(),
    };
    let price: f64 = data
        .get("price")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.0);
    let quantity: f64 = data
        .get("size")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.0);
    let timestamp_ms = data.get("updatedTime").and_then(|v| v.as_i64()).unwrap_or_else(now_ms);
    if price <= 0.0 || quantity <= 0.0 {
        return Vec::new();
    }
    vec![(
        coin.to_string(),
        LiquidationEvent {
            symbol,
            side,
            price,
            quantity,
            timestamp_ms,
            source_exchange: "bybit".to_string(),
        },
    )]
}
