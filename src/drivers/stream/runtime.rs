use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;

use crate::models::{now_ms, Side, Trade, Venue};
use crate::store::Store;

use super::StreamDriver;

const DEDUP_CAP: usize = 10_000;
const DEDUP_TRIM_TO: usize = 5_000;
const RECONNECT_START_SECS: u64 = 5;
const RECONNECT_MAX_ATTEMPTS: u32 = 10;
const PUBLISH_INTERVAL_SECS: u64 = 5;

struct DriverState {
    dedup: HashSet<String>,
    dedup_order: VecDeque<String>,
    window_5m: VecDeque<Trade>,
    window_15m: VecDeque<Trade>,
    window_1h: VecDeque<Trade>,
}

impl DriverState {
    fn new() -> Self {
        Self {
            dedup: HashSet::new(),
            dedup_order: VecDeque::new(),
            window_5m: VecDeque::new(),
            window_15m: VecDeque::new(),
            window_1h: VecDeque::new(),
        }
    }

    fn accept(&mut self, trade: &Trade) -> bool {
        if trade.notional() <= 0.0 {
            return false;
        }
        if self.dedup.contains(&trade.trade_id) {
            return false;
        }
        self.dedup.insert(trade.trade_id.clone());
        self.dedup_order.push_back(trade.trade_id.clone());
        if self.dedup.len() > DEDUP_CAP {
            while self.dedup_order.len() > DEDUP_TRIM_TO {
                if let Some(old) = self.dedup_order.pop_front() {
                    self.dedup.remove(&old);
                }
            }
        }
        true
    }

    fn push(&mut self, trade: Trade) {
        self.window_5m.push_back(trade.clone());
        self.window_15m.push_back(trade.clone());
        self.window_1h.push_back(trade);
        self.trim();
    }

    fn trim(&mut self) {
        let now = now_ms();
        trim_window(&mut self.window_5m, now, 5 * 60_000);
        trim_window(&mut self.window_15m, now, 15 * 60_000);
        trim_window(&mut self.window_1h, now, 3_600_000);
    }
}

fn trim_window(window: &mut VecDeque<Trade>, now_ms: i64, span_ms: i64) {
    let cutoff = now_ms - span_ms;
    while let Some(front) = window.front() {
        if front.timestamp_ms < cutoff {
            window.pop_front();
        } else {
            break;
        }
    }
}

/// Runs one stream driver to completion: connect, subscribe, dispatch
/// messages, periodically publish rolling CVD and flow, and reconnect with
/// exponential backoff on failure. Returns only when the reconnect budget
/// is exhausted; callers spawn this in its own task per driver.
pub async fn run_stream_driver(driver: Arc<dyn StreamDriver>, store: Arc<Store>) {
    let mut attempt: u32 = 0;
    let mut backoff = Duration::from_secs(RECONNECT_START_SECS);

    loop {
        match run_once(driver.as_ref(), &store).await {
            Ok(()) => {
                tracing::info!(driver = driver.name(), "stream closed cleanly, reconnecting");
                attempt = 0;
                backoff = Duration::from_secs(RECONNECT_START_SECS);
            }
            Err(err) => {
                attempt += 1;
                tracing::warn!(driver = driver.name(), error = %err, attempt, "stream driver error");
                if attempt >= RECONNECT_MAX_ATTEMPTS {
                    tracing::error!(driver = driver.name(), "reconnect budget exhausted, driver stopping");
                    return;
                }
            }
        }
        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(Duration::from_secs(300));
    }
}

async fn run_once(driver: &dyn StreamDriver, store: &Arc<Store>) -> anyhow::Result<()> {
    let (ws_stream, _) = tokio_tungstenite::connect_async(driver.url()).await?;
    let (mut write, mut read) = ws_stream.split();

    if let Some(payload) = driver.subscribe_payload() {
        write.send(Message::Text(payload)).await?;
    }

    let mut state = DriverState::new();
    let mut ping_timer = tokio::time::interval(Duration::from_secs(driver.ping_interval_secs()));
    let mut publish_timer = tokio::time::interval(Duration::from_secs(PUBLISH_INTERVAL_SECS));

    loop {
        tokio::select! {
            msg = read.next() => {
                let msg = match msg {
                    Some(Ok(m)) => m,
                    Some(Err(err)) => return Err(err.into()),
                    None => return Ok(()),
                };
                match &msg {
                    Message::Close(_) => return Ok(()),
                    Message::Ping(payload) => {
                        write.send(Message::Pong(payload.clone())).await?;
                    }
                    Message::Text(_) | Message::Binary(_) => {
                        for trade in driver.parse(&msg) {
                            if state.accept(&trade) {
                                store.add_large_trade(crate::models::LargeTrade {
                                    exchange: driver.exchange().to_string(),
                                    venue: driver.venue(),
                                    symbol: trade.symbol.clone(),
                                    price: trade.price,
                                    size: trade.size,
                                    side: trade.side,
                                    trade_id: trade.trade_id.clone(),
                                    timestamp_ms: trade.timestamp_ms,
                                    received_at_ms: now_ms(),
                                });
                                state.push(trade);
                            }
                        }
                    }
                    _ => {}
                }
            }
            _ = ping_timer.tick() => {
                if let Some(ping) = driver.ping_payload() {
                    write.send(ping).await?;
                }
            }
            _ = publish_timer.tick() => {
                publish(driver, store, &mut state);
            }
        }
    }
}

fn publish(driver: &dyn StreamDriver, store: &Store, state: &mut DriverState) {
    state.trim();
    let delta_5m: f64 = state.window_5m.iter().map(|t| t.cvd_delta()).sum();
    match driver.venue() {
        Venue::Spot => store.update_spot_cvd(driver.exchange(), driver.coin(), delta_5m),
        Venue::Perp => store.add_cvd(driver.exchange(), driver.coin(), delta_5m),
    }

    let (buy, sell) = state
        .window_5m
        .iter()
        .fold((0.0, 0.0), |(buy, sell), t| match t.side {
            Side::Buy => (buy + t.notional(), sell),
            Side::Sell => (buy, sell + t.notional()),
        });
    let venue_label = match driver.venue() {
        Venue::Spot => "spot",
        Venue::Perp => "perp",
    };
    store.update_exchange_flow(driver.coin(), driver.exchange(), venue_label, buy, sell);
}
