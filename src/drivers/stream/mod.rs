pub mod binance_futures;
pub mod binance_spot;
pub mod bybit;
pub mod coinbase;
pub mod hyperliquid;
pub mod kraken;
pub mod liquidations;
pub mod okx;
pub mod runtime;

use crate::models::{Trade, Venue};
use tokio_tungstenite::tungstenite::Message;

/// One implementation per exchange WebSocket feed. The runtime in
/// `runtime.rs` owns connect/reconnect, dedup, rolling-window maintenance,
/// and publishing; implementors only know their own wire format.
pub trait StreamDriver: Send + Sync {
    fn name(&self) -> &'static str;
    fn exchange(&self) -> &'static str;
    fn coin(&self) -> &'static str;
    fn url(&self) -> &'static str;
    fn subscribe_payload(&self) -> Option<String>;
    fn ping_payload(&self) -> Option<Message> {
        None
    }
    fn ping_interval_secs(&self) -> u64 {
        20
    }
    /// Most feeds are perp/futures; spot feeds override this.
    fn venue(&self) -> Venue {
        Venue::Perp
    }
    fn parse(&self, msg: &Message) -> Vec<Trade>;
}
