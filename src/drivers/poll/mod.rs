pub mod asterdex_fapi;
pub mod binance_fapi;
pub mod bybit_v5;
pub mod etf_flow;
pub mod hyperliquid_info;
pub mod nado_archive;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::store::Store;

pub const COINS: &[(&str, &str)] = &[("BTC", "BTCUSDT"), ("ETH", "ETHUSDT"), ("SOL", "SOLUSDT")];

/// One implementation per REST poll source. Unlike stream drivers, poll
/// drivers never abandon on error: a failed cycle is logged and skipped,
/// the next tick tries again.
#[async_trait]
pub trait PollDriver: Send + Sync {
    fn name(&self) -> &'static str;
    fn interval_secs(&self) -> u64;
    async fn poll_once(&self, client: &reqwest::Client, store: &Store) -> anyhow::Result<()>;
}

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .build()
        .expect("reqwest client builds with a fixed timeout")
}

/// Staggers the driver's first run by `stagger` before settling into its
/// regular cadence. Errors never stop the loop.
pub async fn run_poll_driver(driver: Arc<dyn PollDriver>, store: Arc<Store>, stagger: Duration) {
    tokio::time::sleep(stagger).await;
    let client = http_client();
    let mut ticker = tokio::time::interval(Duration::from_secs(driver.interval_secs()));
    loop {
        ticker.tick().await;
        match driver.poll_once(&client, &store).await {
            Ok(()) => {}
            Err(err) => {
                tracing::warn!(driver = driver.name(), error = %err, "poll cycle failed, skipping");
            }
        }
    }
}
