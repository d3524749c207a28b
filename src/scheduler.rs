use std::sync::Arc;
use std::time::Duration;

use crate::drivers::poll::asterdex_fapi::AsterDexFapiDriver;
use crate::drivers::poll::binance_fapi::BinanceFapiDriver;
use crate::drivers::poll::bybit_v5::BybitV5Driver;
use crate::drivers::poll::etf_flow::EtfFlowDriver;
use crate::drivers::poll::hyperliquid_info::HyperliquidInfoDriver;
use crate::drivers::poll::nado_archive::NadoArchiveDriver;
use crate::drivers::poll::{run_poll_driver, PollDriver};
use crate::drivers::stream::binance_futures::BinanceFuturesDriver;
use crate::drivers::stream::binance_spot::BinanceSpotDriver;
use crate::drivers::stream::bybit::BybitDriver;
use crate::drivers::stream::coinbase::CoinbaseDriver;
use crate::drivers::stream::hyperliquid::HyperliquidDriver;
use crate::drivers::stream::kraken::KrakenDriver;
use crate::drivers::stream::liquidations::{run_binance_liquidations, run_bybit_liquidations};
use crate::drivers::stream::okx::OkxDriver;
use crate::drivers::stream::runtime::run_stream_driver;
use crate::drivers::stream::StreamDriver;
use crate::store::Store;
use crate::winrate::WinRateTracker;

/// (coin, binance/bybit symbol, OKX instId, Coinbase product id, Kraken pair)
const MARKETS: &[(&str, &str, &str, &str, &str)] = &[
    ("BTC", "BTCUSDT", "BTC-USDT-SWAP", "BTC-USD", "XBT/USD"),
    ("ETH", "ETHUSDT", "ETH-USDT-SWAP", "ETH-USD", "ETH/USD"),
    ("SOL", "SOLUSDT", "SOL-USDT-SWAP", "SOL-USD", "SOL/USD"),
];

const CLEANUP_INTERVAL: Duration = Duration::from_secs(10 * 60);
const SNAPSHOT_INTERVAL: Duration = Duration::from_secs(60);
const TRACKER_SAVE_INTERVAL: Duration = Duration::from_secs(5 * 60);
const TRACKER_EVALUATE_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Spawns every stream driver, poll driver, and liquidation feed as its own
/// task, then runs the maintenance loop (cleanup, snapshots, tracker
/// evaluation) forever. The caller owns process shutdown and is responsible
/// for a final `store.snapshot_save()`/`tracker.snapshot_save()` afterward.
pub async fn run(store: Arc<Store>, tracker: Arc<WinRateTracker>, sosovalue_api_key: Option<String>) {
    spawn_stream_drivers(&store);
    spawn_liquidation_feeds(&store);
    spawn_poll_drivers(&store, sosovalue_api_key);

    maintenance_loop(store, tracker).await;
}

fn spawn_stream_drivers(store: &Arc<Store>) {
    for &(coin, symbol, inst_id, product_id, pair) in MARKETS {
        let drivers: Vec<Arc<dyn StreamDriver>> = vec![
            Arc::new(BinanceSpotDriver::new(coin, symbol)),
            Arc::new(BinanceFuturesDriver::new(coin, symbol)),
            Arc::new(BybitDriver::new(coin, symbol)),
            Arc::new(OkxDriver::new(coin, inst_id)),
            Arc::new(CoinbaseDriver::new(coin, product_id)),
            Arc::new(KrakenDriver::new(coin, pair)),
            Arc::new(HyperliquidDriver::new(coin)),
        ];
        for driver in drivers {
            let store = store.clone();
            tokio::spawn(async move {
                run_stream_driver(driver, store).await;
            });
        }
    }
}

fn spawn_liquidation_feeds(store: &Arc<Store>) {
    {
        let store = store.clone();
        tokio::spawn(async move {
            run_binance_liquidations(store).await;
        });
    }
    for &(coin, symbol, ..) in MARKETS {
        let store = store.clone();
        tokio::spawn(async move {
            run_bybit_liquidations(coin, symbol, store).await;
        });
    }
}

fn spawn_poll_drivers(store: &Arc<Store>, sosovalue_api_key: Option<String>) {
    let fast: Vec<Arc<dyn PollDriver>> = vec![
        Arc::new(HyperliquidInfoDriver),
        Arc::new(BinanceFapiDriver),
        Arc::new(BybitV5Driver),
        Arc::new(AsterDexFapiDriver),
    ];
    for (i, driver) in fast.into_iter().enumerate() {
        let store = store.clone();
        let stagger = Duration::from_secs(2 * i as u64);
        tokio::spawn(async move {
            run_poll_driver(driver, store, stagger).await;
        });
    }

    let slow: Vec<Arc<dyn PollDriver>> = vec![
        Arc::new(NadoArchiveDriver),
        Arc::new(EtfFlowDriver { api_key: sosovalue_api_key }),
    ];
    for (i, driver) in slow.into_iter().enumerate() {
        let store = store.clone();
        let stagger = Duration::from_secs(2 * (i as u64 + 1));
        tokio::spawn(async move {
            run_poll_driver(driver, store, stagger).await;
        });
    }
}

async fn maintenance_loop(store: Arc<Store>, tracker: Arc<WinRateTracker>) {
    let mut cleanup_timer = tokio::time::interval(CLEANUP_INTERVAL);
    let mut snapshot_timer = tokio::time::interval(SNAPSHOT_INTERVAL);
    let mut tracker_save_timer = tokio::time::interval(TRACKER_SAVE_INTERVAL);
    let mut tracker_eval_timer = tokio::time::interval(TRACKER_EVALUATE_INTERVAL);

    loop {
        tokio::select! {
            _ = cleanup_timer.tick() => {
                store.cleanup();
            }
            _ = snapshot_timer.tick() => {
                store.snapshot_save().await;
            }
            _ = tracker_save_timer.tick() => {
                tracker.snapshot_save().await;
            }
            _ = tracker_eval_timer.tick() => {
                tracker.evaluate_due(&store);
            }
        }
    }
}
