pub mod common;
pub mod completeness;
pub mod cross_exchange;
pub mod cvd_persistence;
pub mod flow_confluence;
pub mod freshness;
pub mod funding_zscore;
pub mod liquidation_cascade;
pub mod liquidation_zones;
pub mod momentum;
pub mod oi_roc;
pub mod regime;
pub mod session;
pub mod spot_perp_divergence;
pub mod volatility;
pub mod whale_alignment;

pub use common::FactorResult;
