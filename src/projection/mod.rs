pub mod cache;
pub mod engine;
pub mod types;
pub mod weights;

pub use cache::{Horizon, ProjectionCache};
pub use types::Projection;
