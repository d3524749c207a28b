use std::env;

/// Process-wide configuration, loaded once at startup from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub sosovalue_api_key: Option<String>,
    pub data_dir: String,
}

impl Config {
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3001);

        let sosovalue_api_key = env::var("SOSOVALUE_API_KEY")
            .ok()
            .filter(|k| !k.is_empty());

        let data_dir = env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string());

        Self {
            port,
            sosovalue_api_key,
            data_dir,
        }
    }
}

/// Loads `.env` from the current working directory, falling back to the
/// crate root so `cargo run` works the same from any subdirectory.
pub fn load_env() {
    if dotenv::dotenv().is_ok() {
        return;
    }
    let manifest_env = format!("{}/.env", env!("CARGO_MANIFEST_DIR"));
    let _ = dotenv::from_path(manifest_env);
}

pub fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
}
