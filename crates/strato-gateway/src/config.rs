//! Gateway configuration

use std::path::PathBuf;

use tracing::warn;

/// Server configuration with environment overrides (`STRATO_*`).
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    /// Root directory for persisted entity records.
    pub data_root: PathBuf,
    /// Optional JSON lookup file overriding the built-in action table.
    pub lookup_file: Option<PathBuf>,
    /// Fan-out cap for batched per-id work within one request.
    pub batch_concurrency: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            data_root: PathBuf::from("data"),
            lookup_file: None,
            batch_concurrency: strato_engine::DEFAULT_BATCH_CONCURRENCY,
        }
    }
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(host) = std::env::var("STRATO_HOST") {
            config.host = host;
        }
        if let Ok(port) = std::env::var("STRATO_PORT") {
            match port.parse() {
                Ok(port) => config.port = port,
                Err(_) => warn!(%port, "ignoring unparseable STRATO_PORT"),
            }
        }
        if let Ok(root) = std::env::var("STRATO_DATA_ROOT") {
            config.data_root = PathBuf::from(root);
        }
        if let Ok(path) = std::env::var("STRATO_LOOKUP_FILE") {
            config.lookup_file = Some(PathBuf::from(path));
        }
        if let Ok(cap) = std::env::var("STRATO_BATCH_CONCURRENCY") {
            match cap.parse() {
                Ok(cap) => config.batch_concurrency = cap,
                Err(_) => warn!(%cap, "ignoring unparseable STRATO_BATCH_CONCURRENCY"),
            }
        }
        config
    }
}
