use std::net::SocketAddr;
use std::sync::Arc;

use strato_engine::{ActionTable, Engine};
use strato_gateway::{create_app, AppState, GatewayConfig, XmlEncoder};
use strato_store::{FsStore, Store};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,strato_gateway=debug".into()),
        )
        .init();

    let config = GatewayConfig::from_env();
    info!(?config, "starting strato gateway");

    let table = match &config.lookup_file {
        Some(path) => ActionTable::from_lookup_file(path)?,
        None => ActionTable::builtin(),
    };

    let store = Store::new(Arc::new(FsStore::new(&config.data_root)));
    let engine = Engine::new(store)
        .with_action_table(table)
        .with_batch_concurrency(config.batch_concurrency);

    let state = AppState {
        engine: Arc::new(engine),
        encoder: Arc::new(XmlEncoder),
    };
    let app = create_app(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("strato gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
