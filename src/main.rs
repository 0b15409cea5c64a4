//! Serves the item API on `0.0.0.0:8000`.

use std::sync::Arc;

use httpserver_rust::{items, HttpServer, ItemStore, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let server = HttpServer::new(ServerConfig::default());
    let store = Arc::new(ItemStore::new());
    items::register_routes(&server, store).await;

    server.start().await?;

    Ok(())
}
