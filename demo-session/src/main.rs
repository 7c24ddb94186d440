use dotenvy::dotenv;
use http_session_axum::{InMemoryRefreshTokenStore, SessionConfig, SessionManager};
use std::sync::Arc;

mod app;
mod server;

use server::{init_tracing, spawn_http_server};

const DEFAULT_PORT: u16 = 3000;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    init_tracing("demo_session");

    let config = SessionConfig::from_env()?;
    let store = Arc::new(InMemoryRefreshTokenStore::new());
    let manager = Arc::new(SessionManager::<app::MySession>::refreshable(config, store)?);
    manager.init().await?;

    let port = match std::env::var("PORT") {
        Ok(port) => port.parse()?,
        Err(_) => DEFAULT_PORT,
    };

    spawn_http_server(port, app::router(manager)).await??;
    Ok(())
}
