use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tower_http::trace::TraceLayer;

mod config;
mod error;
mod logging;
mod routes;
mod services;
pub mod models;

use services::descriptor_store::{DescriptorStore, MemoryDescriptorStore};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging()?;

    let config = config::load_config()?;
    let addr = config.bind_addr;

    let state = Arc::new(AppState::new(config, Arc::new(MemoryDescriptorStore::new())));

    let app = Router::new()
        .merge(routes::routes())
        .merge(routes::sheets::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// Application state
#[derive(Clone)]
pub struct AppState {
    config: config::Config,
    store: Arc<dyn DescriptorStore>,
}

impl AppState {
    fn new(config: config::Config, store: Arc<dyn DescriptorStore>) -> Self {
        Self { config, store }
    }
}
