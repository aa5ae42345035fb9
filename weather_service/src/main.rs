//! Weather service: serves the weather resource (or a resources file) over a chosen store.
//!
//! `STORE_BACKEND=memory cargo run -p weather-service` runs without a database.

use resource_engine::{
    app_router, ensure_database_exists, load_from_path, resolve, weather_model, AppState, MemoryStore, PgStore,
    ResolvedModel, Settings, StoreBackend, StoreDriver,
};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("resource_engine=info,weather_service=info")),
        )
        .init();

    let settings = Settings::from_env()?;
    let model = match &settings.resources_path {
        Some(path) => resolve(&load_from_path(path).await?)?,
        None => ResolvedModel::new(vec![weather_model()?])?,
    };

    let store: Arc<dyn StoreDriver> = match settings.backend {
        StoreBackend::Postgres => {
            ensure_database_exists(&settings.database_url).await?;
            Arc::new(PgStore::connect(&settings.database_url, settings.db_max_connections).await?)
        }
        StoreBackend::Memory => {
            tracing::warn!("in-memory store: data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };
    for resource in model.resources() {
        store.ensure_table(resource).await?;
        tracing::info!(path = resource.path(), table = resource.table_name(), "resource ready");
    }

    let state = AppState::new(store, model)
        .with_pages(settings.pages())
        .with_body_limit(settings.body_limit_bytes);
    let app = app_router(state);

    let listener = TcpListener::bind(settings.bind_addr).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
