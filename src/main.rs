// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use anyhow::Context;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::dashboard_service::DashboardService;
use crate::application::data_source::{DataSource, DataSourceSelector};
use crate::application::helena_api::HelenaApi;
use crate::application::share_links::ShareLinkStore;
use crate::infrastructure::config::load_settings;
use crate::infrastructure::helena_client::HelenaClient;
use crate::infrastructure::helena_data_source::HelenaDataSource;
use crate::infrastructure::mock_data_source::MockDataSource;
use crate::presentation::app_state::AppState;
use crate::presentation::router::build_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let settings = load_settings()?;

    // Create the Helena client only when credentials are present (infrastructure layer)
    let helena: Option<Arc<dyn HelenaApi>> = if settings.helena.has_credentials() {
        Some(Arc::new(HelenaClient::new(&settings.helena)?))
    } else {
        tracing::warn!("Helena credentials not configured, serving mock data only");
        None
    };

    // Create data sources and services (application layer)
    let real: Option<Arc<dyn DataSource>> = helena.clone().map(|api| {
        Arc::new(HelenaDataSource::new(api, settings.fields.clone())) as Arc<dyn DataSource>
    });
    let selector = DataSourceSelector::new(
        Arc::new(MockDataSource::new()),
        real,
        settings.data_source.default_preference(),
    );

    // Create application state
    let state = Arc::new(AppState {
        dashboard_service: DashboardService::new(selector),
        helena,
        share_links: ShareLinkStore::new(settings.share.max_entries),
        cookie_name: settings.data_source.cookie_name.clone(),
    });

    // Build router (presentation layer)
    let router = build_router(state)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr: SocketAddr = settings
        .server
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address {}", settings.server.bind))?;
    tracing::info!("Starting helena-dashboard service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
