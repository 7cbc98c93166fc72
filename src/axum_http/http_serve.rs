use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use axum::{Router, extract::DefaultBodyLimit, middleware, routing::get};
use tokio::net::TcpListener;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::info;

use crate::{
    axum_http::{auth, default_routers, routers},
    config::config_model::RelayConfig,
    domain::repositories::remote_store::RemoteStoreConnector,
};

pub fn build_router<C>(config: Arc<RelayConfig>, connector: Arc<C>) -> Result<Router>
where
    C: RemoteStoreConnector + Send + Sync + 'static,
{
    let body_limit = config
        .server
        .body_limit
        .checked_mul(1024 * 1024)
        .and_then(|bytes| usize::try_from(bytes).ok())
        .with_context(|| format!("--body-limit {} MiB is too large", config.server.body_limit))?;

    let api = Router::new()
        .merge(routers::ping::routes())
        .merge(routers::push::routes(connector, Arc::clone(&config)))
        .route_layer(middleware::from_fn_with_state(
            Arc::new(config.auth.clone()),
            auth::require_basic_auth,
        ));

    let app = Router::new()
        .fallback(default_routers::not_found)
        .route("/", get(default_routers::health_check))
        .nest("/api", api)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http());

    Ok(app)
}

pub async fn start<C>(config: Arc<RelayConfig>, connector: Arc<C>) -> Result<()>
where
    C: RemoteStoreConnector + Send + Sync + 'static,
{
    let app = build_router(Arc::clone(&config), connector)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = TcpListener::bind(addr).await?;

    info!("Server is running on port {}", config.server.port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm =
            signal(SignalKind::terminate()).expect("Failed to install SIGTERM signal handler");
        sigterm.recv().await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}
