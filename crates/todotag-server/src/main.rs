mod config;

use std::sync::Arc;

use axum::{
    Extension, Router,
    extract::{State, WebSocketUpgrade},
    middleware,
    response::IntoResponse,
    routing::get,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use todotag_api::middleware::resolve_caller;
use todotag_api::{AppState, AppStateInner};
use todotag_data::{Backend, Caller, DataClient};
use todotag_db::Database;
use todotag_gateway::handle_connection;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "todotag=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;
    for name in config.placeholder_secrets() {
        warn!("{} is unset or still a placeholder; set it in your .env file", name);
    }

    let db = Database::open(&config.db_path)?;
    let backend = Backend::new(db, config.api_key.clone());
    let state = AppStateInner::new(backend, config.jwt_secret.clone());

    let ws_route = Router::new()
        .route("/gateway", get(ws_upgrade))
        .layer(middleware::from_fn_with_state(state.clone(), resolve_caller))
        .with_state(state.clone());

    let app = todotag_api::router(state)
        .merge(ws_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = config.addr()?;
    info!("Todotag server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn ws_upgrade(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let username = caller.user.as_ref().map(|u| u.username.clone());
    let client: Arc<dyn DataClient> = Arc::new(state.client(&caller));
    ws.on_upgrade(move |socket| handle_connection(socket, client, username))
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    warn!("Failed to install SIGTERM handler: {}", e);
                    ctrl_c.await.ok();
                    info!("Received Ctrl+C, shutting down...");
                    return;
                }
            };
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
