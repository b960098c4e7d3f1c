use axum::http::Method;
use log::{error, info};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api_router::configure_api_routes;
use crate::core::state::AppState;

use super::shutdown_signal;

pub async fn run_server(app_state: Arc<AppState>) -> std::io::Result<()> {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
        ])
        .allow_headers(Any)
        .allow_origin(Any);

    let app = configure_api_routes()
        .with_state(app_state.clone())
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let host: IpAddr = app_state
        .config
        .server
        .host
        .parse()
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    let addr = SocketAddr::new(host, app_state.config.server.port);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(
                "Failed to bind to {}: {} - is another instance running?",
                addr, e
            );
            return Err(e);
        }
    };
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(std::io::Error::other)
}
