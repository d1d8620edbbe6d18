//! HTTP server for the Scientia API.
//!
//! Every handler lives in [`routes`]; this module only wraps the router in
//! the cross-cutting layers and drives it until shutdown. The web UI is
//! served from the configured static directory by the router's fallback.

pub mod routes;
pub mod sessions;
pub mod state;

pub use routes::{SESSION_HEADER, create_router};
pub use sessions::{SessionStore, SharedSession};
pub use state::AppState;

use std::future::Future;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Router with CORS and request tracing applied.
///
/// The UI may be hosted elsewhere during development, so any origin is
/// accepted.
#[must_use]
pub fn build_app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Serve on an already bound listener until `shutdown` resolves.
///
/// In-flight requests are allowed to finish before this returns.
pub async fn serve<F>(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, build_app(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    tracing::info!("Scientia server stopped");
    Ok(())
}

/// Bind every interface on `port` and serve until `shutdown_signal` resolves.
///
/// # Errors
/// Returns an error if the port cannot be bound or the server fails.
pub async fn run_server_with_shutdown<F>(
    state: Arc<AppState>,
    port: u16,
    shutdown_signal: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Scientia listening on http://{addr}");
    serve(listener, state, shutdown_signal).await
}
