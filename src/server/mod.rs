//! HTTP service around [`Pipeline`].
//!
//! | Method | Path | |
//! |---|---|---|
//! | `GET`  | `/` | upload form |
//! | `POST` | `/` | form upload, HTML links or plain-text error |
//! | `POST` | `/upload` | form upload, JSON result |
//! | `GET`  | `/download/image/{name}` | annotated image |
//! | `GET`  | `/download/pdf/{name}` | exported PDF |
//! | `GET`  | `/health` | liveness |

pub mod error;
pub mod routes;

pub use error::{ApiError, BodyFormat, ServerError};

use crate::config::ServerConfig;
use crate::process::Pipeline;
use axum::extract::DefaultBodyLimit;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

/// Build the application router.
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .merge(routes::app_routes())
        .merge(routes::health_routes())
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
}

/// Bind `config.host:config.port` and serve until the process stops.
pub async fn start_server(pipeline: Arc<Pipeline>, config: &ServerConfig) -> Result<(), ServerError> {
    let app = router(AppState { pipeline }, config.max_upload_bytes);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|_| ServerError::InvalidAddress(format!("{}:{}", config.host, config.port)))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;

    tracing::info!("Listening on http://{}", addr);
    axum::serve(listener, app).await.map_err(ServerError::Serve)
}
