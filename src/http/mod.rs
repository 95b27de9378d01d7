//! HTTP surface: axum router exposing person CRUD, relation management and
//! the kinship query. Transport concerns only; all graph semantics live in
//! the store and kinship modules.

mod handlers;
pub mod types;

use crate::config::Config;
use crate::db::Db;
use crate::error::{KintreeError, Result};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Db>,
}

/// Translate service errors into transport responses. Not-found conditions
/// stay distinguishable from internal failures; internals are logged and
/// returned opaque.
impl IntoResponse for KintreeError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            KintreeError::PersonNotFound(_) => {
                (StatusCode::NOT_FOUND, "Person not found".to_string())
            }
            KintreeError::RelationNotFound { .. } => {
                (StatusCode::NOT_FOUND, "Relation not found".to_string())
            }
            KintreeError::RelationExists { .. } => {
                (StatusCode::BAD_REQUEST, "Relation already exists".to_string())
            }
            KintreeError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            _ => {
                log::error!("Internal error: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Check if a port is available by attempting to bind to it
async fn check_port_available(port: u16) -> bool {
    tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port))
        .await
        .is_ok()
}

/// HTTP server wrapper
pub struct HttpServer {
    state: AppState,
    allowed_origins: Vec<String>,
}

impl HttpServer {
    /// Create a new HTTP server over an initialized database
    pub fn new(db: Db, config: &Config) -> Self {
        Self {
            state: AppState { db: Arc::new(db) },
            allowed_origins: config.server.allowed_origins.clone(),
        }
    }

    /// Run the HTTP server
    pub async fn run(&self, port: u16) -> Result<()> {
        let app = self.create_router();

        let addr = format!("127.0.0.1:{}", port);
        if !check_port_available(port).await {
            return Err(KintreeError::Config(format!(
                "Port {} is already in use. Stop the other process or set server.port in config.toml.",
                port
            )));
        }

        log::info!("Starting Kintree HTTP server on http://{}", addr);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(KintreeError::Io)?;
        axum::serve(listener, app).await.map_err(KintreeError::Io)?;

        Ok(())
    }

    /// Create the axum router
    fn create_router(&self) -> Router {
        // Restrict CORS to the configured origins; an empty list means local
        // dev, where any origin is accepted.
        let cors = if self.allowed_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<axum::http::HeaderValue> = self
                .allowed_origins
                .iter()
                .filter_map(|o| o.parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        };

        Router::new()
            .route("/", get(handlers::home))
            .route(
                "/persons",
                get(handlers::list_persons).post(handlers::create_person),
            )
            .route(
                "/persons/:id",
                get(handlers::get_person)
                    .put(handlers::update_person)
                    .delete(handlers::delete_person),
            )
            .route(
                "/relations",
                post(handlers::create_relation).delete(handlers::delete_relation),
            )
            .route("/cousins/:id", get(handlers::cousins))
            .route("/health", get(handlers::health))
            .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
            .with_state(self.state.clone())
    }
}
