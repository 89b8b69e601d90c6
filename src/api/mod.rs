mod handlers;
mod middleware;

pub use handlers::ErrorBody;
pub use middleware::{auth_middleware, SecurityConfig};

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::catalog::Catalog;
use crate::clock::Clock;
use crate::db::Database;
use crate::log_session::SessionRegistry;
use crate::progress::ProgressStore;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: ProgressStore,
    pub sessions: SessionRegistry,
}

impl AppState {
    pub fn new(
        db: Database,
        catalog: Arc<Catalog>,
        clock: Arc<dyn Clock>,
        session_ttl: Duration,
    ) -> Self {
        Self {
            store: ProgressStore::new(db, catalog, clock),
            sessions: SessionRegistry::new(session_ttl),
        }
    }
}

/// Router without authentication, for local use and tests.
pub fn create_router(state: AppState) -> Router {
    create_router_with_config(state, SecurityConfig::disabled())
}

pub fn create_router_with_config(state: AppState, security: SecurityConfig) -> Router {
    let protected = Router::new()
        // Catalog
        .route("/catalog/lessons", get(handlers::list_lessons))
        .route("/catalog/lessons/{id}", get(handlers::get_lesson))
        .route("/catalog/categories", get(handlers::list_categories))
        .route("/catalog/foods", get(handlers::list_foods))
        .route("/catalog/activities", get(handlers::list_activities))
        // Progress
        .route("/children/{child_id}/progress", get(handlers::get_progress))
        .route("/children/{child_id}/path", get(handlers::get_path))
        .route(
            "/children/{child_id}/lessons/{lesson_id}/complete",
            post(handlers::complete_lesson),
        )
        .route("/children/{child_id}/entries", get(handlers::list_entries))
        // Logging sessions
        .route("/children/{child_id}/sessions", post(handlers::start_session))
        .route(
            "/children/{child_id}/sessions/{session_id}",
            get(handlers::get_session).delete(handlers::abandon_session),
        )
        .route(
            "/children/{child_id}/sessions/{session_id}/select",
            post(handlers::select_step),
        )
        .route(
            "/children/{child_id}/sessions/{session_id}/back",
            post(handlers::step_back),
        )
        .route(
            "/children/{child_id}/sessions/{session_id}/commit",
            post(handlers::commit_session),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            security.clone(),
            auth_middleware,
        ));

    let api = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected);

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&security))
        .with_state(state)
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    match &security.cors_origins {
        Some(origins) => {
            let origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|o| {
                    HeaderValue::from_str(o)
                        .map_err(|_| tracing::warn!("Ignoring invalid CORS origin: {}", o))
                        .ok()
                })
                .collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        }
        None => CorsLayer::permissive(),
    }
}
