use axum::{
    http::StatusCode,
    middleware,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{make_span_with_request_id, rate_limit_middleware, request_id_middleware};

pub mod auth;
pub mod chat;
pub mod movies;
pub mod recommendations;
pub mod search;
pub mod state;

pub use state::AppState;

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes())
        .layer(middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit_middleware,
        ))
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// API routes under /api
fn api_routes() -> Router<AppState> {
    Router::new()
        // Accounts
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/auth/change-password", post(auth::change_password))
        .route("/auth/google", get(auth::google_authorization_url))
        .route("/auth/google/complete", post(auth::google_complete))
        // Catalog
        .route("/movies", get(movies::list).post(movies::create))
        .route("/movies/stats", get(movies::stats))
        .route("/movies/fetch-details", get(movies::fetch_details))
        .route("/movies/:id", delete(movies::delete).put(movies::update))
        // Metadata
        .route("/search-movies", get(search::search_movies))
        // AI
        .route("/recommend", post(recommendations::recommend))
        .route("/chat", post(chat::chat))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
