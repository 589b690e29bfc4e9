use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post, put}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/auth/register", post(handlers::register))
        .route("/api/auth/login", post(handlers::login))
        .route("/api/auth/logout", post(handlers::logout))
        .route("/api/counters", get(handlers::get_counters))
        .route("/api/counters/delta", post(handlers::apply_delta))
        .route("/api/targets", put(handlers::update_targets))
        .with_state(state)
}
