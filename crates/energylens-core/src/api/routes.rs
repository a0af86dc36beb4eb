//! API routes

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{self, AppState};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))

        // Reports
        .route("/api/code/energy", post(handlers::energy_metrics))
        .route("/api/code/performance", post(handlers::performance_stats))

        // Raw records
        .route("/api/code/records", post(handlers::filtered_metrics))

        .with_state(state)
}
