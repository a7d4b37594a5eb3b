pub mod comments;
pub mod likes;
pub mod posts;
pub mod users;

use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth;
use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .merge(auth::handlers::router())
        .merge(users::router())
        .merge(posts::router())
        .merge(comments::router())
        .merge(likes::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn root() -> impl IntoResponse {
    Json(serde_json::json!({ "message": "Welcome to the murmur API!" }))
}
