use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::db::likes;
use crate::error::AppResult;
use crate::extractors::CurrentUser;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateLikeRequest {
    pub post_id: i64,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/likes/likes", post(like_post))
        .route("/likes/{like_id}", delete(unlike_post))
}

/// POST /likes/likes — like a post. A second like of the same post by
/// the same user is rejected without writing a row.
async fn like_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateLikeRequest>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let like = likes::create(&conn, user.id, req.post_id)?;

    Ok((StatusCode::CREATED, Json(like)).into_response())
}

/// DELETE /likes/{like_id} — remove one of your own likes.
async fn unlike_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(like_id): Path<i64>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    likes::delete(&conn, like_id, user.id)?;

    Ok((StatusCode::OK, "").into_response())
}
