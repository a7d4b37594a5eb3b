use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::db::comments;
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateCommentRequest {
    pub body: String,
    pub post_id: i64,
}

pub fn router() -> Router<AppState> {
    // One route string for both methods: the id names a comment for
    // DELETE and a post for GET, mirroring the original API.
    Router::new()
        .route("/comments/create_comment", post(create_comment))
        .route("/comments/{id}", get(list_comments).delete(delete_comment))
}

/// POST /comments/create_comment — comment on an existing post.
async fn create_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateCommentRequest>,
) -> AppResult<Response> {
    let body = req.body.trim().to_string();
    if body.is_empty() {
        return Err(AppError::Validation("Comment cannot be empty".into()));
    }

    let conn = state.db.get()?;
    let comment = comments::create(&conn, user.id, req.post_id, &body)?;

    Ok((StatusCode::CREATED, Json(comment)).into_response())
}

/// DELETE /comments/{comment_id} — delete one of your own comments.
async fn delete_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(comment_id): Path<i64>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    comments::delete(&conn, comment_id, user.id)?;

    Ok((StatusCode::OK, "").into_response())
}

/// GET /comments/{post_id} — list a post's comments, newest first.
/// Public: readable without authentication.
async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let comments = comments::list_for_post(&conn, post_id)?;

    Ok(Json(comments).into_response())
}
