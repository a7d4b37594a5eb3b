use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::db::posts::{self, NewPost};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::feed::{self, FeedPost};
use crate::state::AppState;
use crate::storage;

#[derive(Deserialize)]
pub struct UpdatePostRequest {
    pub body: String,
}

#[derive(Serialize)]
pub struct FeedResponse {
    pub posts: Vec<FeedPost>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts/create_post", post(create_post))
        .route("/posts/all", get(all_posts))
        .route("/posts/user/{user_id}", get(user_posts))
        .route("/posts/{post_id}", put(update_post).delete(delete_post))
}

// -- Handlers --

/// POST /posts/create_post — multipart form with `title`, `body` and an
/// optional `image`. The image is written to disk before the row is
/// inserted, so a failed write creates nothing.
async fn create_post(
    State(state): State<AppState>,
    user: CurrentUser,
    mut multipart: Multipart,
) -> AppResult<Response> {
    let mut title: Option<String> = None;
    let mut body: Option<String> = None;
    let mut image: Option<(String, bytes::Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().map(|s| s.to_string());
        match name.as_deref() {
            Some("title") => {
                title = Some(field.text().await.map_err(|e| {
                    AppError::Validation(format!("Invalid multipart body: {}", e))
                })?);
            }
            Some("body") => {
                body = Some(field.text().await.map_err(|e| {
                    AppError::Validation(format!("Invalid multipart body: {}", e))
                })?);
            }
            Some("image") => {
                let filename = field.file_name().unwrap_or("image").to_string();
                let data = field.bytes().await.map_err(|e| {
                    AppError::Validation(format!("Invalid multipart body: {}", e))
                })?;
                if !data.is_empty() {
                    image = Some((filename, data));
                }
            }
            _ => {}
        }
    }

    let title = title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Validation("Title is required".into()))?;
    let body = body
        .map(|b| b.trim().to_string())
        .filter(|b| !b.is_empty())
        .ok_or_else(|| AppError::Validation("Post body is required".into()))?;

    let image_path = match image {
        Some((filename, data)) => Some(storage::store_upload(
            state.config.uploads_path(),
            storage::POST_IMAGES_DIR,
            user.id,
            &filename,
            &data,
        )?),
        None => None,
    };

    let conn = state.db.get()?;
    let created = posts::create(
        &conn,
        user.id,
        NewPost {
            title,
            body,
            image_path,
        },
    )?;

    Ok((StatusCode::CREATED, Json(created)).into_response())
}

/// GET /posts/all — every other user's posts, newest first, with
/// viewer-relative counters.
async fn all_posts(State(state): State<AppState>, user: CurrentUser) -> AppResult<Response> {
    let conn = state.db.get()?;
    let posts = feed::global_feed(&conn, user.id)?;

    Ok(Json(FeedResponse { posts }).into_response())
}

/// GET /posts/user/{user_id} — one user's posts, newest first.
async fn user_posts(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(user_id): Path<i64>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let posts = feed::user_feed(&conn, user.id, user_id)?;

    Ok(Json(FeedResponse { posts }).into_response())
}

/// PUT /posts/{post_id} — edit the body of one of your own posts.
async fn update_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<i64>,
    Json(req): Json<UpdatePostRequest>,
) -> AppResult<Response> {
    let body = req.body.trim().to_string();
    if body.is_empty() {
        return Err(AppError::Validation("Post body is required".into()));
    }

    let conn = state.db.get()?;
    let updated = posts::update_body(&conn, post_id, user.id, &body)?;

    Ok(Json(updated).into_response())
}

/// DELETE /posts/{post_id} — delete one of your own posts.
async fn delete_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<i64>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    posts::delete(&conn, post_id, user.id)?;

    Ok((StatusCode::OK, "").into_response())
}
