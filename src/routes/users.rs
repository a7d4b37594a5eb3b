use axum::extract::{Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;

use crate::auth::password;
use crate::db::models::UserProfile;
use crate::db::users::{self, NewUser, ProfileUpdate};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::state::AppState;
use crate::storage;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Default)]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
}

#[derive(Deserialize)]
pub struct PasswordUpdateRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub query: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/create_user", post(create_user))
        .route("/users/me", get(me).put(update_profile))
        .route("/users/me/change-password", put(change_password))
        .route("/users/upload-profile-picture", post(upload_profile_picture))
        .route("/users/search", get(search_users))
}

// -- Handlers --

/// POST /users/create_user — register a new account.
async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> AppResult<Response> {
    validate_registration(&req)?;

    let password_hash = password::hash_password(&req.password)?;
    let conn = state.db.get()?;
    let user = users::create(
        &conn,
        NewUser {
            full_name: req.full_name.trim().to_string(),
            username: req.username.trim().to_string(),
            email: req.email.trim().to_string(),
            password_hash,
        },
    )?;

    Ok((StatusCode::CREATED, Json(UserProfile::from(user))).into_response())
}

/// GET /users/me — the authenticated user's own profile.
async fn me(State(state): State<AppState>, user: CurrentUser) -> AppResult<Response> {
    let conn = state.db.get()?;
    let profile = users::find_by_id(&conn, user.id)?.ok_or(AppError::NotFound)?;

    Ok(Json(UserProfile::from(profile)).into_response())
}

/// PUT /users/me — partial profile update; omitted fields are kept.
async fn update_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<UpdateProfileRequest>,
) -> AppResult<Response> {
    if let Some(ref email) = req.email {
        if !is_plausible_email(email) {
            return Err(AppError::Validation("Invalid email address".into()));
        }
    }
    if let Some(ref username) = req.username {
        if username.trim().is_empty() {
            return Err(AppError::Validation("Username cannot be empty".into()));
        }
    }

    let conn = state.db.get()?;
    let updated = users::update_profile(
        &conn,
        user.id,
        ProfileUpdate {
            full_name: req.full_name,
            username: req.username,
            email: req.email,
            bio: req.bio,
        },
    )?;

    Ok(Json(UserProfile::from(updated)).into_response())
}

/// PUT /users/me/change-password. Already-issued tokens stay valid;
/// only the stored hash changes.
async fn change_password(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<PasswordUpdateRequest>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let record = users::find_by_id(&conn, user.id)?.ok_or(AppError::NotFound)?;

    if !password::verify_password(&req.current_password, &record.password_hash) {
        return Err(AppError::Validation("Incorrect current password".into()));
    }
    if req.new_password.chars().count() < 10 {
        return Err(AppError::Validation(
            "Password must be at least 10 characters".into(),
        ));
    }

    let hash = password::hash_password(&req.new_password)?;
    users::set_password_hash(&conn, user.id, &hash)?;

    Ok(Json(serde_json::json!({ "message": "Password updated successfully" })).into_response())
}

/// POST /users/upload-profile-picture — multipart upload, `file` field.
/// The file is written before the record is updated.
async fn upload_profile_picture(
    State(state): State<AppState>,
    user: CurrentUser,
    mut multipart: Multipart,
) -> AppResult<Response> {
    let mut upload: Option<(String, bytes::Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("picture").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Invalid multipart body: {}", e)))?;
            upload = Some((filename, data));
        }
    }

    let (filename, data) =
        upload.ok_or_else(|| AppError::Validation("Missing file field".into()))?;

    let path = storage::store_upload(
        state.config.uploads_path(),
        storage::PROFILE_PICTURES_DIR,
        user.id,
        &filename,
        &data,
    )?;

    let conn = state.db.get()?;
    users::set_profile_picture(&conn, user.id, &path)?;

    Ok(Json(serde_json::json!({ "profile_picture": path })).into_response())
}

/// GET /users/search?query= — substring match on username.
async fn search_users(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> AppResult<Response> {
    let query = params.query.trim();
    if query.is_empty() {
        return Err(AppError::Validation("Search query cannot be empty".into()));
    }

    let conn = state.db.get()?;
    let matches = users::search(&conn, query)?;

    Ok(Json(serde_json::json!({ "users": matches })).into_response())
}

// -- Validation --

fn validate_registration(req: &CreateUserRequest) -> Result<(), AppError> {
    if req.full_name.trim().is_empty() {
        return Err(AppError::Validation("Full name is required".into()));
    }
    if req.username.trim().is_empty() {
        return Err(AppError::Validation("Username is required".into()));
    }
    if !is_plausible_email(req.email.trim()) {
        return Err(AppError::Validation("Invalid email address".into()));
    }
    if req.password.chars().count() < 10 {
        return Err(AppError::Validation(
            "Password must be at least 10 characters".into(),
        ));
    }
    Ok(())
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}
