use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Form, Json, Router};
use serde::{Deserialize, Serialize};

use crate::auth::password;
use crate::db::users;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/auth/token", post(login_for_access_token))
}

/// POST /auth/token — verify credentials, issue a bearer token.
/// An unknown username and a wrong password are rejected identically.
async fn login_for_access_token(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let user = users::find_by_username(&conn, &form.username)?
        .filter(|u| password::verify_password(&form.password, &u.password_hash))
        .ok_or(AppError::Unauthorized)?;

    let token = state.tokens.issue(&user.username, user.id)?;

    Ok((
        StatusCode::OK,
        Json(TokenResponse {
            access_token: token,
            token_type: "bearer".to_string(),
        }),
    )
        .into_response())
}
