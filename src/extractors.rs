use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;

use crate::auth::{AuthError, TokenService};
use crate::db::users;
use crate::error::AppError;
use crate::state::AppState;

/// Represents the currently authenticated user.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
}

/// Resolve a raw bearer token to a live user record. Token claims alone
/// are not enough: the referenced user row must still exist.
pub fn resolve_bearer(
    conn: &rusqlite::Connection,
    tokens: &TokenService,
    raw_token: &str,
) -> Result<CurrentUser, AppError> {
    let claims = tokens.verify(raw_token)?;
    let user = users::find_by_id(conn, claims.id)?.ok_or(AuthError::SubjectNotFound)?;

    Ok(CurrentUser {
        id: user.id,
        username: user.username,
    })
}

/// Extractor that requires a valid `Authorization: Bearer` token.
/// Returns 401 on a missing token, a bad signature, an expired token,
/// or a token whose subject no longer exists.
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AuthError::MissingToken)?;

        let conn = state.db.get()?;
        resolve_bearer(&conn, &state.tokens, token)
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{TokenConfig, TokenService};
    use crate::db::test_pool;
    use crate::db::users::NewUser;

    fn service() -> TokenService {
        TokenService::new(&TokenConfig {
            secret: "test-secret".to_string(),
            ttl_minutes: 180,
        })
    }

    #[test]
    fn resolve_bearer_returns_live_user() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let user = users::create(
            &conn,
            NewUser {
                full_name: "Alice".into(),
                username: "alice".into(),
                email: "alice@example.com".into(),
                password_hash: "hash".into(),
            },
        )
        .unwrap();

        let tokens = service();
        let token = tokens.issue("alice", user.id).unwrap();

        let current = resolve_bearer(&conn, &tokens, &token).unwrap();
        assert_eq!(current.id, user.id);
        assert_eq!(current.username, "alice");
    }

    #[test]
    fn resolve_bearer_rejects_garbage_token() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let tokens = service();

        let err = resolve_bearer(&conn, &tokens, "garbage").unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }

    #[test]
    fn resolve_bearer_rejects_token_for_missing_user() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let tokens = service();

        // Valid signature, but no such user row
        let token = tokens.issue("ghost", 42).unwrap();
        let err = resolve_bearer(&conn, &tokens, &token).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }

    #[test]
    fn bearer_token_strips_scheme() {
        let request = axum::http::Request::builder()
            .header(header::AUTHORIZATION, "Bearer abc.def.ghi")
            .body(())
            .unwrap();
        let (parts, _) = request.into_parts();
        assert_eq!(bearer_token(&parts), Some("abc.def.ghi"));
    }

    #[test]
    fn bearer_token_rejects_other_schemes() {
        let request = axum::http::Request::builder()
            .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
            .body(())
            .unwrap();
        let (parts, _) = request.into_parts();
        assert_eq!(bearer_token(&parts), None);
    }
}
