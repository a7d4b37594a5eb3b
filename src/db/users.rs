use rusqlite::{params, Connection, OptionalExtension};

use crate::db::models::User;
use crate::db::{is_unique_violation, models::UserProfile};
use crate::error::AppError;

const USER_COLUMNS: &str =
    "id, full_name, username, email, password_hash, profile_picture, bio, created_at";

pub struct NewUser {
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Default)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
}

fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        full_name: row.get(1)?,
        username: row.get(2)?,
        email: row.get(3)?,
        password_hash: row.get(4)?,
        profile_picture: row.get(5)?,
        bio: row.get(6)?,
        created_at: row.get(7)?,
    })
}

pub fn create(conn: &Connection, new_user: NewUser) -> Result<User, AppError> {
    if find_by_email(conn, &new_user.email)?.is_some() {
        return Err(AppError::Conflict("Email already registered".into()));
    }
    if find_by_username(conn, &new_user.username)?.is_some() {
        return Err(AppError::Conflict("Username already registered".into()));
    }

    conn.execute(
        "INSERT INTO users (full_name, username, email, password_hash)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            new_user.full_name,
            new_user.username,
            new_user.email,
            new_user.password_hash
        ],
    )
    .map_err(|e| {
        // The UNIQUE constraints settle registration races the
        // pre-checks can miss.
        if is_unique_violation(&e) {
            AppError::Conflict("Username or email already registered".into())
        } else {
            AppError::Database(e)
        }
    })?;

    let id = conn.last_insert_rowid();
    find_by_id(conn, id)?.ok_or(AppError::NotFound)
}

pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<User>, AppError> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id],
            row_to_user,
        )
        .optional()?;
    Ok(user)
}

pub fn find_by_username(conn: &Connection, username: &str) -> Result<Option<User>, AppError> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
            params![username],
            row_to_user,
        )
        .optional()?;
    Ok(user)
}

pub fn find_by_email(conn: &Connection, email: &str) -> Result<Option<User>, AppError> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
            params![email],
            row_to_user,
        )
        .optional()?;
    Ok(user)
}

/// Partial profile update; omitted fields keep their current value.
/// Last write wins when two updates race.
pub fn update_profile(
    conn: &Connection,
    user_id: i64,
    update: ProfileUpdate,
) -> Result<User, AppError> {
    let user = find_by_id(conn, user_id)?.ok_or(AppError::NotFound)?;

    if let Some(ref email) = update.email {
        if email != &user.email && find_by_email(conn, email)?.is_some() {
            return Err(AppError::Conflict("Email already in use".into()));
        }
    }
    if let Some(ref username) = update.username {
        if username != &user.username && find_by_username(conn, username)?.is_some() {
            return Err(AppError::Conflict("Username already taken".into()));
        }
    }

    conn.execute(
        "UPDATE users SET full_name = ?1, username = ?2, email = ?3, bio = ?4 WHERE id = ?5",
        params![
            update.full_name.unwrap_or(user.full_name),
            update.username.unwrap_or(user.username),
            update.email.unwrap_or(user.email),
            update.bio.or(user.bio),
            user_id
        ],
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("Username or email already in use".into())
        } else {
            AppError::Database(e)
        }
    })?;

    find_by_id(conn, user_id)?.ok_or(AppError::NotFound)
}

pub fn set_password_hash(conn: &Connection, user_id: i64, hash: &str) -> Result<(), AppError> {
    let updated = conn.execute(
        "UPDATE users SET password_hash = ?1 WHERE id = ?2",
        params![hash, user_id],
    )?;
    if updated == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

pub fn set_profile_picture(conn: &Connection, user_id: i64, path: &str) -> Result<(), AppError> {
    let updated = conn.execute(
        "UPDATE users SET profile_picture = ?1 WHERE id = ?2",
        params![path, user_id],
    )?;
    if updated == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

/// Case-insensitive substring search on username.
pub fn search(conn: &Connection, query: &str) -> Result<Vec<UserProfile>, AppError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users
         WHERE username LIKE '%' || ?1 || '%'
         ORDER BY username ASC"
    ))?;

    let users = stmt
        .query_map(params![query], row_to_user)?
        .filter_map(|r| r.ok())
        .map(UserProfile::from)
        .collect();

    Ok(users)
}
