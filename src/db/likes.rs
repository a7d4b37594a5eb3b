use rusqlite::{params, Connection};

use crate::db::models::Like;
use crate::db::{is_fk_violation, is_unique_violation, posts};
use crate::error::AppError;

/// Record that a user likes a post. At most one like per (user, post):
/// the pre-check gives the friendly rejection, the UNIQUE constraint
/// settles check-then-insert races without writing a second row.
pub fn create(conn: &Connection, user_id: i64, post_id: i64) -> Result<Like, AppError> {
    if !posts::exists(conn, post_id)? {
        return Err(AppError::NotFound);
    }

    let already: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM likes WHERE user_id = ?1 AND post_id = ?2",
        params![user_id, post_id],
        |row| row.get(0),
    )?;
    if already {
        return Err(AppError::Conflict("You already liked this post".into()));
    }

    conn.execute(
        "INSERT INTO likes (user_id, post_id) VALUES (?1, ?2)",
        params![user_id, post_id],
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("You already liked this post".into())
        } else if is_fk_violation(&e) {
            AppError::NotFound
        } else {
            AppError::Database(e)
        }
    })?;

    Ok(Like {
        id: conn.last_insert_rowid(),
        user_id,
        post_id,
    })
}

/// Remove a like by id. Owner-scoped; a miss reports NotFound whether
/// the like is absent or belongs to someone else.
pub fn delete(conn: &Connection, like_id: i64, user_id: i64) -> Result<(), AppError> {
    let deleted = conn.execute(
        "DELETE FROM likes WHERE id = ?1 AND user_id = ?2",
        params![like_id, user_id],
    )?;
    if deleted == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

pub fn count_for_post(conn: &Connection, post_id: i64) -> Result<i64, AppError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM likes WHERE post_id = ?1",
        params![post_id],
        |row| row.get(0),
    )?;
    Ok(count)
}
