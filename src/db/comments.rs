use rusqlite::{params, Connection};
use serde::Serialize;

use crate::db::models::{AuthorRef, Comment};
use crate::db::{is_fk_violation, posts};
use crate::error::AppError;

/// Comment joined with its author, as returned by the listing.
#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: i64,
    pub body: String,
    pub created_at: String,
    pub author: AuthorRef,
}

pub fn create(
    conn: &Connection,
    user_id: i64,
    post_id: i64,
    body: &str,
) -> Result<Comment, AppError> {
    // The referenced post must exist; a concurrent post delete between
    // this check and the insert trips the FK constraint instead.
    if !posts::exists(conn, post_id)? {
        return Err(AppError::NotFound);
    }

    conn.execute(
        "INSERT INTO comments (body, user_id, post_id) VALUES (?1, ?2, ?3)",
        params![body, user_id, post_id],
    )
    .map_err(|e| {
        if is_fk_violation(&e) {
            AppError::NotFound
        } else {
            AppError::Database(e)
        }
    })?;

    let id = conn.last_insert_rowid();
    let comment = conn.query_row(
        "SELECT id, body, created_at, user_id, post_id FROM comments WHERE id = ?1",
        params![id],
        |row| {
            Ok(Comment {
                id: row.get(0)?,
                body: row.get(1)?,
                created_at: row.get(2)?,
                user_id: row.get(3)?,
                post_id: row.get(4)?,
            })
        },
    )?;
    Ok(comment)
}

/// Owner-scoped delete; a miss reports NotFound whether the comment is
/// absent or owned by someone else.
pub fn delete(conn: &Connection, comment_id: i64, user_id: i64) -> Result<(), AppError> {
    let deleted = conn.execute(
        "DELETE FROM comments WHERE id = ?1 AND user_id = ?2",
        params![comment_id, user_id],
    )?;
    if deleted == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

/// All comments on a post, newest first, with their authors.
pub fn list_for_post(conn: &Connection, post_id: i64) -> Result<Vec<CommentView>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.body, c.created_at, u.id, u.username
         FROM comments c
         JOIN users u ON u.id = c.user_id
         WHERE c.post_id = ?1
         ORDER BY c.created_at DESC, c.id DESC",
    )?;

    let comments = stmt
        .query_map(params![post_id], |row| {
            Ok(CommentView {
                id: row.get(0)?,
                body: row.get(1)?,
                created_at: row.get(2)?,
                author: AuthorRef {
                    id: row.get(3)?,
                    username: row.get(4)?,
                },
            })
        })?
        .filter_map(|r| r.ok())
        .collect();

    Ok(comments)
}
