use rusqlite::{params, Connection, OptionalExtension};

use crate::db::is_fk_violation;
use crate::db::models::Post;
use crate::error::AppError;

pub struct NewPost {
    pub title: String,
    pub body: String,
    pub image_path: Option<String>,
}

fn row_to_post(row: &rusqlite::Row) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        title: row.get(1)?,
        body: row.get(2)?,
        image_path: row.get(3)?,
        created_at: row.get(4)?,
        user_id: row.get(5)?,
    })
}

pub fn create(conn: &Connection, user_id: i64, new_post: NewPost) -> Result<Post, AppError> {
    conn.execute(
        "INSERT INTO posts (title, body, image_path, user_id) VALUES (?1, ?2, ?3, ?4)",
        params![new_post.title, new_post.body, new_post.image_path, user_id],
    )
    .map_err(|e| {
        if is_fk_violation(&e) {
            AppError::NotFound
        } else {
            AppError::Database(e)
        }
    })?;

    let id = conn.last_insert_rowid();
    get(conn, id)?.ok_or(AppError::NotFound)
}

pub fn get(conn: &Connection, post_id: i64) -> Result<Option<Post>, AppError> {
    let post = conn
        .query_row(
            "SELECT id, title, body, image_path, created_at, user_id FROM posts WHERE id = ?1",
            params![post_id],
            row_to_post,
        )
        .optional()?;
    Ok(post)
}

pub fn exists(conn: &Connection, post_id: i64) -> Result<bool, AppError> {
    let found: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM posts WHERE id = ?1",
        params![post_id],
        |row| row.get(0),
    )?;
    Ok(found)
}

/// Update a post's body. The mutation is scoped to the owner; a miss
/// (absent post or someone else's) reports NotFound either way.
pub fn update_body(
    conn: &Connection,
    post_id: i64,
    user_id: i64,
    body: &str,
) -> Result<Post, AppError> {
    let updated = conn.execute(
        "UPDATE posts SET body = ?1 WHERE id = ?2 AND user_id = ?3",
        params![body, post_id, user_id],
    )?;
    if updated == 0 {
        return Err(AppError::NotFound);
    }

    get(conn, post_id)?.ok_or(AppError::NotFound)
}

/// Delete a post. Owner-scoped like [`update_body`]; comments and
/// likes on the post go with it (cascade).
pub fn delete(conn: &Connection, post_id: i64, user_id: i64) -> Result<(), AppError> {
    let deleted = conn.execute(
        "DELETE FROM posts WHERE id = ?1 AND user_id = ?2",
        params![post_id, user_id],
    )?;
    if deleted == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}
