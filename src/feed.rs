use rusqlite::{params, Connection};
use serde::Serialize;

use crate::db::models::AuthorRef;
use crate::db::users;
use crate::error::AppError;

/// Counters derived from the like and comment relations at read time.
/// Never persisted on the post itself.
#[derive(Debug, Clone, Serialize)]
pub struct PostCounters {
    pub like_count: i64,
    pub viewer_has_liked: bool,
    pub comment_count: i64,
}

/// A post as it appears in a feed: the stored entity joined with its
/// author plus viewer-relative counters.
#[derive(Debug, Clone, Serialize)]
pub struct FeedPost {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub image_path: Option<String>,
    pub created_at: String,
    pub author: AuthorRef,
    pub counters: PostCounters,
}

const FEED_SELECT: &str = "
    SELECT p.id, p.title, p.body, p.image_path, p.created_at,
           u.id, u.username,
           (SELECT COUNT(*) FROM likes l WHERE l.post_id = p.id) AS like_count,
           EXISTS(SELECT 1 FROM likes l WHERE l.post_id = p.id AND l.user_id = ?1)
               AS viewer_has_liked,
           (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comment_count
    FROM posts p
    JOIN users u ON u.id = p.user_id";

/// All posts by other users, newest first. Counters come from the same
/// statement as the selection, so every row reflects one snapshot.
pub fn global_feed(conn: &Connection, viewer_id: i64) -> Result<Vec<FeedPost>, AppError> {
    query_feed(
        conn,
        &format!(
            "{FEED_SELECT}
             WHERE p.user_id != ?2
             ORDER BY p.created_at DESC, p.id DESC"
        ),
        viewer_id,
        viewer_id,
    )
}

/// All posts by one user, newest first. Fails with NotFound when the
/// target user does not exist.
pub fn user_feed(
    conn: &Connection,
    viewer_id: i64,
    target_user_id: i64,
) -> Result<Vec<FeedPost>, AppError> {
    if users::find_by_id(conn, target_user_id)?.is_none() {
        return Err(AppError::NotFound);
    }

    query_feed(
        conn,
        &format!(
            "{FEED_SELECT}
             WHERE p.user_id = ?2
             ORDER BY p.created_at DESC, p.id DESC"
        ),
        viewer_id,
        target_user_id,
    )
}

fn query_feed(
    conn: &Connection,
    sql: &str,
    viewer_id: i64,
    scope_user_id: i64,
) -> Result<Vec<FeedPost>, AppError> {
    let mut stmt = conn.prepare(sql)?;

    let posts = stmt
        .query_map(params![viewer_id, scope_user_id], |row| {
            Ok(FeedPost {
                id: row.get(0)?,
                title: row.get(1)?,
                body: row.get(2)?,
                image_path: row.get(3)?,
                created_at: row.get(4)?,
                author: AuthorRef {
                    id: row.get(5)?,
                    username: row.get(6)?,
                },
                counters: PostCounters {
                    like_count: row.get(7)?,
                    viewer_has_liked: row.get(8)?,
                    comment_count: row.get(9)?,
                },
            })
        })?
        .filter_map(|r| r.ok())
        .collect();

    Ok(posts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::posts::{self, NewPost};
    use crate::db::test_pool;
    use crate::db::users::NewUser;
    use crate::db::{comments, likes};

    fn seed_user(conn: &Connection, username: &str) -> i64 {
        users::create(
            conn,
            NewUser {
                full_name: username.to_string(),
                username: username.to_string(),
                email: format!("{}@example.com", username),
                password_hash: "hash".to_string(),
            },
        )
        .unwrap()
        .id
    }

    fn seed_post(conn: &Connection, user_id: i64, title: &str) -> i64 {
        posts::create(
            conn,
            user_id,
            NewPost {
                title: title.to_string(),
                body: "body".to_string(),
                image_path: None,
            },
        )
        .unwrap()
        .id
    }

    #[test]
    fn global_feed_excludes_viewers_own_posts() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let alice = seed_user(&conn, "alice");
        let bob = seed_user(&conn, "bob");

        seed_post(&conn, alice, "mine");
        seed_post(&conn, bob, "theirs");

        let feed = global_feed(&conn, alice).unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].title, "theirs");
        assert_eq!(feed[0].author.username, "bob");
    }

    #[test]
    fn global_feed_is_newest_first_with_id_tiebreak() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let alice = seed_user(&conn, "alice");
        let bob = seed_user(&conn, "bob");

        let first = seed_post(&conn, bob, "first");
        let second = seed_post(&conn, bob, "second");
        let third = seed_post(&conn, bob, "third");

        // Same-second timestamps fall back to id order
        let feed = global_feed(&conn, alice).unwrap();
        let ids: Vec<i64> = feed.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![third, second, first]);
    }

    #[test]
    fn user_feed_contains_only_target_posts() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let alice = seed_user(&conn, "alice");
        let bob = seed_user(&conn, "bob");

        seed_post(&conn, alice, "alice post");
        seed_post(&conn, bob, "bob post");

        let feed = user_feed(&conn, alice, bob).unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].author.id, bob);

        // Viewing your own feed works too
        let own = user_feed(&conn, alice, alice).unwrap();
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].title, "alice post");
    }

    #[test]
    fn user_feed_for_missing_user_is_not_found() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let alice = seed_user(&conn, "alice");

        let err = user_feed(&conn, alice, 999).unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }

    #[test]
    fn counters_reflect_likes_and_comments() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let alice = seed_user(&conn, "alice");
        let bob = seed_user(&conn, "bob");
        let carol = seed_user(&conn, "carol");
        let dave = seed_user(&conn, "dave");

        let post = seed_post(&conn, alice, "popular");
        likes::create(&conn, bob, post).unwrap();
        likes::create(&conn, carol, post).unwrap();
        likes::create(&conn, dave, post).unwrap();
        comments::create(&conn, bob, post, "nice").unwrap();
        comments::create(&conn, carol, post, "agreed").unwrap();

        // Bob is among the likers
        let feed = global_feed(&conn, bob).unwrap();
        let p = &feed[0].counters;
        assert_eq!(p.like_count, 3);
        assert_eq!(p.comment_count, 2);
        assert!(p.viewer_has_liked);

        // A viewer who has not liked sees the same totals
        let eve = seed_user(&conn, "eve");
        let feed = global_feed(&conn, eve).unwrap();
        let p = &feed[0].counters;
        assert_eq!(p.like_count, 3);
        assert_eq!(p.comment_count, 2);
        assert!(!p.viewer_has_liked);
    }

    #[test]
    fn fresh_post_has_zero_counters() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let alice = seed_user(&conn, "alice");
        let bob = seed_user(&conn, "bob");

        seed_post(&conn, bob, "new");
        let feed = global_feed(&conn, alice).unwrap();
        let p = &feed[0].counters;
        assert_eq!(p.like_count, 0);
        assert_eq!(p.comment_count, 0);
        assert!(!p.viewer_has_liked);
    }
}
