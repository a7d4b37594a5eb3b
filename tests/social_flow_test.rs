//! Posts, likes, comments, and feed aggregation against a file-backed
//! database, including the duplicate-like race.

use std::sync::{Arc, Barrier};

use tempfile::TempDir;

use murmur::db;
use murmur::db::posts::{self, NewPost};
use murmur::db::users::{self, NewUser};
use murmur::db::{comments, likes};
use murmur::error::AppError;
use murmur::feed;
use murmur::state::DbPool;

fn setup() -> (TempDir, DbPool) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let pool = db::create_pool(&db_path).expect("Failed to create test database");
    db::run_migrations(&pool).expect("Failed to run migrations");
    (temp_dir, pool)
}

fn register(pool: &DbPool, username: &str) -> i64 {
    let conn = pool.get().unwrap();
    users::create(
        &conn,
        NewUser {
            full_name: format!("{} Example", username),
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password_hash: "hash".to_string(),
        },
    )
    .unwrap()
    .id
}

fn publish(pool: &DbPool, user_id: i64, title: &str) -> i64 {
    let conn = pool.get().unwrap();
    posts::create(
        &conn,
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
fn rapid_duplicate_likes_leave_exactly_one_row() {
    let (_tmp, pool) = setup();
    let alice = register(&pool, "alice");
    let bob = register(&pool, "bob");
    let post = publish(&pool, alice, "race me");

    // Bob likes the post twice, concurrently: both threads pass a
    // pre-check taken before either insert lands, so the UNIQUE
    // constraint is what settles the race.
    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let pool = pool.clone();
            let barrier = barrier.clone();
            std::thread::spawn(move || {
                let conn = pool.get().unwrap();
                barrier.wait();
                likes::create(&conn, bob, post)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one like must win: {:?}", results);
    for r in results {
        if let Err(e) = r {
            assert!(matches!(e, AppError::Conflict(_)), "got: {:?}", e);
        }
    }

    let conn = pool.get().unwrap();
    assert_eq!(likes::count_for_post(&conn, post).unwrap(), 1);
}

#[test]
fn feed_counters_follow_likes_and_comments() {
    let (_tmp, pool) = setup();
    let alice = register(&pool, "alice");
    let bob = register(&pool, "bob");
    let carol = register(&pool, "carol");
    let dave = register(&pool, "dave");

    let post = publish(&pool, alice, "popular");
    let conn = pool.get().unwrap();
    likes::create(&conn, bob, post).unwrap();
    likes::create(&conn, carol, post).unwrap();
    likes::create(&conn, dave, post).unwrap();
    comments::create(&conn, bob, post, "nice").unwrap();
    comments::create(&conn, carol, post, "agreed").unwrap();

    let feed = feed::global_feed(&conn, bob).unwrap();
    assert_eq!(feed.len(), 1);
    let counters = &feed[0].counters;
    assert_eq!(counters.like_count, 3);
    assert_eq!(counters.comment_count, 2);
    assert!(counters.viewer_has_liked);

    // Alice never liked her own post
    let own = feed::user_feed(&conn, alice, alice).unwrap();
    assert!(!own[0].counters.viewer_has_liked);
    assert_eq!(own[0].counters.like_count, 3);
}

#[test]
fn global_feed_hides_own_posts_and_orders_newest_first() {
    let (_tmp, pool) = setup();
    let alice = register(&pool, "alice");
    let bob = register(&pool, "bob");

    publish(&pool, alice, "alice talks");
    let b1 = publish(&pool, bob, "bob one");
    let b2 = publish(&pool, bob, "bob two");

    let conn = pool.get().unwrap();
    let feed = feed::global_feed(&conn, alice).unwrap();
    let ids: Vec<i64> = feed.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![b2, b1]);
    assert!(feed.iter().all(|p| p.author.id == bob));
}

#[test]
fn non_owner_delete_leaves_post_intact() {
    let (_tmp, pool) = setup();
    let alice = register(&pool, "alice");
    let bob = register(&pool, "bob");
    let post = publish(&pool, alice, "keep me");

    let conn = pool.get().unwrap();
    let err = posts::delete(&conn, post, bob).unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    let still_there = posts::get(&conn, post).unwrap();
    assert!(still_there.is_some());
    assert_eq!(still_there.unwrap().title, "keep me");
}

#[test]
fn unlike_then_relike_works() {
    let (_tmp, pool) = setup();
    let alice = register(&pool, "alice");
    let bob = register(&pool, "bob");
    let post = publish(&pool, alice, "toggle");

    let conn = pool.get().unwrap();
    let like = likes::create(&conn, bob, post).unwrap();
    likes::delete(&conn, like.id, bob).unwrap();
    assert_eq!(likes::count_for_post(&conn, post).unwrap(), 0);

    likes::create(&conn, bob, post).unwrap();
    assert_eq!(likes::count_for_post(&conn, post).unwrap(), 1);
}

#[test]
fn comment_on_missing_post_writes_nothing() {
    let (_tmp, pool) = setup();
    let alice = register(&pool, "alice");

    let conn = pool.get().unwrap();
    let err = comments::create(&conn, alice, 12345, "into the void").unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM comments", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 0);
}
