use serde::Serialize;

/// Full user record, including the password hash. Never serialized;
/// outward-facing responses go through [`UserProfile`].
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub profile_picture: Option<String>,
    pub bio: Option<String>,
    pub created_at: String,
}

/// What the API exposes about a user.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: i64,
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub profile_picture: Option<String>,
    pub bio: Option<String>,
    pub created_at: String,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        UserProfile {
            id: user.id,
            full_name: user.full_name,
            username: user.username,
            email: user.email,
            profile_picture: user.profile_picture,
            bio: user.bio,
            created_at: user.created_at,
        }
    }
}

/// Minimal author identity attached to posts and comments.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorRef {
    pub id: i64,
    pub username: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub image_path: Option<String>,
    pub created_at: String,
    pub user_id: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Comment {
    pub id: i64,
    pub body: String,
    pub created_at: String,
    pub user_id: i64,
    pub post_id: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Like {
    pub id: i64,
    pub user_id: i64,
    pub post_id: i64,
}
