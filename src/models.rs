use chrono::prelude::*;
use serde::{Deserialize, Serialize};

/// User role for role-based access control.
///
/// Stored in the database as the PostgreSQL ENUM type `user_role`
/// (variants lowercased, `Admin` -> `admin`).
#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    User,
}

impl UserRole {
    pub fn to_str(&self) -> &str {
        match self {
            UserRole::Admin => "admin",
            UserRole::User => "user",
        }
    }
}

/// Kind of administrative mutation recorded in the audit log.
///
/// Stored as the PostgreSQL ENUM type `admin_action` (uppercase variants).
#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "admin_action", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum AdminAction {
    Create,
    Update,
    Delete,
}

impl AdminAction {
    pub fn to_str(&self) -> &str {
        match self {
            AdminAction::Create => "CREATE",
            AdminAction::Update => "UPDATE",
            AdminAction::Delete => "DELETE",
        }
    }
}

/// User row from the `users` table.
///
/// `password_hash` holds an argon2 PHC string, never plain text.
/// `reset_token` is a single-use password-reset token, cleared on use.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct User {
    pub id: i64,
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub avatar_url: Option<String>,
    pub reset_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Article row from the `articles` table.
///
/// `published_date` is the business date shown to readers and used for
/// listing order and date filters; `created_at`/`updated_at` are
/// system-managed. `author_name` is display text, not a `users` reference.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub category_id: i64,
    pub image_url: Option<String>,
    pub author_name: String,
    pub source_url: Option<String>,
    pub published_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

/// Bookmark row: one `(user, article)` pair, unique per pair.
/// Removed when either the owning user or the article is deleted.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Bookmark {
    pub id: i64,
    pub user_id: i64,
    pub article_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Audit log row for an administrative article mutation. Append-only.
///
/// `article_id` is a weak reference: it is set to NULL when the article is
/// deleted, while the log row itself survives.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct AdminLog {
    pub id: i64,
    pub admin_user_id: i64,
    pub action_type: AdminAction,
    pub article_id: Option<i64>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}
