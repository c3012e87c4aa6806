use super::DBClient;
use crate::models::Bookmark;
use chrono::{DateTime, Utc};

/// A bookmark joined with the listing view of its article. The viewer is
/// the bookmark's owner, so `is_bookmarked` is true by construction.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BookmarkRecord {
    pub bookmark_id: i64,
    pub bookmark_created_at: DateTime<Utc>,
    pub id: i64,
    pub title: String,
    pub category_id: i64,
    pub category_name: String,
    pub category_slug: String,
    pub image_url: Option<String>,
    pub author_name: String,
    pub source_url: Option<String>,
    pub published_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Bookmark database operations
pub trait BookmarkExt {
    /// The user's bookmarks, newest first, with their articles.
    async fn get_bookmarks(&self, user_id: i64) -> Result<Vec<BookmarkRecord>, sqlx::Error>;

    async fn find_bookmark(
        &self,
        user_id: i64,
        article_id: i64,
    ) -> Result<Option<Bookmark>, sqlx::Error>;

    async fn create_bookmark(
        &self,
        user_id: i64,
        article_id: i64,
    ) -> Result<Bookmark, sqlx::Error>;

    async fn delete_bookmark(&self, user_id: i64, article_id: i64) -> Result<(), sqlx::Error>;
}

impl BookmarkExt for DBClient {
    async fn get_bookmarks(&self, user_id: i64) -> Result<Vec<BookmarkRecord>, sqlx::Error> {
        sqlx::query_as::<_, BookmarkRecord>(
            r#"
            SELECT bm.id AS bookmark_id, bm.created_at AS bookmark_created_at,
                   a.id, a.title, a.category_id,
                   c.name AS category_name, c.slug AS category_slug,
                   a.image_url, a.author_name, a.source_url,
                   a.published_date, a.created_at, a.updated_at
            FROM bookmarks bm
            JOIN articles a ON a.id = bm.article_id
            JOIN categories c ON c.id = a.category_id
            WHERE bm.user_id = $1
            ORDER BY bm.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn find_bookmark(
        &self,
        user_id: i64,
        article_id: i64,
    ) -> Result<Option<Bookmark>, sqlx::Error> {
        sqlx::query_as::<_, Bookmark>(
            r#"
            SELECT id, user_id, article_id, created_at
            FROM bookmarks
            WHERE user_id = $1 AND article_id = $2
            "#,
        )
        .bind(user_id)
        .bind(article_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn create_bookmark(
        &self,
        user_id: i64,
        article_id: i64,
    ) -> Result<Bookmark, sqlx::Error> {
        sqlx::query_as::<_, Bookmark>(
            r#"
            INSERT INTO bookmarks (user_id, article_id)
            VALUES ($1, $2)
            RETURNING id, user_id, article_id, created_at
            "#,
        )
        .bind(user_id)
        .bind(article_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn delete_bookmark(&self, user_id: i64, article_id: i64) -> Result<(), sqlx::Error> {
        let result = sqlx::query("DELETE FROM bookmarks WHERE user_id = $1 AND article_id = $2")
            .bind(user_id)
            .bind(article_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        Ok(())
    }
}
