use super::DBClient;
use crate::models::Tag;

/// Tag database operations
pub trait TagExt {
    async fn get_tags(&self) -> Result<Vec<Tag>, sqlx::Error>;

    async fn get_tag(&self, tag_id: i64) -> Result<Option<Tag>, sqlx::Error>;

    async fn get_tag_by_slug(&self, slug: &str) -> Result<Option<Tag>, sqlx::Error>;

    async fn create_tag(&self, name: &str, slug: &str) -> Result<Tag, sqlx::Error>;

    async fn update_tag(
        &self,
        tag_id: i64,
        name: Option<&str>,
        slug: Option<&str>,
    ) -> Result<Tag, sqlx::Error>;

    /// Deleting a tag also removes its article associations (FK cascade).
    async fn delete_tag(&self, tag_id: i64) -> Result<(), sqlx::Error>;
}

impl TagExt for DBClient {
    async fn get_tags(&self) -> Result<Vec<Tag>, sqlx::Error> {
        sqlx::query_as::<_, Tag>("SELECT id, name, slug FROM tags ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await
    }

    async fn get_tag(&self, tag_id: i64) -> Result<Option<Tag>, sqlx::Error> {
        sqlx::query_as::<_, Tag>("SELECT id, name, slug FROM tags WHERE id = $1")
            .bind(tag_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_tag_by_slug(&self, slug: &str) -> Result<Option<Tag>, sqlx::Error> {
        sqlx::query_as::<_, Tag>("SELECT id, name, slug FROM tags WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
    }

    async fn create_tag(&self, name: &str, slug: &str) -> Result<Tag, sqlx::Error> {
        sqlx::query_as::<_, Tag>(
            "INSERT INTO tags (name, slug) VALUES ($1, $2) RETURNING id, name, slug",
        )
        .bind(name)
        .bind(slug)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_tag(
        &self,
        tag_id: i64,
        name: Option<&str>,
        slug: Option<&str>,
    ) -> Result<Tag, sqlx::Error> {
        sqlx::query_as::<_, Tag>(
            r#"
            UPDATE tags
            SET name = COALESCE($2, name), slug = COALESCE($3, slug)
            WHERE id = $1
            RETURNING id, name, slug
            "#,
        )
        .bind(tag_id)
        .bind(name)
        .bind(slug)
        .fetch_one(&self.pool)
        .await
    }

    async fn delete_tag(&self, tag_id: i64) -> Result<(), sqlx::Error> {
        let result = sqlx::query("DELETE FROM tags WHERE id = $1")
            .bind(tag_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        Ok(())
    }
}
