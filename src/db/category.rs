use super::DBClient;
use crate::models::Category;

/// Category database operations
pub trait CategoryExt {
    async fn get_categories(&self) -> Result<Vec<Category>, sqlx::Error>;

    async fn get_category(&self, category_id: i64) -> Result<Option<Category>, sqlx::Error>;

    async fn get_category_by_slug(&self, slug: &str) -> Result<Option<Category>, sqlx::Error>;

    async fn create_category(&self, name: &str, slug: &str) -> Result<Category, sqlx::Error>;

    async fn update_category(
        &self,
        category_id: i64,
        name: Option<&str>,
        slug: Option<&str>,
    ) -> Result<Category, sqlx::Error>;

    /// Number of articles referencing this category; deletion is refused
    /// while it is non-zero.
    async fn count_category_articles(&self, category_id: i64) -> Result<i64, sqlx::Error>;

    async fn delete_category(&self, category_id: i64) -> Result<(), sqlx::Error>;
}

impl CategoryExt for DBClient {
    async fn get_categories(&self) -> Result<Vec<Category>, sqlx::Error> {
        sqlx::query_as::<_, Category>("SELECT id, name, slug FROM categories ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await
    }

    async fn get_category(&self, category_id: i64) -> Result<Option<Category>, sqlx::Error> {
        sqlx::query_as::<_, Category>("SELECT id, name, slug FROM categories WHERE id = $1")
            .bind(category_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_category_by_slug(&self, slug: &str) -> Result<Option<Category>, sqlx::Error> {
        sqlx::query_as::<_, Category>("SELECT id, name, slug FROM categories WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
    }

    async fn create_category(&self, name: &str, slug: &str) -> Result<Category, sqlx::Error> {
        sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name, slug) VALUES ($1, $2) RETURNING id, name, slug",
        )
        .bind(name)
        .bind(slug)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_category(
        &self,
        category_id: i64,
        name: Option<&str>,
        slug: Option<&str>,
    ) -> Result<Category, sqlx::Error> {
        sqlx::query_as::<_, Category>(
            r#"
            UPDATE categories
            SET name = COALESCE($2, name), slug = COALESCE($3, slug)
            WHERE id = $1
            RETURNING id, name, slug
            "#,
        )
        .bind(category_id)
        .bind(name)
        .bind(slug)
        .fetch_one(&self.pool)
        .await
    }

    async fn count_category_articles(&self, category_id: i64) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM articles WHERE category_id = $1")
            .bind(category_id)
            .fetch_one(&self.pool)
            .await
    }

    async fn delete_category(&self, category_id: i64) -> Result<(), sqlx::Error> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(category_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        Ok(())
    }
}
