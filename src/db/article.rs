use super::DBClient;
use crate::models::{AdminAction, AdminLog, Article, Tag};
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Postgres, QueryBuilder};

/// Optional filters for the article listing. Every filter is conjunctive;
/// an unknown category id simply matches nothing.
#[derive(Debug, Default, Clone)]
pub struct ArticleFilter {
    pub search: Option<String>,
    pub category_id: Option<i64>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
}

/// One article row joined with its category and the viewer's bookmark flag.
///
/// `content` is only selected by the single-article query; the listing query
/// leaves it out entirely and the column defaults to `None`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ArticleRecord {
    pub id: i64,
    pub title: String,
    #[sqlx(default)]
    pub content: Option<String>,
    pub category_id: i64,
    pub category_name: String,
    pub category_slug: String,
    pub image_url: Option<String>,
    pub author_name: String,
    pub source_url: Option<String>,
    pub published_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_bookmarked: bool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ArticleTagRow {
    pub article_id: i64,
    pub id: i64,
    pub name: String,
    pub slug: String,
}

impl ArticleTagRow {
    pub fn into_tag(self) -> Tag {
        Tag {
            id: self.id,
            name: self.name,
            slug: self.slug,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewArticle {
    pub title: String,
    pub content: String,
    pub category_id: i64,
    pub author_name: String,
    pub source_url: Option<String>,
    pub image_url: Option<String>,
    pub published_date: DateTime<Utc>,
    pub tag_ids: Vec<i64>,
}

#[derive(Debug, Default, Clone)]
pub struct UpdateArticle {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category_id: Option<i64>,
    pub author_name: Option<String>,
    pub source_url: Option<String>,
    pub image_url: Option<String>,
    pub published_date: Option<DateTime<Utc>>,
    pub tag_ids: Option<Vec<i64>>,
}

/// Article database operations.
///
/// Each mutation runs as a single transaction covering the entity write, the
/// tag-association changes, and the audit-log insert; a failure in any step
/// rolls the whole mutation back.
pub trait ArticleExt {
    async fn get_article(
        &self,
        article_id: i64,
        viewer_id: Option<i64>,
    ) -> Result<Option<ArticleRecord>, sqlx::Error>;

    /// Bare article row, without the category join or bookmark flag.
    /// Enough for consumers that only need the stored fields.
    async fn get_article_row(&self, article_id: i64) -> Result<Option<Article>, sqlx::Error>;

    /// One page of the filtered listing, newest `published_date` first
    /// (id as the deterministic tie-break). `content` is not selected.
    async fn list_articles(
        &self,
        filter: &ArticleFilter,
        page: i64,
        limit: i64,
        viewer_id: Option<i64>,
    ) -> Result<Vec<ArticleRecord>, sqlx::Error>;

    /// Total match count for the same filters, computed before pagination.
    async fn count_articles(&self, filter: &ArticleFilter) -> Result<i64, sqlx::Error>;

    /// Tags for a set of articles, one round trip.
    async fn tags_for_articles(
        &self,
        article_ids: &[i64],
    ) -> Result<Vec<ArticleTagRow>, sqlx::Error>;

    /// Insert the article, attach every tag id that resolves to an existing
    /// tag (unknown ids are dropped), and write the CREATE audit entry.
    async fn create_article(
        &self,
        article: &NewArticle,
        admin_user_id: i64,
    ) -> Result<(i64, AdminLog), sqlx::Error>;

    /// Partial update. A present `tag_ids` replaces the whole tag set.
    /// Writes the UPDATE audit entry.
    async fn update_article(
        &self,
        article_id: i64,
        changes: &UpdateArticle,
        admin_user_id: i64,
    ) -> Result<AdminLog, sqlx::Error>;

    /// Delete the article. The DELETE audit entry is written first, while
    /// the title is still readable; its article reference stays NULL since
    /// the row it would point at is gone by commit time. Bookmarks and tag
    /// associations cascade away with the article.
    async fn delete_article(
        &self,
        article_id: i64,
        admin_user_id: i64,
    ) -> Result<AdminLog, sqlx::Error>;
}

/// Escape LIKE/ILIKE wildcards so user input is matched literally.
/// Backslash is the default escape character in PostgreSQL patterns.
fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Append the WHERE clause shared by the listing and count queries.
///
/// Search is a case-insensitive substring match over title and content.
/// Date bounds are inclusive on both ends.
fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &ArticleFilter) {
    qb.push(" WHERE TRUE");

    if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", escape_like(search));
        qb.push(" AND (a.title ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR a.content ILIKE ");
        qb.push_bind(pattern);
        qb.push(")");
    }

    if let Some(category_id) = filter.category_id {
        qb.push(" AND a.category_id = ");
        qb.push_bind(category_id);
    }

    if let Some(date_from) = filter.date_from {
        qb.push(" AND a.published_date >= ");
        qb.push_bind(date_from);
    }

    if let Some(date_to) = filter.date_to {
        qb.push(" AND a.published_date <= ");
        qb.push_bind(date_to);
    }
}

/// Append the viewer-specific bookmark flag column.
fn push_bookmark_column(qb: &mut QueryBuilder<'_, Postgres>, viewer_id: Option<i64>) {
    match viewer_id {
        Some(viewer_id) => {
            qb.push(
                "EXISTS(SELECT 1 FROM bookmarks b WHERE b.article_id = a.id AND b.user_id = ",
            );
            qb.push_bind(viewer_id);
            qb.push(") AS is_bookmarked");
        }
        None => {
            qb.push("FALSE AS is_bookmarked");
        }
    }
}

async fn insert_admin_log(
    conn: &mut PgConnection,
    admin_user_id: i64,
    action: AdminAction,
    article_id: Option<i64>,
    description: &str,
) -> Result<AdminLog, sqlx::Error> {
    sqlx::query_as::<_, AdminLog>(
        r#"
        INSERT INTO admin_logs (admin_user_id, action_type, article_id, description)
        VALUES ($1, $2, $3, $4)
        RETURNING id, admin_user_id, action_type, article_id, description, created_at
        "#,
    )
    .bind(admin_user_id)
    .bind(action)
    .bind(article_id)
    .bind(description)
    .fetch_one(conn)
    .await
}

/// Attach every tag id that exists; ids that resolve to nothing are dropped.
async fn replace_article_tags(
    conn: &mut PgConnection,
    article_id: i64,
    tag_ids: &[i64],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM article_tags WHERE article_id = $1")
        .bind(article_id)
        .execute(&mut *conn)
        .await?;

    if tag_ids.is_empty() {
        return Ok(());
    }

    sqlx::query(
        r#"
        INSERT INTO article_tags (article_id, tag_id)
        SELECT $1, t.id FROM tags t WHERE t.id = ANY($2)
        "#,
    )
    .bind(article_id)
    .bind(tag_ids)
    .execute(conn)
    .await?;

    Ok(())
}

impl ArticleExt for DBClient {
    async fn get_article(
        &self,
        article_id: i64,
        viewer_id: Option<i64>,
    ) -> Result<Option<ArticleRecord>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT a.id, a.title, a.content, a.category_id,
                   c.name AS category_name, c.slug AS category_slug,
                   a.image_url, a.author_name, a.source_url,
                   a.published_date, a.created_at, a.updated_at,
            "#,
        );
        push_bookmark_column(&mut qb, viewer_id);
        qb.push(" FROM articles a JOIN categories c ON c.id = a.category_id WHERE a.id = ");
        qb.push_bind(article_id);

        qb.build_query_as::<ArticleRecord>()
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_article_row(&self, article_id: i64) -> Result<Option<Article>, sqlx::Error> {
        sqlx::query_as::<_, Article>(
            r#"
            SELECT id, title, content, category_id, image_url, author_name,
                   source_url, published_date, created_at, updated_at
            FROM articles
            WHERE id = $1
            "#,
        )
        .bind(article_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn list_articles(
        &self,
        filter: &ArticleFilter,
        page: i64,
        limit: i64,
        viewer_id: Option<i64>,
    ) -> Result<Vec<ArticleRecord>, sqlx::Error> {
        let offset = (page - 1) * limit;

        let mut qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT a.id, a.title, a.category_id,
                   c.name AS category_name, c.slug AS category_slug,
                   a.image_url, a.author_name, a.source_url,
                   a.published_date, a.created_at, a.updated_at,
            "#,
        );
        push_bookmark_column(&mut qb, viewer_id);
        qb.push(" FROM articles a JOIN categories c ON c.id = a.category_id");
        push_filters(&mut qb, filter);
        qb.push(" ORDER BY a.published_date DESC, a.id DESC LIMIT ");
        qb.push_bind(limit);
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        qb.build_query_as::<ArticleRecord>()
            .fetch_all(&self.pool)
            .await
    }

    async fn count_articles(&self, filter: &ArticleFilter) -> Result<i64, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM articles a");
        push_filters(&mut qb, filter);

        qb.build_query_scalar::<i64>().fetch_one(&self.pool).await
    }

    async fn tags_for_articles(
        &self,
        article_ids: &[i64],
    ) -> Result<Vec<ArticleTagRow>, sqlx::Error> {
        if article_ids.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_as::<_, ArticleTagRow>(
            r#"
            SELECT at.article_id, t.id, t.name, t.slug
            FROM article_tags at
            JOIN tags t ON t.id = at.tag_id
            WHERE at.article_id = ANY($1)
            ORDER BY t.name ASC
            "#,
        )
        .bind(article_ids)
        .fetch_all(&self.pool)
        .await
    }

    async fn create_article(
        &self,
        article: &NewArticle,
        admin_user_id: i64,
    ) -> Result<(i64, AdminLog), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let article_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO articles
                (title, content, category_id, author_name, source_url, image_url, published_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(&article.title)
        .bind(&article.content)
        .bind(article.category_id)
        .bind(&article.author_name)
        .bind(&article.source_url)
        .bind(&article.image_url)
        .bind(article.published_date)
        .fetch_one(&mut *tx)
        .await?;

        replace_article_tags(&mut tx, article_id, &article.tag_ids).await?;

        let log = insert_admin_log(
            &mut tx,
            admin_user_id,
            AdminAction::Create,
            Some(article_id),
            &format!("Created article: {}", article.title),
        )
        .await?;

        tx.commit().await?;

        Ok((article_id, log))
    }

    async fn update_article(
        &self,
        article_id: i64,
        changes: &UpdateArticle,
        admin_user_id: i64,
    ) -> Result<AdminLog, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let title: Option<String> = sqlx::query_scalar(
            r#"
            UPDATE articles
            SET title = COALESCE($2, title),
                content = COALESCE($3, content),
                category_id = COALESCE($4, category_id),
                author_name = COALESCE($5, author_name),
                source_url = COALESCE($6, source_url),
                image_url = COALESCE($7, image_url),
                published_date = COALESCE($8, published_date),
                updated_at = NOW()
            WHERE id = $1
            RETURNING title
            "#,
        )
        .bind(article_id)
        .bind(&changes.title)
        .bind(&changes.content)
        .bind(changes.category_id)
        .bind(&changes.author_name)
        .bind(&changes.source_url)
        .bind(&changes.image_url)
        .bind(changes.published_date)
        .fetch_optional(&mut *tx)
        .await?;

        let title = title.ok_or(sqlx::Error::RowNotFound)?;

        if let Some(tag_ids) = &changes.tag_ids {
            replace_article_tags(&mut tx, article_id, tag_ids).await?;
        }

        let log = insert_admin_log(
            &mut tx,
            admin_user_id,
            AdminAction::Update,
            Some(article_id),
            &format!("Updated article: {}", title),
        )
        .await?;

        tx.commit().await?;

        Ok(log)
    }

    async fn delete_article(
        &self,
        article_id: i64,
        admin_user_id: i64,
    ) -> Result<AdminLog, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let title: Option<String> =
            sqlx::query_scalar("SELECT title FROM articles WHERE id = $1")
                .bind(article_id)
                .fetch_optional(&mut *tx)
                .await?;

        let title = title.ok_or(sqlx::Error::RowNotFound)?;

        let log = insert_admin_log(
            &mut tx,
            admin_user_id,
            AdminAction::Delete,
            None,
            &format!("Deleted article: {}", title),
        )
        .await?;

        sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(article_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_like_neutralizes_wildcards() {
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like("c:\\temp"), "c:\\\\temp");
        assert_eq!(escape_like("plain"), "plain");
    }
}
