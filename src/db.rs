use sqlx::{Pool, Postgres};

mod user;
pub use user::UserExt;

mod article;
pub use article::{ArticleExt, ArticleFilter, ArticleRecord, ArticleTagRow, NewArticle, UpdateArticle};

mod category;
pub use category::CategoryExt;

mod tag;
pub use tag::TagExt;

mod bookmark;
pub use bookmark::{BookmarkExt, BookmarkRecord};

#[derive(Debug, Clone)]
pub struct DBClient {
    pool: Pool<Postgres>,
}
impl DBClient {
    pub fn new(pool: Pool<Postgres>) -> Self {
        DBClient { pool }
    }
}
