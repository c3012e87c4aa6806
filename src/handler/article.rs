use std::collections::HashMap;

use crate::{
    AppState,
    db::{ArticleExt, ArticleFilter, ArticleRecord, ArticleTagRow, CategoryExt, NewArticle, UpdateArticle},
    dtos::{
        ArticleDto, ArticleListItemDto, ArticleListResponseDto, ArticleMutationResponseDto,
        ArticlesQueryParams, CategoryDto, CreateArticleDto, ExportFormat, ExportQueryParams,
        Response, SummaryDto, TagDto, UpdateArticleDto,
    },
    error::{ErrorMessage, HttpError},
    export::{export_filename, generate_article_pdf, generate_article_txt},
    middleware::{JWTAuthMiddleware, OptionalAuth, auth, maybe_auth, role_check},
    models::{Tag, UserRole},
};
use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use chrono::{DateTime, NaiveDate, Utc};
use tracing::instrument;
use validator::Validate;

pub fn article_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(get_articles).route_layer(middleware::from_fn_with_state(
                app_state.clone(),
                maybe_auth,
            )),
        )
        .route(
            "/",
            post(create_article)
                .route_layer(middleware::from_fn(|req, next| {
                    role_check(req, next, vec![UserRole::Admin])
                }))
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/{article_id}",
            get(get_article).route_layer(middleware::from_fn_with_state(
                app_state.clone(),
                maybe_auth,
            )),
        )
        .route(
            "/{article_id}",
            put(update_article)
                .delete(delete_article)
                .route_layer(middleware::from_fn(|req, next| {
                    role_check(req, next, vec![UserRole::Admin])
                }))
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/{article_id}/export",
            get(export_article)
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
}

/// `ceil(total / limit)` in integer arithmetic; zero matches mean zero pages.
fn total_pages(total: i64, limit: i64) -> i64 {
    (total + limit - 1) / limit
}

/// Accept an RFC 3339 timestamp (trailing `Z` included) or a bare
/// `YYYY-MM-DD`, read as midnight UTC.
fn parse_date_bound(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    value
        .parse::<NaiveDate>()
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Group the joined tag rows by article id.
fn group_tags(rows: Vec<ArticleTagRow>) -> HashMap<i64, Vec<Tag>> {
    let mut by_article: HashMap<i64, Vec<Tag>> = HashMap::new();
    for row in rows {
        let article_id = row.article_id;
        by_article.entry(article_id).or_default().push(row.into_tag());
    }
    by_article
}

fn record_category(record: &ArticleRecord) -> CategoryDto {
    CategoryDto {
        id: record.category_id,
        name: record.category_name.clone(),
        slug: record.category_slug.clone(),
    }
}

/// Listing view: everything but the body text.
pub fn to_list_item(record: &ArticleRecord, tags: &[Tag]) -> ArticleListItemDto {
    ArticleListItemDto {
        id: record.id,
        title: record.title.clone(),
        category: record_category(record),
        image_url: record.image_url.clone(),
        author_name: record.author_name.clone(),
        source_url: record.source_url.clone(),
        published_date: record.published_date,
        created_at: record.created_at,
        updated_at: record.updated_at,
        tags: TagDto::from_models(tags),
        is_bookmarked: record.is_bookmarked,
    }
}

fn to_article_dto(record: &ArticleRecord, tags: &[Tag]) -> ArticleDto {
    ArticleDto {
        id: record.id,
        title: record.title.clone(),
        content: record.content.clone().unwrap_or_default(),
        category: record_category(record),
        image_url: record.image_url.clone(),
        author_name: record.author_name.clone(),
        source_url: record.source_url.clone(),
        published_date: record.published_date,
        created_at: record.created_at,
        updated_at: record.updated_at,
        tags: TagDto::from_models(tags),
        is_bookmarked: record.is_bookmarked,
    }
}

/// Fetch one article with its tags, as the given viewer sees it.
async fn fetch_article_dto(
    app_state: &AppState,
    article_id: i64,
    viewer_id: Option<i64>,
) -> Result<ArticleDto, HttpError> {
    let record = app_state
        .db_client
        .get_article(article_id, viewer_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting article: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found(ErrorMessage::ArticleNotFound.to_string()))?;

    let tag_rows = app_state
        .db_client
        .tags_for_articles(&[article_id])
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting article tags: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let mut tags_by_article = group_tags(tag_rows);
    let tags = tags_by_article.remove(&article_id).unwrap_or_default();

    Ok(to_article_dto(&record, &tags))
}

/// Filtered, paginated article listing.
///
/// Anonymous callers get `is_bookmarked: false` everywhere; a resolved
/// identity personalizes the flag per article.
#[instrument(skip(app_state, identity))]
pub async fn get_articles(
    Query(params): Query<ArticlesQueryParams>,
    State(app_state): State<AppState>,
    Extension(OptionalAuth(identity)): Extension<OptionalAuth>,
) -> Result<impl IntoResponse, HttpError> {
    params.validate().map_err(|e| {
        tracing::error!("Invalid articles query: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let page = params.page.unwrap_or(1);
    let limit = params.limit.unwrap_or(10);

    let date_from = match params.date_from.as_deref() {
        Some(raw) => Some(
            parse_date_bound(raw)
                .ok_or_else(|| HttpError::bad_request("Invalid date_from format"))?,
        ),
        None => None,
    };
    let date_to = match params.date_to.as_deref() {
        Some(raw) => Some(
            parse_date_bound(raw)
                .ok_or_else(|| HttpError::bad_request("Invalid date_to format"))?,
        ),
        None => None,
    };

    let filter = ArticleFilter {
        search: params.search.clone(),
        category_id: params.category_id,
        date_from,
        date_to,
    };

    let viewer_id = identity.as_ref().map(|user| user.id);

    let total = app_state
        .db_client
        .count_articles(&filter)
        .await
        .map_err(|e| {
            tracing::error!("DB error, counting articles: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let records = app_state
        .db_client
        .list_articles(&filter, page, limit, viewer_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, listing articles: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let article_ids: Vec<i64> = records.iter().map(|record| record.id).collect();
    let tag_rows = app_state
        .db_client
        .tags_for_articles(&article_ids)
        .await
        .map_err(|e| {
            tracing::error!("DB error, listing article tags: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let mut tags_by_article = group_tags(tag_rows);
    let items = records
        .iter()
        .map(|record| {
            let tags = tags_by_article.remove(&record.id).unwrap_or_default();
            to_list_item(record, &tags)
        })
        .collect();

    Ok(Json(ArticleListResponseDto {
        items,
        total,
        page,
        limit,
        pages: total_pages(total, limit),
    }))
}

/// Single article with its full body.
#[instrument(skip(app_state, identity))]
pub async fn get_article(
    Path(article_id): Path<i64>,
    State(app_state): State<AppState>,
    Extension(OptionalAuth(identity)): Extension<OptionalAuth>,
) -> Result<impl IntoResponse, HttpError> {
    let viewer_id = identity.as_ref().map(|user| user.id);
    let article = fetch_article_dto(&app_state, article_id, viewer_id).await?;
    Ok(Json(article))
}

#[instrument(skip(app_state, jwt, body), fields(admin_id = %jwt.user.id))]
pub async fn create_article(
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
    Json(body): Json<CreateArticleDto>,
) -> Result<impl IntoResponse, HttpError> {
    let mut errors = body.validation_errors();

    let published_date = match parse_date_bound(&body.published_date) {
        Some(parsed) => Some(parsed),
        None => {
            errors.push("Published date must be a valid ISO-8601 timestamp".to_string());
            None
        }
    };

    // Resolve the category before writing anything, so an unknown id is a
    // validation failure and never a foreign-key error mid-transaction.
    if let Some(category_id) = body.category_id {
        let category = app_state
            .db_client
            .get_category(category_id)
            .await
            .map_err(|e| {
                tracing::error!("DB error, getting category: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            })?;
        if category.is_none() {
            errors.push("Category not found".to_string());
        }
    }

    if !errors.is_empty() {
        tracing::error!("Invalid create_article input: {}", errors.join("; "));
        return Err(HttpError::bad_request(errors.join("; ")));
    }

    let new_article = NewArticle {
        title: body.title.clone(),
        content: body.content.clone(),
        category_id: body.category_id.unwrap(),
        author_name: body.author_name.clone(),
        source_url: body.source_url.clone(),
        image_url: body.image_url.clone(),
        published_date: published_date.unwrap(),
        tag_ids: body.tag_ids.clone().unwrap_or_default(),
    };

    let (article_id, log) = app_state
        .db_client
        .create_article(&new_article, jwt.user.id)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                HttpError::bad_request("Category not found")
            }
            _ => {
                tracing::error!("DB error, creating article: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
        })?;

    let article = fetch_article_dto(&app_state, article_id, None).await?;

    tracing::info!(
        article_id,
        log_id = log.id,
        action = log.action_type.to_str(),
        "Article created"
    );
    Ok((
        StatusCode::CREATED,
        Json(ArticleMutationResponseDto {
            message: "Article created successfully".to_string(),
            article,
        }),
    ))
}

/// Partial update; only the fields present in the body are touched.
#[instrument(skip(app_state, jwt, body), fields(admin_id = %jwt.user.id))]
pub async fn update_article(
    Path(article_id): Path<i64>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
    Json(body): Json<UpdateArticleDto>,
) -> Result<impl IntoResponse, HttpError> {
    let mut errors = body.validation_errors();

    let published_date = match body.published_date.as_deref() {
        Some(raw) => match parse_date_bound(raw) {
            Some(parsed) => Some(parsed),
            None => {
                errors.push("Published date must be a valid ISO-8601 timestamp".to_string());
                None
            }
        },
        None => None,
    };

    if let Some(category_id) = body.category_id {
        let category = app_state
            .db_client
            .get_category(category_id)
            .await
            .map_err(|e| {
                tracing::error!("DB error, getting category: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            })?;
        if category.is_none() {
            errors.push("Category not found".to_string());
        }
    }

    if !errors.is_empty() {
        tracing::error!("Invalid update_article input: {}", errors.join("; "));
        return Err(HttpError::bad_request(errors.join("; ")));
    }

    let changes = UpdateArticle {
        title: body.title.clone(),
        content: body.content.clone(),
        category_id: body.category_id,
        author_name: body.author_name.clone(),
        source_url: body.source_url.clone(),
        image_url: body.image_url.clone(),
        published_date,
        tag_ids: body.tag_ids.clone(),
    };

    let log = app_state
        .db_client
        .update_article(article_id, &changes, jwt.user.id)
        .await
        .map_err(|e| match &e {
            sqlx::Error::RowNotFound => {
                HttpError::not_found(ErrorMessage::ArticleNotFound.to_string())
            }
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                HttpError::bad_request("Category not found")
            }
            _ => {
                tracing::error!("DB error, updating article: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
        })?;

    let article = fetch_article_dto(&app_state, article_id, None).await?;

    tracing::info!(
        article_id,
        log_id = log.id,
        action = log.action_type.to_str(),
        "Article updated"
    );
    Ok(Json(ArticleMutationResponseDto {
        message: "Article updated successfully".to_string(),
        article,
    }))
}

#[instrument(skip(app_state, jwt), fields(admin_id = %jwt.user.id))]
pub async fn delete_article(
    Path(article_id): Path<i64>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let log = app_state
        .db_client
        .delete_article(article_id, jwt.user.id)
        .await
        .map_err(|e| match &e {
            sqlx::Error::RowNotFound => {
                HttpError::not_found(ErrorMessage::ArticleNotFound.to_string())
            }
            _ => {
                tracing::error!("DB error, deleting article: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
        })?;

    tracing::info!(
        article_id,
        log_id = log.id,
        action = log.action_type.to_str(),
        "Article deleted"
    );
    Ok(Json(Response {
        message: "Article deleted successfully".to_string(),
    }))
}

/// Export the article as a downloadable PDF or plain-text file.
///
/// The optional `summary` query parameter carries a JSON facet map from a
/// prior summarize call; it is rendered only when `include_summary` is true.
#[instrument(skip(app_state, jwt, params), fields(user_id = %jwt.user.id))]
pub async fn export_article(
    Path(article_id): Path<i64>,
    Query(params): Query<ExportQueryParams>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let article = fetch_article_dto(&app_state, article_id, Some(jwt.user.id)).await?;

    let include_summary = params.include_summary.unwrap_or(false);
    let summary: Option<SummaryDto> = match (&params.summary, include_summary) {
        (Some(raw), true) => Some(serde_json::from_str(raw).map_err(|e| {
            tracing::error!("Invalid summary payload: {}", e);
            HttpError::bad_request("Invalid summary payload")
        })?),
        _ => None,
    };

    let format = params.format.unwrap_or_default();
    let (bytes, content_type, filename) = match format {
        ExportFormat::Pdf => {
            let pdf = generate_article_pdf(&article, summary.as_ref()).map_err(|e| {
                tracing::error!("PDF generation error: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            })?;
            (pdf, "application/pdf", export_filename(&article.title, "pdf"))
        }
        ExportFormat::Txt => {
            let txt = generate_article_txt(&article, summary.as_ref());
            (txt, "text/plain; charset=utf-8", export_filename(&article.title, "txt"))
        }
    };

    tracing::info!(article_id, format = ?format, "Article exported");
    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_is_the_ceiling() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(1, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(25, 10), 3);
        assert_eq!(total_pages(25, 7), 4);
    }

    #[test]
    fn parse_date_bound_accepts_rfc3339_and_bare_dates() {
        let with_zone = parse_date_bound("2024-05-01T10:30:00Z").unwrap();
        assert_eq!(with_zone.to_rfc3339(), "2024-05-01T10:30:00+00:00");

        let offset = parse_date_bound("2024-05-01T10:30:00+07:00").unwrap();
        assert_eq!(offset.to_rfc3339(), "2024-05-01T03:30:00+00:00");

        let bare = parse_date_bound("2024-05-01").unwrap();
        assert_eq!(bare.to_rfc3339(), "2024-05-01T00:00:00+00:00");

        assert!(parse_date_bound("yesterday").is_none());
        assert!(parse_date_bound("").is_none());
    }

    #[test]
    fn group_tags_collects_per_article() {
        let rows = vec![
            ArticleTagRow {
                article_id: 1,
                id: 10,
                name: "politik".to_string(),
                slug: "politik".to_string(),
            },
            ArticleTagRow {
                article_id: 2,
                id: 11,
                name: "ekonomi".to_string(),
                slug: "ekonomi".to_string(),
            },
            ArticleTagRow {
                article_id: 1,
                id: 12,
                name: "daerah".to_string(),
                slug: "daerah".to_string(),
            },
        ];

        let grouped = group_tags(rows);
        assert_eq!(grouped[&1].len(), 2);
        assert_eq!(grouped[&2].len(), 1);
        assert_eq!(grouped[&1][0].name, "politik");
    }
}
