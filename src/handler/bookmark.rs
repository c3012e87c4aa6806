use std::collections::HashMap;

use crate::{
    AppState,
    db::{ArticleExt, ArticleRecord, BookmarkExt, BookmarkRecord},
    dtos::{AddBookmarkDto, BookmarkDto, BookmarkListResponseDto, BookmarkResponseDto, Response},
    error::{ErrorMessage, HttpError},
    handler::article::to_list_item,
    middleware::{JWTAuthMiddleware, auth},
};
use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get},
};
use tracing::instrument;
use validator::Validate;

pub fn bookmark_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(get_bookmarks).post(add_bookmark))
        .route("/{article_id}", delete(remove_bookmark))
        .route_layer(middleware::from_fn_with_state(app_state, auth))
}

/// The bookmark's owner is the viewer, so the embedded article always
/// carries `is_bookmarked: true`.
fn to_bookmark_dto(record: &BookmarkRecord, tags_by_article: &mut HashMap<i64, Vec<crate::models::Tag>>) -> BookmarkDto {
    let article = ArticleRecord {
        id: record.id,
        title: record.title.clone(),
        content: None,
        category_id: record.category_id,
        category_name: record.category_name.clone(),
        category_slug: record.category_slug.clone(),
        image_url: record.image_url.clone(),
        author_name: record.author_name.clone(),
        source_url: record.source_url.clone(),
        published_date: record.published_date,
        created_at: record.created_at,
        updated_at: record.updated_at,
        is_bookmarked: true,
    };
    let tags = tags_by_article.remove(&record.id).unwrap_or_default();

    BookmarkDto {
        id: record.bookmark_id,
        article: to_list_item(&article, &tags),
        created_at: record.bookmark_created_at,
    }
}

/// The caller's bookmarks, newest first.
#[instrument(skip(app_state, jwt), fields(user_id = %jwt.user.id))]
pub async fn get_bookmarks(
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let records = app_state
        .db_client
        .get_bookmarks(jwt.user.id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, listing bookmarks: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let article_ids: Vec<i64> = records.iter().map(|record| record.id).collect();
    let tag_rows = app_state
        .db_client
        .tags_for_articles(&article_ids)
        .await
        .map_err(|e| {
            tracing::error!("DB error, listing bookmark tags: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let mut tags_by_article: HashMap<i64, Vec<crate::models::Tag>> = HashMap::new();
    for row in tag_rows {
        let article_id = row.article_id;
        tags_by_article
            .entry(article_id)
            .or_default()
            .push(row.into_tag());
    }

    let bookmarks = records
        .iter()
        .map(|record| to_bookmark_dto(record, &mut tags_by_article))
        .collect();

    Ok(Json(BookmarkListResponseDto { bookmarks }))
}

/// Bookmark an article. Re-bookmarking is a no-op, not an error.
#[instrument(skip(app_state, jwt, body), fields(user_id = %jwt.user.id))]
pub async fn add_bookmark(
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
    Json(body): Json<AddBookmarkDto>,
) -> Result<axum::response::Response, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid add_bookmark input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let article = app_state
        .db_client
        .get_article(body.article_id, Some(jwt.user.id))
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting article: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found(ErrorMessage::ArticleNotFound.to_string()))?;

    let existing = app_state
        .db_client
        .find_bookmark(jwt.user.id, body.article_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, checking bookmark: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    if existing.is_some() {
        return Ok(Json(Response {
            message: "Article already bookmarked".to_string(),
        })
        .into_response());
    }

    let bookmark = match app_state
        .db_client
        .create_bookmark(jwt.user.id, body.article_id)
        .await
    {
        Ok(bookmark) => bookmark,
        // a concurrent request won the race; same outcome as "already bookmarked"
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            return Ok(Json(Response {
                message: "Article already bookmarked".to_string(),
            })
            .into_response());
        }
        Err(e) => {
            tracing::error!("DB error, creating bookmark: {}", e);
            return Err(HttpError::server_error(
                ErrorMessage::ServerError.to_string(),
            ));
        }
    };

    let tag_rows = app_state
        .db_client
        .tags_for_articles(&[article.id])
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting article tags: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let tags: Vec<crate::models::Tag> = tag_rows.into_iter().map(|row| row.into_tag()).collect();

    let mut bookmarked = article;
    bookmarked.is_bookmarked = true;
    bookmarked.content = None;

    tracing::info!(bookmark_id = bookmark.id, article_id = body.article_id, "Bookmark added");
    Ok((
        StatusCode::CREATED,
        Json(BookmarkResponseDto {
            message: "Bookmark added successfully".to_string(),
            bookmark: BookmarkDto {
                id: bookmark.id,
                article: to_list_item(&bookmarked, &tags),
                created_at: bookmark.created_at,
            },
        }),
    )
        .into_response())
}

#[instrument(skip(app_state, jwt), fields(user_id = %jwt.user.id))]
pub async fn remove_bookmark(
    Path(article_id): Path<i64>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .db_client
        .delete_bookmark(jwt.user.id, article_id)
        .await
        .map_err(|e| match &e {
            sqlx::Error::RowNotFound => HttpError::not_found("Bookmark not found"),
            _ => {
                tracing::error!("DB error, deleting bookmark: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
        })?;

    tracing::info!(article_id, "Bookmark removed");
    Ok(Json(Response {
        message: "Bookmark removed successfully".to_string(),
    }))
}
