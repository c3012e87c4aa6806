use crate::{
    AppState,
    db::TagExt,
    dtos::{CreateTaxonomyDto, Response, TagDto, TagListResponseDto, TagResponseDto, UpdateTaxonomyDto},
    error::{ErrorMessage, HttpError},
    middleware::{auth, role_check},
    models::UserRole,
};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use tracing::instrument;
use validator::Validate;

pub fn tag_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(get_tags))
        .route(
            "/",
            post(create_tag)
                .route_layer(middleware::from_fn(|req, next| {
                    role_check(req, next, vec![UserRole::Admin])
                }))
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/{tag_id}",
            put(update_tag)
                .delete(delete_tag)
                .route_layer(middleware::from_fn(|req, next| {
                    role_check(req, next, vec![UserRole::Admin])
                }))
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
}

#[instrument(skip(app_state))]
pub async fn get_tags(State(app_state): State<AppState>) -> Result<impl IntoResponse, HttpError> {
    let tags = app_state.db_client.get_tags().await.map_err(|e| {
        tracing::error!("DB error, listing tags: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    Ok(Json(TagListResponseDto {
        tags: TagDto::from_models(&tags),
    }))
}

#[instrument(skip(app_state, body))]
pub async fn create_tag(
    State(app_state): State<AppState>,
    Json(body): Json<CreateTaxonomyDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid create_tag input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let existing = app_state
        .db_client
        .get_tag_by_slug(&body.slug)
        .await
        .map_err(|e| {
            tracing::error!("DB error, checking tag slug: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    if existing.is_some() {
        return Err(HttpError::unique_constraint_violation(
            "Tag with this slug already exists",
        ));
    }

    let tag = app_state
        .db_client
        .create_tag(&body.name, &body.slug)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                HttpError::unique_constraint_violation("Tag with this slug already exists")
            }
            _ => {
                tracing::error!("DB error, creating tag: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
        })?;

    tracing::info!(tag_id = tag.id, "Tag created");
    Ok((
        StatusCode::CREATED,
        Json(TagResponseDto {
            message: "Tag created successfully".to_string(),
            tag: TagDto::from_model(&tag),
        }),
    ))
}

#[instrument(skip(app_state, body))]
pub async fn update_tag(
    Path(tag_id): Path<i64>,
    State(app_state): State<AppState>,
    Json(body): Json<UpdateTaxonomyDto>,
) -> Result<impl IntoResponse, HttpError> {
    let current = app_state.db_client.get_tag(tag_id).await.map_err(|e| {
        tracing::error!("DB error, getting tag: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    if current.is_none() {
        return Err(HttpError::not_found("Tag not found"));
    }

    if let Some(slug) = body.slug.as_deref() {
        let existing = app_state.db_client.get_tag_by_slug(slug).await.map_err(|e| {
            tracing::error!("DB error, checking tag slug: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

        if existing.is_some_and(|other| other.id != tag_id) {
            return Err(HttpError::unique_constraint_violation("Slug already in use"));
        }
    }

    let tag = app_state
        .db_client
        .update_tag(tag_id, body.name.as_deref(), body.slug.as_deref())
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                HttpError::unique_constraint_violation("Slug already in use")
            }
            _ => {
                tracing::error!("DB error, updating tag: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
        })?;

    tracing::info!(tag_id, "Tag updated");
    Ok(Json(TagResponseDto {
        message: "Tag updated successfully".to_string(),
        tag: TagDto::from_model(&tag),
    }))
}

/// Tag deletion also drops its article associations (cascade).
#[instrument(skip(app_state))]
pub async fn delete_tag(
    Path(tag_id): Path<i64>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .db_client
        .delete_tag(tag_id)
        .await
        .map_err(|e| match &e {
            sqlx::Error::RowNotFound => HttpError::not_found("Tag not found"),
            _ => {
                tracing::error!("DB error, deleting tag: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
        })?;

    tracing::info!(tag_id, "Tag deleted");
    Ok(Json(Response {
        message: "Tag deleted successfully".to_string(),
    }))
}
