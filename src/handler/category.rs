use crate::{
    AppState,
    db::CategoryExt,
    dtos::{
        CategoryDto, CategoryListResponseDto, CategoryResponseDto, CreateTaxonomyDto, Response,
        UpdateTaxonomyDto,
    },
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

pub fn category_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(get_categories))
        .route(
            "/",
            post(create_category)
                .route_layer(middleware::from_fn(|req, next| {
                    role_check(req, next, vec![UserRole::Admin])
                }))
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/{category_id}",
            put(update_category)
                .delete(delete_category)
                .route_layer(middleware::from_fn(|req, next| {
                    role_check(req, next, vec![UserRole::Admin])
                }))
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
}

#[instrument(skip(app_state))]
pub async fn get_categories(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let categories = app_state.db_client.get_categories().await.map_err(|e| {
        tracing::error!("DB error, listing categories: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    Ok(Json(CategoryListResponseDto {
        categories: categories.iter().map(CategoryDto::from_model).collect(),
    }))
}

#[instrument(skip(app_state, body))]
pub async fn create_category(
    State(app_state): State<AppState>,
    Json(body): Json<CreateTaxonomyDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid create_category input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let existing = app_state
        .db_client
        .get_category_by_slug(&body.slug)
        .await
        .map_err(|e| {
            tracing::error!("DB error, checking category slug: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    if existing.is_some() {
        return Err(HttpError::unique_constraint_violation(
            "Category with this slug already exists",
        ));
    }

    let category = app_state
        .db_client
        .create_category(&body.name, &body.slug)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                HttpError::unique_constraint_violation("Category with this slug already exists")
            }
            _ => {
                tracing::error!("DB error, creating category: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
        })?;

    tracing::info!(category_id = category.id, "Category created");
    Ok((
        StatusCode::CREATED,
        Json(CategoryResponseDto {
            message: "Category created successfully".to_string(),
            category: CategoryDto::from_model(&category),
        }),
    ))
}

#[instrument(skip(app_state, body))]
pub async fn update_category(
    Path(category_id): Path<i64>,
    State(app_state): State<AppState>,
    Json(body): Json<UpdateTaxonomyDto>,
) -> Result<impl IntoResponse, HttpError> {
    let current = app_state
        .db_client
        .get_category(category_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting category: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    if current.is_none() {
        return Err(HttpError::not_found("Category not found"));
    }

    if let Some(slug) = body.slug.as_deref() {
        let existing = app_state
            .db_client
            .get_category_by_slug(slug)
            .await
            .map_err(|e| {
                tracing::error!("DB error, checking category slug: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            })?;

        if existing.is_some_and(|other| other.id != category_id) {
            return Err(HttpError::unique_constraint_violation("Slug already in use"));
        }
    }

    let category = app_state
        .db_client
        .update_category(category_id, body.name.as_deref(), body.slug.as_deref())
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                HttpError::unique_constraint_violation("Slug already in use")
            }
            _ => {
                tracing::error!("DB error, updating category: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
        })?;

    tracing::info!(category_id, "Category updated");
    Ok(Json(CategoryResponseDto {
        message: "Category updated successfully".to_string(),
        category: CategoryDto::from_model(&category),
    }))
}

/// Deletion is refused while any article still references the category.
#[instrument(skip(app_state))]
pub async fn delete_category(
    Path(category_id): Path<i64>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let current = app_state
        .db_client
        .get_category(category_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting category: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    if current.is_none() {
        return Err(HttpError::not_found("Category not found"));
    }

    let article_count = app_state
        .db_client
        .count_category_articles(category_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, counting category articles: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    if article_count > 0 {
        return Err(HttpError::bad_request(
            "Cannot delete category with existing articles",
        ));
    }

    app_state
        .db_client
        .delete_category(category_id)
        .await
        .map_err(|e| match &e {
            sqlx::Error::RowNotFound => HttpError::not_found("Category not found"),
            // an article snuck in between the count and the delete
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                HttpError::bad_request("Cannot delete category with existing articles")
            }
            _ => {
                tracing::error!("DB error, deleting category: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
        })?;

    tracing::info!(category_id, "Category deleted");
    Ok(Json(Response {
        message: "Category deleted successfully".to_string(),
    }))
}
