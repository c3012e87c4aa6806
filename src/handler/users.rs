use crate::{
    AppState,
    db::UserExt,
    dtos::{
        FilterUserDto, PasswordChangeDto, ProfileUpdateDto, Response, UserListResponseDto,
        UserResponseDto,
    },
    error::{ErrorMessage, HttpError},
    middleware::{JWTAuthMiddleware, role_check},
    models::UserRole,
    utils::password,
};
use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    middleware,
    response::IntoResponse,
    routing::{delete, get, put},
};
use tracing::instrument;
use validator::Validate;

/// Router for user management endpoints.
///
/// The whole nest sits behind the `auth` middleware (applied in routes.rs);
/// the list and delete routes additionally require the admin role.
pub fn users_handler() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(get_users).route_layer(middleware::from_fn(|req, next| {
                role_check(req, next, vec![UserRole::Admin])
            })),
        )
        .route("/profile", get(get_profile).put(update_profile))
        .route("/password", put(change_password))
        .route(
            "/{user_id}",
            delete(delete_user).route_layer(middleware::from_fn(|req, next| {
                role_check(req, next, vec![UserRole::Admin])
            })),
        )
}

/// List every registered user (admin only).
#[instrument(skip(app_state))]
pub async fn get_users(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let users = app_state.db_client.get_users().await.map_err(|e| {
        tracing::error!("DB error, listing users: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    Ok(Json(UserListResponseDto {
        users: FilterUserDto::filter_users(&users),
    }))
}

#[instrument(skip(jwt), fields(user_id = %jwt.user.id))]
pub async fn get_profile(
    Extension(jwt): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    Ok(Json(FilterUserDto::filter_user(&jwt.user)))
}

/// Partial profile update. A changed email must not belong to another user.
#[instrument(skip(app_state, jwt, body), fields(user_id = %jwt.user.id))]
pub async fn update_profile(
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
    Json(body): Json<ProfileUpdateDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid update_profile input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    if let Some(full_name) = body.full_name.as_deref() {
        if full_name.trim().len() < 2 {
            return Err(HttpError::bad_request(
                "Full name must be at least 2 characters",
            ));
        }
    }

    let new_email = body.email.as_deref().filter(|email| *email != jwt.user.email);
    if let Some(email) = new_email {
        let existing = app_state
            .db_client
            .get_user(None, Some(email), None)
            .await
            .map_err(|e| {
                tracing::error!("DB error, checking email: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            })?;

        if existing.is_some() {
            return Err(HttpError::bad_request("Email already in use"));
        }
    }

    let user = app_state
        .db_client
        .update_user_profile(
            jwt.user.id,
            body.full_name.as_deref().map(str::trim),
            new_email,
            body.avatar_url.as_deref(),
        )
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                HttpError::bad_request("Email already in use")
            }
            _ => {
                tracing::error!("DB error, updating profile: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
        })?;

    tracing::info!(user_id = user.id, "Profile updated");
    Ok(Json(UserResponseDto {
        message: "Profile updated successfully".to_string(),
        user: FilterUserDto::filter_user(&user),
    }))
}

/// Change the password after verifying the current one.
#[instrument(skip(app_state, jwt, body), fields(user_id = %jwt.user.id))]
pub async fn change_password(
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
    Json(body): Json<PasswordChangeDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid change_password input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let old_matches =
        password::compare(&body.old_password, &jwt.user.password_hash).map_err(|e| {
            tracing::error!("Password comparison error: {}", e);
            HttpError::bad_request("Current password is incorrect")
        })?;

    if !old_matches {
        return Err(HttpError::bad_request("Current password is incorrect"));
    }

    let hash_password = password::hash(&body.new_password).map_err(|e| {
        tracing::error!("Password hashing error: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    app_state
        .db_client
        .update_user_password(jwt.user.id, &hash_password)
        .await
        .map_err(|e| {
            tracing::error!("DB error, updating password: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(user_id = jwt.user.id, "Password changed");
    Ok(Json(Response {
        message: "Password changed successfully".to_string(),
    }))
}

/// Delete a user account (admin only). Self-deletion is refused so an
/// administrator cannot lock the system out from under themselves.
#[instrument(skip(app_state, jwt), fields(admin_id = %jwt.user.id))]
pub async fn delete_user(
    Path(user_id): Path<i64>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    if user_id == jwt.user.id {
        return Err(HttpError::bad_request("Cannot delete your own account"));
    }

    app_state
        .db_client
        .delete_user(user_id)
        .await
        .map_err(|e| match &e {
            sqlx::Error::RowNotFound => HttpError::not_found("User not found"),
            _ => {
                tracing::error!("DB error, deleting user: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
        })?;

    tracing::info!(deleted_user_id = user_id, "User deleted");
    Ok(Json(Response {
        message: "User deleted successfully".to_string(),
    }))
}
