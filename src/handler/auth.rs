use crate::{
    AppState,
    db::UserExt,
    dtos::{
        AuthResponseDto, FilterUserDto, ForgotPasswordRequestDto, LoginUserDto,
        RegisterUserDto, ResetPasswordRequestDto, Response,
    },
    error::{ErrorMessage, HttpError},
    middleware::{JWTAuthMiddleware, auth},
    models::UserRole,
    utils::{password, token},
};
use axum::{
    Extension, Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use tracing::instrument;
use validator::Validate;

/// Router for authentication endpoints
pub fn auth_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route(
            "/me",
            get(me).route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
}

/// Register a new reader account and log it in immediately.
#[instrument(skip(app_state, body), fields(email = %body.email))]
pub async fn register(
    State(app_state): State<AppState>,
    Json(body): Json<RegisterUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid register input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let hash_password = password::hash(&body.password).map_err(|e| {
        tracing::error!("Password hashing error: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    let result = app_state
        .db_client
        .save_user(&body.full_name, &body.email, &hash_password, UserRole::User)
        .await;

    let user = match result {
        Ok(user) => user,
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            tracing::error!("DB error, saving user, unique violation: {}", db_err);
            return Err(HttpError::unique_constraint_violation(
                "Email already registered",
            ));
        }
        Err(e) => {
            tracing::error!("DB error, saving user: {}", e);
            return Err(HttpError::server_error(
                ErrorMessage::ServerError.to_string(),
            ));
        }
    };

    let access_token = token::create_token(
        &user.email,
        app_state.env.jwt_secret.as_bytes(),
        app_state.env.jwt_maxage,
    )
    .map_err(|e| {
        tracing::error!("Access token creation error: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    tracing::info!(user_id = user.id, email = %user.email, "Registration successful");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponseDto {
            message: "Registration successful".to_string(),
            access_token,
            user: FilterUserDto::filter_user(&user),
        }),
    ))
}

/// Login with email and password.
#[instrument(skip(app_state, body), fields(email = %body.email))]
pub async fn login(
    State(app_state): State<AppState>,
    Json(body): Json<LoginUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid login input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let result = app_state
        .db_client
        .get_user(None, Some(&body.email), None)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting user: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    // The same response for an unknown email and a wrong password, so the
    // endpoint does not leak which of the two was the problem.
    let user = result.ok_or_else(|| {
        tracing::error!("Login failed: user not found");
        HttpError::unauthorized(ErrorMessage::WrongCredentials.to_string())
    })?;

    let password_matched =
        password::compare(&body.password, &user.password_hash).map_err(|e| {
            tracing::error!("Password comparison error: {}", e);
            HttpError::unauthorized(ErrorMessage::WrongCredentials.to_string())
        })?;

    if !password_matched {
        tracing::error!(user_id = user.id, "Login failed: password mismatch");
        return Err(HttpError::unauthorized(
            ErrorMessage::WrongCredentials.to_string(),
        ));
    }

    let access_token = token::create_token(
        &user.email,
        app_state.env.jwt_secret.as_bytes(),
        app_state.env.jwt_maxage,
    )
    .map_err(|e| {
        tracing::error!("Access token creation error: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    tracing::info!(user_id = user.id, email = %user.email, "Login successful");
    Ok(Json(AuthResponseDto {
        message: "Login successful".to_string(),
        access_token,
        user: FilterUserDto::filter_user(&user),
    }))
}

/// Current user's profile, resolved from the token.
#[instrument(skip(jwt), fields(user_id = %jwt.user.id))]
pub async fn me(
    Extension(jwt): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    Ok(Json(FilterUserDto::filter_user(&jwt.user)))
}

/// Request a password reset token.
///
/// Responds with the same generic message whether or not the email is
/// registered, so the endpoint cannot be used to probe for accounts.
#[instrument(skip(app_state, body))]
pub async fn forgot_password(
    State(app_state): State<AppState>,
    Json(body): Json<ForgotPasswordRequestDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid forgot_password input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let result = app_state
        .db_client
        .get_user(None, Some(&body.email), None)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting user: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    if let Some(user) = result {
        let reset_token = uuid::Uuid::new_v4().to_string();

        app_state
            .db_client
            .set_reset_token(user.id, &reset_token)
            .await
            .map_err(|e| {
                tracing::error!("DB error, storing reset token: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            })?;

        // Delivery of the token (mail or otherwise) happens outside this
        // service; the debug log is the hook the dev setup reads it from.
        tracing::debug!(user_id = user.id, reset_token = %reset_token, "Reset token generated");
    }

    Ok(Json(Response {
        message: "If email exists, reset instructions have been sent".to_string(),
    }))
}

/// Reset the password with a previously issued single-use token.
#[instrument(skip(app_state, body))]
pub async fn reset_password(
    State(app_state): State<AppState>,
    Json(body): Json<ResetPasswordRequestDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid reset_password input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let result = app_state
        .db_client
        .get_user(None, None, Some(&body.token))
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting user by reset token: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let user = result.ok_or_else(|| {
        tracing::error!("Reset failed: token matched no user");
        HttpError::bad_request("Invalid or expired reset token")
    })?;

    let hash_password = password::hash(&body.new_password).map_err(|e| {
        tracing::error!("Password hashing error: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    app_state
        .db_client
        .reset_password_with_token(user.id, &hash_password)
        .await
        .map_err(|e| {
            tracing::error!("DB error, resetting password: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(user_id = user.id, "Password reset successful");
    Ok(Json(Response {
        message: "Password reset successful".to_string(),
    }))
}
