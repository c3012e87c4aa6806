use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::IntoResponse,
};

use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use crate::{
    AppState,
    db::UserExt,
    error::{ErrorMessage, HttpError},
    models::{User, UserRole},
    utils::token,
};

/// Request extension carrying the authenticated user.
///
/// Inserted by the `auth` middleware; handlers behind it extract this to
/// access the caller's identity.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JWTAuthMiddleware {
    pub user: User,
}

/// Request extension carrying an optional identity for public endpoints.
///
/// Inserted by `maybe_auth`. `None` when no credential was presented, the
/// token failed verification, or the user no longer exists; public reads
/// use it only to personalize bookmark flags, never to reject a request.
#[derive(Debug, Clone)]
pub struct OptionalAuth(pub Option<User>);

/// Pull the JWT out of the `access_token` cookie or the
/// `Authorization: Bearer` header, cookie first.
fn extract_token(cookie_jar: &CookieJar, req: &Request) -> Option<String> {
    cookie_jar
        .get("access_token")
        .map(|cookie| cookie.value().to_string())
        .or_else(|| {
            req.headers()
                .get(header::AUTHORIZATION)
                .and_then(|auth_header| auth_header.to_str().ok())
                .and_then(|auth_value| {
                    auth_value
                        .strip_prefix("Bearer ")
                        .map(|token| token.to_owned())
                })
        })
}

/// Authentication middleware: validates the token and loads the user.
///
/// The token's subject is the user's email. Missing or invalid tokens and
/// users that no longer exist all fail with 401 before the handler runs.
pub async fn auth(
    cookie_jar: CookieJar,
    State(app_state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, HttpError> {
    let token = extract_token(&cookie_jar, &req)
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::TokenNotProvided.to_string()))?;

    let email = token::decode_token(token, app_state.env.jwt_secret.as_bytes())
        .map_err(|_| HttpError::unauthorized(ErrorMessage::InvalidToken.to_string()))?;

    let user = app_state
        .db_client
        .get_user(None, Some(&email), None)
        .await
        .map_err(|e| {
            tracing::error!("DB error, resolving token identity: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let user =
        user.ok_or_else(|| HttpError::unauthorized(ErrorMessage::UserNoLongerExist.to_string()))?;

    req.extensions_mut()
        .insert(JWTAuthMiddleware { user: user.clone() });

    Ok(next.run(req).await)
}

/// Optional-identity middleware for public read endpoints.
///
/// Never rejects the request: any failure along the way simply leaves the
/// identity empty.
pub async fn maybe_auth(
    cookie_jar: CookieJar,
    State(app_state): State<AppState>,
    mut req: Request,
    next: Next,
) -> impl IntoResponse {
    let mut identity: Option<User> = None;

    if let Some(token) = extract_token(&cookie_jar, &req) {
        if let Ok(email) = token::decode_token(token, app_state.env.jwt_secret.as_bytes()) {
            match app_state.db_client.get_user(None, Some(&email), None).await {
                Ok(user) => identity = user,
                Err(e) => {
                    tracing::error!("DB error, resolving optional identity: {}", e);
                }
            }
        }
    }

    req.extensions_mut().insert(OptionalAuth(identity));

    next.run(req).await
}

/// Role gate, layered after `auth`. Callers whose role is not in
/// `required_roles` get 403; the guarded handler never runs.
pub async fn role_check(
    req: Request,
    next: Next,
    required_roles: Vec<UserRole>,
) -> Result<impl IntoResponse, HttpError> {
    let user = req
        .extensions()
        .get::<JWTAuthMiddleware>()
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::TokenNotProvided.to_string()))?;

    if !required_roles.contains(&user.user.role) {
        return Err(HttpError::forbidden(ErrorMessage::AdminRequired.to_string()));
    }

    Ok(next.run(req).await)
}
