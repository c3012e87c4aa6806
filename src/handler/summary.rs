use std::time::Duration;

use crate::{
    AppState,
    db::ArticleExt,
    dtos::{SummarizeRequestDto, SummaryFacet},
    error::{ErrorMessage, HttpError},
    middleware::{JWTAuthMiddleware, auth},
};
use axum::{
    Extension, Json, Router, extract::State, middleware, response::IntoResponse, routing::post,
};
use tracing::instrument;

pub fn summary_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/summarize", post(summarize))
        .route_layer(middleware::from_fn_with_state(app_state, auth))
}

/// Generate a facet summary for an article or ad hoc text.
///
/// The response is a mapping over exactly the requested facets. When the
/// external service fails, every facet degrades to a fixed placeholder and
/// the request still succeeds.
#[instrument(skip(app_state, jwt, body), fields(user_id = %jwt.user.id))]
pub async fn summarize(
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
    Json(body): Json<SummarizeRequestDto>,
) -> Result<impl IntoResponse, HttpError> {
    let content = if let Some(article_id) = body.article_id {
        let article = app_state
            .db_client
            .get_article_row(article_id)
            .await
            .map_err(|e| {
                tracing::error!("DB error, getting article: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            })?
            .ok_or_else(|| HttpError::not_found(ErrorMessage::ArticleNotFound.to_string()))?;
        article.content
    } else if let Some(content) = body.content.clone() {
        content
    } else {
        return Err(HttpError::bad_request(
            "Either article_id or content is required",
        ));
    };

    let facets = match &body.filters {
        None => SummaryFacet::ALL.to_vec(),
        Some(filters) if filters.is_empty() => {
            return Err(HttpError::bad_request("Filters must not be empty"));
        }
        Some(filters) => filters.clone(),
    };

    let length = body.length.unwrap_or_default();

    let summary = app_state
        .http_client
        .get_structured_summary(
            &app_state.env.llm_url,
            &app_state.env.model_name,
            &content,
            &facets,
            length,
            Duration::from_secs(app_state.env.llm_timeout_seconds),
        )
        .await;

    tracing::info!(facets = facets.len(), "Summary generated");
    Ok(Json(summary))
}
