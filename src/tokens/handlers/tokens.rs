//! Authenticated token administration.

use axum::{
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode, Uri},
    response::Json,
};
use std::sync::Arc;
use tracing::{debug, instrument};

use super::{utils::require_token, ApiError};
use crate::tokens::{issuer::TokenIssuer, registry::Token};

#[utoipa::path(
    get,
    path= "/tokens",
    responses (
        (status = 200, description = "Live tokens", body = [Token]),
        (status = 401, description = "Missing, invalid or expired token"),
    ),
    tag = "tokens",
)]
#[instrument(skip_all)]
pub async fn list_tokens(
    Extension(issuer): Extension<Arc<TokenIssuer>>,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Json<Vec<Token>>, ApiError> {
    require_token(&issuer, &uri, &headers).await?;
    Ok(Json(issuer.list().await))
}

#[utoipa::path(
    get,
    path= "/tokens/{id}",
    params(("id" = String, Path, description = "Token id")),
    responses (
        (status = 200, description = "The token", body = Token),
        (status = 401, description = "Missing, invalid or expired token"),
        (status = 404, description = "Unknown or expired id"),
    ),
    tag = "tokens",
)]
#[instrument(skip(issuer, uri, headers))]
pub async fn get_token(
    Extension(issuer): Extension<Arc<TokenIssuer>>,
    Path(id): Path<String>,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Json<Token>, ApiError> {
    require_token(&issuer, &uri, &headers).await?;
    issuer.get(&id).await.map(Json).ok_or(ApiError::NotFound)
}

#[utoipa::path(
    delete,
    path= "/tokens/{id}",
    params(("id" = String, Path, description = "Token id")),
    responses (
        (status = 204, description = "Token removed"),
        (status = 401, description = "Missing, invalid or expired token"),
        (status = 404, description = "Unknown id"),
    ),
    tag = "tokens",
)]
#[instrument(skip(issuer, uri, headers))]
pub async fn delete_token(
    Extension(issuer): Extension<Arc<TokenIssuer>>,
    Path(id): Path<String>,
    uri: Uri,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    require_token(&issuer, &uri, &headers).await?;
    if issuer.delete(&id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

#[utoipa::path(
    post,
    path= "/tokens/clean",
    responses (
        (status = 204, description = "Expired tokens and challenges removed"),
        (status = 401, description = "Missing, invalid or expired token"),
    ),
    tag = "tokens",
)]
#[instrument(skip_all)]
pub async fn clean_tokens(
    Extension(issuer): Extension<Arc<TokenIssuer>>,
    uri: Uri,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    require_token(&issuer, &uri, &headers).await?;
    let (tokens, challenges) = issuer.sweep().await;
    debug!("Clean removed {tokens} tokens and {challenges} challenges");
    Ok(StatusCode::NO_CONTENT)
}
