use axum::{
    extract::{Extension, Path},
    http::HeaderMap,
    response::Json,
};
use std::sync::Arc;
use tracing::{debug, instrument};

use super::{
    utils::{append_cookie, cookie_domain},
    ApiError, Status,
};
use crate::tokens::{issuer::TokenIssuer, state::TOKEN_COOKIE_NAME};

#[utoipa::path(
    get,
    path= "/tokens/validate/{secret}",
    params(("secret" = String, Path, description = "Token secret")),
    responses (
        (status = 200, description = "Live token, a Token cookie bound to an unknown identity is set", body = Status),
        (status = 404, description = "Unknown or expired secret"),
    ),
    tag = "tokens",
)]
#[instrument(skip_all)]
pub async fn validate_token(
    Extension(issuer): Extension<Arc<TokenIssuer>>,
    Path(secret): Path<String>,
    headers: HeaderMap,
) -> Result<(HeaderMap, Json<Status>), ApiError> {
    let Some(wire) = issuer.validate_secret(&secret).await else {
        debug!("Token is not valid");
        return Err(ApiError::NotFound);
    };

    let mut response_headers = HeaderMap::new();
    append_cookie(
        &mut response_headers,
        TOKEN_COOKIE_NAME,
        &wire,
        issuer.config().ttl_seconds(),
        cookie_domain(&headers).as_deref(),
    );

    debug!("Token is valid");
    Ok((
        response_headers,
        Json(Status {
            status: "succeeded".to_string(),
            message: "Valid token".to_string(),
        }),
    ))
}
