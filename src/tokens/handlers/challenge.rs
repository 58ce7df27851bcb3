use axum::{extract::Extension, http::HeaderMap, response::Json};
use std::sync::Arc;
use tracing::instrument;

use super::utils::{append_cookie, cookie_domain};
use crate::tokens::{challenge::Challenge, issuer::TokenIssuer, state::CHALLENGE_COOKIE_NAME};

#[utoipa::path(
    get,
    path= "/tokens/challengedata",
    responses (
        (status = 200, description = "New challenge, its id is set in the ChallengeData cookie", body = Challenge),
    ),
    tag = "tokens",
)]
#[instrument(skip(issuer, headers))]
pub async fn challenge_data(
    Extension(issuer): Extension<Arc<TokenIssuer>>,
    headers: HeaderMap,
) -> (HeaderMap, Json<Challenge>) {
    let challenge = issuer.issue_challenge().await;

    let mut response_headers = HeaderMap::new();
    append_cookie(
        &mut response_headers,
        CHALLENGE_COOKIE_NAME,
        &challenge.id,
        issuer.config().ttl_seconds(),
        cookie_domain(&headers).as_deref(),
    );

    (response_headers, Json(challenge))
}
