//! Token creation: JSON credentials (direct or challenge digest) and basic auth.

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, Extension},
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use std::{fmt, net::SocketAddr, sync::Arc};
use tracing::{debug, instrument};
use utoipa::ToSchema;

use super::{
    utils::{
        append_cookie, basic_credentials, cookie_domain, cookie_value, presented_token,
        remote_address,
    },
    ApiError,
};
use crate::tokens::{
    issuer::{BasicLogin, IssuedToken, TokenIssuer},
    registry::Token,
    state::{CHALLENGE_COOKIE_NAME, TOKEN_COOKIE_NAME},
};

#[derive(ToSchema, Deserialize)]
pub struct Credentials {
    login: String,
    /// The password, or `md5_hex(password + challengedata)` when a challenge cookie is sent.
    password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .finish_non_exhaustive()
    }
}

#[utoipa::path(
    post,
    path= "/tokens",
    request_body = Credentials,
    responses (
        (status = 201, description = "Token created and set in the Token cookie", body = Token),
        (status = 400, description = "Malformed body"),
        (status = 401, description = "Wrong credentials"),
    ),
    tag = "tokens",
)]
#[instrument(skip_all)]
pub async fn create_token(
    Extension(issuer): Extension<Arc<TokenIssuer>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<(StatusCode, HeaderMap, Json<Token>), ApiError> {
    let Json(credentials) = payload.map_err(|err| ApiError::BadRequest(err.body_text()))?;
    if credentials.login.is_empty() || credentials.password.is_empty() {
        return Err(ApiError::BadRequest(
            "login and password are required".to_string(),
        ));
    }

    let challenge_id = cookie_value(&headers, CHALLENGE_COOKIE_NAME);
    let remote = remote_address(peer.map(|ConnectInfo(addr)| addr));

    let issued = issuer
        .login(
            &credentials.login,
            &credentials.password,
            challenge_id.as_deref(),
            &remote,
        )
        .await?;

    let domain = cookie_domain(&headers);
    let mut response_headers = HeaderMap::new();
    append_cookie(
        &mut response_headers,
        CHALLENGE_COOKIE_NAME,
        "",
        -1,
        domain.as_deref(),
    );
    append_token_cookie(&mut response_headers, &issuer, &issued, domain.as_deref());

    Ok((StatusCode::CREATED, response_headers, Json(issued.token)))
}

#[utoipa::path(
    post,
    path= "/tokens/auth",
    responses (
        (status = 201, description = "Token created and set in the Token cookie", body = Token),
        (status = 204, description = "Already authenticated"),
        (status = 401, description = "Wrong credentials, WWW-Authenticate is set"),
    ),
    tag = "tokens",
)]
#[instrument(skip_all)]
pub async fn auth_token(
    Extension(issuer): Extension<Arc<TokenIssuer>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let presented = presented_token(&uri, &headers);
    let remote = remote_address(peer.map(|ConnectInfo(addr)| addr));

    let outcome = issuer
        .login_basic(presented.as_deref(), basic_credentials(&headers), &remote)
        .await
        .map_err(|_| ApiError::BasicAuthRequired)?;

    match outcome {
        BasicLogin::AlreadyAuthenticated => {
            debug!("Already authenticated");
            Ok(StatusCode::NO_CONTENT.into_response())
        }
        BasicLogin::Issued(issued) => {
            let domain = cookie_domain(&headers);
            let mut response_headers = HeaderMap::new();
            append_token_cookie(&mut response_headers, &issuer, &issued, domain.as_deref());
            Ok((StatusCode::CREATED, response_headers, Json(issued.token)).into_response())
        }
    }
}

fn append_token_cookie(
    headers: &mut HeaderMap,
    issuer: &TokenIssuer,
    issued: &IssuedToken,
    domain: Option<&str>,
) {
    append_cookie(
        headers,
        TOKEN_COOKIE_NAME,
        &issued.wire,
        issuer.config().ttl_seconds(),
        domain,
    );
}
