//! Request parsing and cookie helpers shared by the handlers.

use axum::http::{
    header::{InvalidHeaderValue, AUTHORIZATION, COOKIE, HOST, SET_COOKIE},
    HeaderMap, HeaderValue, Uri,
};
use base64ct::{Base64, Encoding};
use std::net::SocketAddr;
use tracing::error;

use crate::tokens::{
    issuer::TokenIssuer,
    registry::strip_port,
    state::{TOKEN_COOKIE_NAME, TOKEN_HEADER, TOKEN_QUERY_PARAM},
};

use super::ApiError;

/// Read a cookie from the `Cookie` header(s).
pub(crate) fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().to_string())
}

/// Locate the presented token: query parameter, then cookie, then header.
pub(crate) fn presented_token(uri: &Uri, headers: &HeaderMap) -> Option<String> {
    let from_query = uri.query().and_then(|query| {
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == TOKEN_QUERY_PARAM)
            .map(|(_, value)| value.into_owned())
    });

    from_query
        .filter(|value| !value.is_empty())
        .or_else(|| {
            cookie_value(headers, TOKEN_COOKIE_NAME).filter(|value| !value.is_empty())
        })
        .or_else(|| {
            headers
                .get(TOKEN_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
                .filter(|value| !value.is_empty())
        })
}

/// Resolve the caller's token or fail with `Unauthorized`.
pub(crate) async fn require_token(
    issuer: &TokenIssuer,
    uri: &Uri,
    headers: &HeaderMap,
) -> Result<String, ApiError> {
    let Some(wire) = presented_token(uri, headers) else {
        return Err(ApiError::Unauthorized);
    };
    issuer
        .authenticate(&wire)
        .await
        .ok_or(ApiError::Unauthorized)
}

/// Parse `Authorization: Basic <base64(login:password)>`.
pub(crate) fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = Base64::decode_vec(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (login, password) = decoded.split_once(':')?;
    Some((login.to_string(), password.to_string()))
}

/// Request host without its port, used as the cookie domain.
pub(crate) fn cookie_domain(headers: &HeaderMap) -> Option<String> {
    headers
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .map(strip_port)
        .filter(|domain| !domain.is_empty())
}

/// Build a `Set-Cookie` value. A non-positive `max_age` clears the cookie.
pub(crate) fn cookie(
    name: &str,
    value: &str,
    max_age: i64,
    domain: Option<&str>,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{name}={value}; Path=/");
    if let Some(domain) = domain {
        cookie.push_str("; Domain=");
        cookie.push_str(domain);
    }
    cookie.push_str(&format!("; Max-Age={}; HttpOnly", max_age.max(0)));
    HeaderValue::from_str(&cookie)
}

/// Append a `Set-Cookie` header, logging instead of failing on an unrepresentable value.
pub(crate) fn append_cookie(
    headers: &mut HeaderMap,
    name: &str,
    value: &str,
    max_age: i64,
    domain: Option<&str>,
) {
    match cookie(name, value, max_age, domain) {
        Ok(value) => {
            headers.append(SET_COOKIE, value);
        }
        Err(err) => error!("Failed to build {name} cookie: {err}"),
    }
}

/// Peer address as `ip:port`, empty when the server was not started with connect info.
pub(crate) fn remote_address(peer: Option<SocketAddr>) -> String {
    peer.map(|addr| addr.to_string()).unwrap_or_default()
}
