//! Static admin page and the catch-all 404.

use axum::{
    extract::Extension,
    response::{Html, IntoResponse, Response},
};
use std::sync::Arc;
use tracing::debug;

use super::ApiError;
use crate::tokens::issuer::TokenIssuer;

/// Serve `admin.html` from the configured directory.
pub async fn admin_page(Extension(issuer): Extension<Arc<TokenIssuer>>) -> Response {
    let path = issuer.config().admin_page();
    match tokio::fs::read_to_string(&path).await {
        Ok(page) => Html(page).into_response(),
        Err(err) => {
            debug!("Cannot read {}: {err}", path.display());
            ApiError::NotFound.into_response()
        }
    }
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound
}
