pub mod health;
pub use self::health::{alive, health};

pub mod admin;
pub use self::admin::{admin_page, not_found};

pub mod challenge;
pub use self::challenge::challenge_data;

pub mod login;
pub use self::login::{auth_token, create_token};

pub mod tokens;
pub use self::tokens::{clean_tokens, delete_token, get_token, list_tokens};

pub mod validate;
pub use self::validate::validate_token;

pub(crate) mod utils;

use axum::{
    http::{header::WWW_AUTHENTICATE, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::tokens::issuer::AuthError;

/// Generic `{status, message}` body used by every JSON reply without a record.
#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Status {
    pub status: String,
    pub message: String,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized,
    /// Unauthorized with a basic-auth challenge and no body.
    BasicAuthRequired,
    NotFound,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::BadRequest(message) => failed(StatusCode::BAD_REQUEST, &message),
            Self::Unauthorized => failed(StatusCode::UNAUTHORIZED, "Unauthorized"),
            Self::BasicAuthRequired => (
                StatusCode::UNAUTHORIZED,
                [(
                    WWW_AUTHENTICATE,
                    HeaderValue::from_static("Basic realm=Restricted"),
                )],
            )
                .into_response(),
            Self::NotFound => failed(StatusCode::NOT_FOUND, "Not found"),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unauthorized => Self::Unauthorized,
        }
    }
}

fn failed(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({"status": "failed", "message": message})),
    )
        .into_response()
}
