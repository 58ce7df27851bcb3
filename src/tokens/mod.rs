#![allow(clippy::needless_for_each)]

pub mod challenge;
pub mod clock;
pub mod codec;
pub mod credentials;
pub mod handlers;
pub mod issuer;
pub mod registry;
pub mod state;

use anyhow::Result;
use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Method, Request},
    response::Json,
    routing::{get, post},
    Extension, Router,
};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{debug_span, error, info, Span};
use ulid::Ulid;
use utoipa::OpenApi;

use self::issuer::TokenIssuer;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::alive,
        handlers::health::health,
        handlers::challenge::challenge_data,
        handlers::login::create_token,
        handlers::login::auth_token,
        handlers::tokens::list_tokens,
        handlers::tokens::get_token,
        handlers::tokens::delete_token,
        handlers::tokens::clean_tokens,
        handlers::validate::validate_token,
    ),
    components(
        schemas(
            registry::Token,
            challenge::Challenge,
            handlers::Status,
            handlers::health::Health,
            handlers::login::Credentials,
        )
    ),
    tags(
        (name = "tokens", description = "Short-lived session tokens"),
        (name = "health", description = "Liveness and build information"),
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

/// Build the HTTP surface around a shared issuer.
pub fn router(issuer: Arc<TokenIssuer>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_origin(Any);

    Router::new()
        .route("/", get(handlers::admin_page))
        .route("/admin.html", get(handlers::admin_page))
        .route("/tokens/admin.html", get(handlers::admin_page))
        .route("/alive", get(handlers::alive))
        .route("/health", get(handlers::health).options(handlers::health))
        .route("/openapi.json", get(|| async { Json(openapi()) }))
        .route("/challengedata", get(handlers::challenge_data))
        .route("/tokens/challengedata", get(handlers::challenge_data))
        .route(
            "/tokens",
            get(handlers::list_tokens).post(handlers::create_token),
        )
        .route(
            "/tokens/",
            get(handlers::list_tokens).post(handlers::create_token),
        )
        .route("/tokens/auth", post(handlers::auth_token))
        .route("/tokens/clean", post(handlers::clean_tokens))
        .route("/tokens/validate/:secret", get(handlers::validate_token))
        .route(
            "/tokens/:id",
            get(handlers::get_token).delete(handlers::delete_token),
        )
        .fallback(handlers::not_found)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(issuer)),
        )
}

/// Serve the API until SIGINT or SIGTERM.
/// # Errors
/// Returns an error if the listener cannot be bound or the server fails
pub async fn new(port: u16, issuer: Arc<TokenIssuer>) -> Result<()> {
    let app = router(issuer);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {err}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => error!("Failed to listen for SIGTERM: {err}"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Gracefully shutdown");
}

// span
fn make_span(request: &Request<Body>) -> Span {
    let headers = request.headers();
    let path = request.uri().path();
    let request_id = headers
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    debug_span!("http-request", path, request_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_token_routes() {
        let doc = openapi();
        let paths = &doc.paths.paths;
        for path in [
            "/alive",
            "/health",
            "/tokens",
            "/tokens/{id}",
            "/tokens/auth",
            "/tokens/clean",
            "/tokens/challengedata",
            "/tokens/validate/{secret}",
        ] {
            assert!(paths.contains_key(path), "missing {path}");
        }
    }
}
