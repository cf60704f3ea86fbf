// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, authentication middleware, and shared state. Routes:
//! - GET  /health                         (public)
//! - POST /v1/conversations               (bearer auth + API rate limit)
//! - GET  /v1/conversations
//! - GET  /v1/conversations/{id}
//! - POST /v1/conversations/{id}/end
//! - GET  /ws                             (auth during handshake, not middleware)

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{ConnectInfo, Request, State},
    middleware as axum_middleware,
    middleware::Next,
    response::Response,
    routing::{get, post},
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::info;

use solace_config::model::ServerConfig;
use solace_core::SolaceError;
use solace_engine::Engine;

use crate::handlers::{self, error_response};
use crate::ws;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// The conversation session engine.
    pub engine: Arc<Engine>,
    /// Process start time for uptime reporting.
    pub start_time: std::time::Instant,
}

impl GatewayState {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self {
            engine,
            start_time: std::time::Instant::now(),
        }
    }
}

/// Middleware for the authenticated API routes: IP-keyed admission first,
/// then bearer verification; the resolved identity lands in request
/// extensions for the handlers.
pub async fn auth_middleware(
    State(state): State<GatewayState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Err(err) = state.engine.admission().admit_api(&remote.ip().to_string()) {
        return error_response(&err);
    }

    let token = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    let Some(token) = token else {
        return error_response(&SolaceError::AuthenticationFailed);
    };

    let identity = match state.engine.authenticate(token).await {
        Ok(identity) => identity,
        Err(err) => return error_response(&err),
    };

    request.extensions_mut().insert(identity);
    next.run(request).await
}

/// Builds the gateway router.
pub fn router(state: GatewayState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route(
            "/v1/conversations",
            post(handlers::post_conversation).get(handlers::get_conversations),
        )
        .route(
            "/v1/conversations/{id}",
            get(handlers::get_conversation_detail),
        )
        .route(
            "/v1/conversations/{id}/end",
            post(handlers::post_end_conversation),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state.clone());

    let ws_routes = Router::new()
        .route("/ws", get(ws::ws_handler))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .merge(ws_routes)
        .layer(CorsLayer::permissive())
}

/// Bind and serve until the cancellation token fires.
pub async fn serve(
    config: &ServerConfig,
    state: GatewayState,
    cancel: CancellationToken,
) -> Result<(), SolaceError> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| SolaceError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;
    serve_with_listener(listener, state, cancel).await
}

/// Serve on an existing listener (tests bind port 0 and read the local
/// address first).
pub async fn serve_with_listener(
    listener: tokio::net::TcpListener,
    state: GatewayState,
    cancel: CancellationToken,
) -> Result<(), SolaceError> {
    if let Ok(addr) = listener.local_addr() {
        info!("gateway listening on {addr}");
    }

    let app = router(state).into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| SolaceError::Internal(format!("gateway server error: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode};
    use solace_test_utils::EngineHarness;
    use tower::util::ServiceExt;

    fn test_remote() -> ConnectInfo<SocketAddr> {
        ConnectInfo("127.0.0.1:9999".parse().unwrap())
    }

    async fn test_state() -> (GatewayState, EngineHarness) {
        let harness = EngineHarness::builder().build().await.unwrap();
        (GatewayState::new(harness.engine.clone()), harness)
    }

    #[tokio::test]
    async fn health_is_public() {
        let (state, _harness) = test_state().await;
        let app = router(state);

        let mut request = HttpRequest::get("/health").body(Body::empty()).unwrap();
        request.extensions_mut().insert(test_remote());
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn api_routes_reject_missing_bearer() {
        let (state, _harness) = test_state().await;
        let app = router(state);

        let mut request = HttpRequest::get("/v1/conversations")
            .body(Body::empty())
            .unwrap();
        request.extensions_mut().insert(test_remote());
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn api_routes_reject_unknown_token() {
        let (state, _harness) = test_state().await;
        let app = router(state);

        let mut request = HttpRequest::get("/v1/conversations")
            .header("authorization", "Bearer nope")
            .body(Body::empty())
            .unwrap();
        request.extensions_mut().insert(test_remote());
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn api_routes_accept_known_token() {
        let (state, harness) = test_state().await;
        harness.create_user("alice").await.unwrap();
        harness.verifier.allow("tok-alice", "alice");
        let app = router(state);

        let mut request = HttpRequest::get("/v1/conversations")
            .header("authorization", "Bearer tok-alice")
            .body(Body::empty())
            .unwrap();
        request.extensions_mut().insert(test_remote());
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn ws_handshake_without_token_is_unauthorized() {
        let (state, _harness) = test_state().await;
        let app = router(state);

        // A well-formed upgrade request that carries no credential: the
        // handler answers 401 instead of completing the upgrade.
        let mut request = HttpRequest::get("/ws")
            .header("connection", "upgrade")
            .header("upgrade", "websocket")
            .header("sec-websocket-version", "13")
            .header("sec-websocket-key", "dGhlIHNhbXBsZSBub25jZQ==")
            .body(Body::empty())
            .unwrap();
        request.extensions_mut().insert(test_remote());
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
