// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the conversation REST surface.
//!
//! POST /v1/conversations, GET /v1/conversations,
//! GET /v1/conversations/{id}, POST /v1/conversations/{id}/end,
//! GET /health (public).

use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use solace_core::{Conversation, Identity, Message, SolaceError};

use crate::server::GatewayState;

/// Request body for POST /v1/conversations.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartConversationRequest {
    /// Optional conversation title.
    #[serde(default)]
    pub title: Option<String>,
    /// Self-reported mood at the start of the conversation.
    #[serde(default)]
    pub initial_mood: Option<String>,
}

/// Request body for POST /v1/conversations/{id}/end.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndConversationRequest {
    /// Self-reported mood at the end of the conversation.
    #[serde(default)]
    pub end_mood: Option<String>,
}

/// Pagination for GET /v1/conversations.
#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    10
}

/// Response body for GET /v1/conversations.
#[derive(Debug, Serialize)]
pub struct ConversationListResponse {
    pub conversations: Vec<Conversation>,
}

/// Response body for GET /v1/conversations/{id}.
#[derive(Debug, Serialize)]
pub struct ConversationDetailResponse {
    pub conversation: Conversation,
    /// Messages in replay order.
    pub messages: Vec<Message>,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Error response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

/// Maps an engine error to an HTTP response with a structured body.
pub fn error_response(err: &SolaceError) -> Response {
    let status = match err {
        SolaceError::AuthenticationFailed => StatusCode::UNAUTHORIZED,
        SolaceError::AuthorizationDenied(_) => StatusCode::FORBIDDEN,
        SolaceError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        SolaceError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
        SolaceError::NotFound(_) => StatusCode::NOT_FOUND,
        SolaceError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        SolaceError::GenerationFailed { .. } | SolaceError::Provider { .. } => {
            StatusCode::BAD_GATEWAY
        }
        SolaceError::AnalysisUnavailable(_)
        | SolaceError::Storage { .. }
        | SolaceError::Config(_)
        | SolaceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let retry_after_secs = match err {
        SolaceError::RateLimited { retry_after_secs } => Some(*retry_after_secs),
        _ => None,
    };
    let body = ErrorResponse {
        error: err.code().to_string(),
        message: err.to_string(),
        retry_after_secs,
    };
    (status, Json(body)).into_response()
}

/// POST /v1/conversations
pub async fn post_conversation(
    State(state): State<GatewayState>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<StartConversationRequest>,
) -> Response {
    match state
        .engine
        .start_conversation(&identity, body.title, body.initial_mood)
        .await
    {
        Ok(conversation) => (StatusCode::CREATED, Json(conversation)).into_response(),
        Err(err) => error_response(&err),
    }
}

/// GET /v1/conversations
pub async fn get_conversations(
    State(state): State<GatewayState>,
    Extension(identity): Extension<Identity>,
    Query(page): Query<Pagination>,
) -> Response {
    match state
        .engine
        .conversations(&identity, page.limit, page.offset)
        .await
    {
        Ok(conversations) => Json(ConversationListResponse { conversations }).into_response(),
        Err(err) => error_response(&err),
    }
}

/// GET /v1/conversations/{id}
pub async fn get_conversation_detail(
    State(state): State<GatewayState>,
    Extension(identity): Extension<Identity>,
    Path(conversation_id): Path<String>,
) -> Response {
    match state
        .engine
        .conversation_detail(&identity, &conversation_id)
        .await
    {
        Ok((conversation, messages)) => Json(ConversationDetailResponse {
            conversation,
            messages,
        })
        .into_response(),
        Err(err) => error_response(&err),
    }
}

/// POST /v1/conversations/{id}/end
pub async fn post_end_conversation(
    State(state): State<GatewayState>,
    Extension(identity): Extension<Identity>,
    Path(conversation_id): Path<String>,
    body: Option<Json<EndConversationRequest>>,
) -> Response {
    let end_mood = body.and_then(|Json(b)| b.end_mood);
    match state
        .engine
        .end_conversation(&identity, &conversation_id, end_mood.as_deref())
        .await
    {
        Ok(conversation) => Json(conversation).into_response(),
        Err(err) => error_response(&err),
    }
}

/// GET /health (unauthenticated, for process supervision).
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}
