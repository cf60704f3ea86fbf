// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket transport for the room protocol.
//!
//! The bearer credential arrives as a query parameter and is verified
//! BEFORE the upgrade; a rejected connection gets an HTTP 401 and is never
//! left half-open. After the upgrade, a sender task forwards engine events
//! to the socket while the read loop parses client events.

use std::net::SocketAddr;

use axum::{
    extract::{
        ConnectInfo, Query, State,
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, warn};

use solace_core::{Identity, SolaceError};
use solace_engine::events::ClientEvent;

use crate::handlers::error_response;
use crate::server::GatewayState;

/// Query parameters of the WebSocket handshake.
#[derive(Debug, Deserialize)]
pub struct WsAuthParams {
    #[serde(default)]
    pub token: Option<String>,
}

/// WebSocket upgrade handler.
///
/// Admission (IP-keyed API tier) and credential verification happen before
/// the upgrade.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsAuthParams>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    State(state): State<GatewayState>,
) -> Response {
    if let Err(err) = state.engine.admission().admit_api(&remote.ip().to_string()) {
        return error_response(&err);
    }

    let Some(token) = params.token else {
        return error_response(&SolaceError::AuthenticationFailed);
    };
    let identity = match state.engine.authenticate(&token).await {
        Ok(identity) => identity,
        Err(err) => return error_response(&err),
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, identity))
}

/// Handle an individual authenticated WebSocket connection.
///
/// Spawns a sender task forwarding engine events to the client and reads
/// client events until the transport closes, then unregisters.
async fn handle_socket(socket: WebSocket, state: GatewayState, identity: Identity) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (connection_id, mut events) = state.engine.connect(identity);

    let sender_task = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, "failed to serialize server event");
                    continue;
                }
            };
            if ws_sender.send(WsMessage::Text(text.into())).await.is_err() {
                break;
            }
        }
        // The engine dropped its sender (teardown): close the transport.
        let _ = ws_sender.send(WsMessage::Close(None)).await;
    });

    while let Some(Ok(msg)) = ws_receiver.next().await {
        match msg {
            WsMessage::Text(text) => {
                let text_str: &str = &text;
                match serde_json::from_str::<ClientEvent>(text_str) {
                    Ok(event) => state.engine.handle_event(&connection_id, event).await,
                    Err(e) => {
                        debug!(error = %e, "invalid client event frame");
                        state
                            .engine
                            .send_error(
                                &connection_id,
                                &SolaceError::ValidationFailed(format!("invalid event: {e}")),
                            )
                            .await;
                    }
                }
            }
            WsMessage::Close(_) => break,
            _ => {} // Ignore binary, ping (handled by the protocol layer)
        }
    }

    // Transport closed: in-flight pipeline work for this connection
    // completes on its conversation worker; only delivery back to this
    // connection stops.
    state.engine.disconnect(&connection_id);
    sender_task.abort();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ws_params_deserialize_with_token() {
        let params: WsAuthParams = serde_json::from_str(r#"{"token": "abc"}"#).unwrap();
        assert_eq!(params.token.as_deref(), Some("abc"));
    }

    #[test]
    fn ws_params_deserialize_without_token() {
        let params: WsAuthParams = serde_json::from_str("{}").unwrap();
        assert!(params.token.is_none());
    }
}
