// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP/WebSocket gateway for the Solace conversation engine.
//!
//! The gateway is a thin transport binding: credential verification and
//! admission happen before the WebSocket upgrade, room protocol events are
//! relayed to the engine, and a small REST surface covers conversation
//! lifecycle operations.

pub mod handlers;
pub mod server;
pub mod ws;

pub use server::{GatewayState, router, serve, serve_with_listener};
