// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `solace serve` command implementation.
//!
//! Wires the SQLite store, token verifier, Anthropic analysis/responder,
//! session engine, and gateway, then serves until a shutdown signal.

use std::sync::Arc;
use std::time::Duration;

use solace_anthropic::{AnthropicAnalysis, AnthropicClient, AnthropicResponder};
use solace_auth::TokenVerifier;
use solace_config::SolaceConfig;
use solace_core::{ConversationStore, SolaceError};
use solace_engine::Engine;
use solace_gateway::GatewayState;
use solace_storage::SqliteStore;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Runs the `solace serve` command.
pub async fn run_serve(config: SolaceConfig) -> Result<(), SolaceError> {
    init_tracing(&config.agent.log_level);

    let token_secret = config
        .auth
        .token_secret
        .clone()
        .ok_or_else(|| SolaceError::Config("auth.token_secret is required to serve".into()))?;
    let api_key = config.anthropic.api_key.clone().ok_or_else(|| {
        SolaceError::Config(
            "anthropic.api_key is required (config file or SOLACE_ANTHROPIC_API_KEY)".into(),
        )
    })?;

    let store = Arc::new(SqliteStore::new(config.storage.clone()));
    store.initialize().await?;
    let store: Arc<dyn ConversationStore> = store;

    let client = AnthropicClient::new(
        &api_key,
        &config.anthropic.api_version,
        config.anthropic.model.clone(),
        Duration::from_secs(config.anthropic.request_timeout_secs),
    )?;
    let analysis = Arc::new(AnthropicAnalysis::new(
        client.clone(),
        config.anthropic.max_tokens,
    ));
    let responder = Arc::new(AnthropicResponder::new(
        client,
        config.anthropic.max_tokens,
    ));
    let verifier = Arc::new(TokenVerifier::new(token_secret, store.clone()));

    let engine = Arc::new(Engine::new(
        store.clone(),
        analysis,
        responder,
        verifier,
        config.clone(),
    ));
    let state = GatewayState::new(engine.clone());

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            signal_cancel.cancel();
        }
    });

    solace_gateway::serve(&config.server, state, cancel).await?;

    engine.shutdown();
    store.close().await?;
    info!("solace stopped");
    Ok(())
}

fn init_tracing(log_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
