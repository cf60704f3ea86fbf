// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Admission control: fixed-window rate limiting.
//!
//! Two independent tiers guard the engine: a coarse per-identity-or-IP
//! limiter for general API traffic and a stricter per-identity limiter
//! scoped to conversation sends. A denial carries a retry-after hint and
//! never partially admits a request.

use std::time::Duration;

use dashmap::DashMap;
use solace_config::model::LimitsConfig;
use solace_core::SolaceError;
use tokio::time::Instant;
use tracing::warn;

struct WindowState {
    started: Instant,
    count: u32,
}

/// A fixed-window rate limiter keyed by an arbitrary string (user id or
/// remote IP).
pub struct RateLimiter {
    max: u32,
    window: Duration,
    windows: DashMap<String, WindowState>,
}

impl RateLimiter {
    pub fn new(max: u32, window: Duration) -> Self {
        Self {
            max,
            window,
            windows: DashMap::new(),
        }
    }

    /// Admit or deny one request for `key`.
    ///
    /// The retry-after hint is the remainder of the current window, rounded
    /// up to whole seconds, so it is always <= the window length.
    pub fn check(&self, key: &str) -> Result<(), SolaceError> {
        let now = Instant::now();
        let mut entry = self
            .windows
            .entry(key.to_string())
            .or_insert_with(|| WindowState {
                started: now,
                count: 0,
            });

        if now.duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.count = 0;
        }

        if entry.count >= self.max {
            let remaining = self.window.saturating_sub(now.duration_since(entry.started));
            let mut retry_after_secs = remaining.as_secs();
            if remaining.subsec_nanos() > 0 {
                retry_after_secs += 1;
            }
            return Err(SolaceError::RateLimited { retry_after_secs });
        }

        entry.count += 1;
        Ok(())
    }
}

/// The two admission tiers used by the gateway and the engine.
pub struct AdmissionControl {
    api: RateLimiter,
    messages: RateLimiter,
}

impl AdmissionControl {
    pub fn new(limits: &LimitsConfig) -> Self {
        Self {
            api: RateLimiter::new(
                limits.api_max_requests,
                Duration::from_secs(limits.api_window_secs),
            ),
            messages: RateLimiter::new(
                limits.message_max,
                Duration::from_secs(limits.message_window_secs),
            ),
        }
    }

    /// Coarse tier for general API traffic, keyed by identity or remote IP.
    pub fn admit_api(&self, key: &str) -> Result<(), SolaceError> {
        self.api.check(key).inspect_err(|_| {
            warn!(key, "api rate limit exceeded");
        })
    }

    /// Strict tier for conversation sends, keyed by identity.
    pub fn admit_message(&self, user_id: &str) -> Result<(), SolaceError> {
        self.messages.check(user_id).inspect_err(|_| {
            warn!(user_id, "message rate limit exceeded");
        })
    }
}
