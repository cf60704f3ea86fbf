// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HS256 compact bearer tokens.
//!
//! Format: `base64url(header).base64url(claims).base64url(hmac-sha256)`,
//! compatible with JWT HS256. Signature comparison goes through
//! `Mac::verify_slice`, which is constant-time.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use solace_core::SolaceError;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

const HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// Claims carried by a bearer token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id.
    pub sub: String,
    /// Issued-at, seconds since epoch.
    pub iat: i64,
    /// Expiry, seconds since epoch.
    pub exp: i64,
}

/// Why a token was rejected. Never returned to clients; feeds the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenRejection {
    #[error("malformed token")]
    Malformed,
    #[error("bad signature")]
    BadSignature,
    #[error("expired")]
    Expired,
}

fn mac(secret: &str) -> Result<HmacSha256, SolaceError> {
    HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| SolaceError::Config(format!("invalid token secret: {e}")))
}

/// Mint a signed token for the given claims.
pub fn sign(secret: &str, claims: &Claims) -> Result<String, SolaceError> {
    let header_b64 = URL_SAFE_NO_PAD.encode(HEADER.as_bytes());
    let claims_json = serde_json::to_string(claims)
        .map_err(|e| SolaceError::Internal(format!("claims serialization failed: {e}")))?;
    let claims_b64 = URL_SAFE_NO_PAD.encode(claims_json.as_bytes());

    let signing_input = format!("{header_b64}.{claims_b64}");
    let mut mac = mac(secret)?;
    mac.update(signing_input.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{signing_input}.{signature}"))
}

/// Mint a token for `user_id` valid for `ttl_secs` from now.
pub fn mint(secret: &str, user_id: &str, ttl_secs: u64) -> Result<String, SolaceError> {
    let now = chrono::Utc::now().timestamp();
    sign(
        secret,
        &Claims {
            sub: user_id.to_string(),
            iat: now,
            exp: now + ttl_secs as i64,
        },
    )
}

/// Verify a token's signature and expiry against `now_epoch_secs` and
/// return its claims.
pub fn verify(secret: &str, token: &str, now_epoch_secs: i64) -> Result<Claims, TokenRejection> {
    let mut parts = token.split('.');
    let (Some(header_b64), Some(claims_b64), Some(sig_b64), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(TokenRejection::Malformed);
    };

    let header_bytes = URL_SAFE_NO_PAD
        .decode(header_b64)
        .map_err(|_| TokenRejection::Malformed)?;
    let header: serde_json::Value =
        serde_json::from_slice(&header_bytes).map_err(|_| TokenRejection::Malformed)?;
    if header.get("alg").and_then(|a| a.as_str()) != Some("HS256") {
        return Err(TokenRejection::Malformed);
    }

    let signature = URL_SAFE_NO_PAD
        .decode(sig_b64)
        .map_err(|_| TokenRejection::Malformed)?;
    let signing_input = format!("{header_b64}.{claims_b64}");
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| TokenRejection::Malformed)?;
    mac.update(signing_input.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| TokenRejection::BadSignature)?;

    // Only trust the claims after the signature checks out.
    let claims_bytes = URL_SAFE_NO_PAD
        .decode(claims_b64)
        .map_err(|_| TokenRejection::Malformed)?;
    let claims: Claims =
        serde_json::from_slice(&claims_bytes).map_err(|_| TokenRejection::Malformed)?;

    if claims.exp <= now_epoch_secs {
        return Err(TokenRejection::Expired);
    }

    Ok(claims)
}
