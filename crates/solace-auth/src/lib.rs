// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bearer token verification for the Solace conversation engine.
//!
//! Tokens are HS256 compact tokens minted by the `solace token` command (or
//! an external issuer sharing the secret). Verification checks signature and
//! expiry, then re-confirms the account is still active in the store.

pub mod token;
pub mod verifier;

pub use token::{Claims, mint, sign, verify};
pub use verifier::TokenVerifier;
