// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules. All functions accept `&Database` and run through
//! the single-writer connection.

pub mod conversations;
pub mod messages;
pub mod users;
