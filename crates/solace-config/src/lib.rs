// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Solace conversation engine.
//!
//! TOML files merged across the XDG hierarchy with `SOLACE_*` environment
//! overrides, extracted into strongly typed config structs with
//! `deny_unknown_fields`.

pub mod loader;
pub mod model;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::SolaceConfig;
