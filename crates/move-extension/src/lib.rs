//
// lib.rs
//
// Copyright (c) The Move Contributors
// SPDX-License-Identifier: Apache-2.0
//
//

pub mod activation;
pub mod commands;
pub mod config;
pub mod context;
pub mod events;
pub mod host;
pub mod inlay_hints;
pub mod reg;

/// Identifier the extension reports to logs and to the editor.
pub const EXTENSION_ID: &str = "move-analyzer";

/// Language id the extension's providers are scoped to.
pub const LANGUAGE_ID: &str = "move";

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
