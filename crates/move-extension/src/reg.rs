//
// reg.rs
//
// Copyright (c) The Move Contributors
// SPDX-License-Identifier: Apache-2.0
//
//

use std::sync::Arc;

use crate::commands::CommandRegistry;
use crate::context::Context;

pub const RELOAD_INLAY_HINTS_COMMAND: &str = "move.reload.inlay.hints";

/// Register the remaining commands the extension contributes beyond
/// `goto_definition`.
pub fn register_contributed_commands(registry: &CommandRegistry, context: Arc<Context>) {
    register_reload_inlay_hints(registry, context);
}

/// Re-read inlay-hint preferences and push them to the server on demand,
/// without waiting for a configuration-change event.
fn register_reload_inlay_hints(registry: &CommandRegistry, context: Arc<Context>) {
    registry.register(RELOAD_INLAY_HINTS_COMMAND, move |_payload| {
        // Configuration reads are never cached, so this picks up current
        // settings
        let preferences = context.configuration().inlay_hint_preferences();
        context.push_inlay_hint_config(preferences);
        Ok(())
    });
}
