//
// activation.rs
//
// Copyright (c) The Move Contributors
// SPDX-License-Identifier: Apache-2.0
//
//

use std::sync::Arc;

use crate::commands;
use crate::commands::CommandRegistry;
use crate::config::Configuration;
use crate::config::ConfigurationSource;
use crate::context::Context;
use crate::events::EventEmitter;
use crate::events::Subscription;
use crate::host::Editor;
use crate::host::InlayHintProvider;
use crate::inlay_hints::ServerInlayHintProvider;
use crate::reg;
use crate::EXTENSION_ID;

/// A successfully activated extension: the live session plus everything
/// registered with the editor on its behalf.
pub struct Extension {
    pub context: Arc<Context>,
    pub commands: Arc<CommandRegistry>,
    /// Provider registered for documents with the `move` language id.
    pub inlay_hint_provider: Arc<dyn InlayHintProvider>,
}

/// One-time startup wiring, in a fixed order: load settings, build the
/// session context, register editor contributions, start the client, push
/// the inlay-hint configuration, and leave a settings listener behind.
///
/// A context-creation failure is reported to the user exactly once and
/// resolves to `Ok(None)`: the extension stays inert for this editor
/// session, with nothing registered and nothing running.
#[tracing::instrument(level = "info", skip_all)]
pub async fn activate(
    editor: Arc<dyn Editor>,
    source: Arc<dyn ConfigurationSource>,
    configuration_changed: &EventEmitter<()>,
) -> anyhow::Result<Option<Extension>> {
    log::info!("{} version {}", EXTENSION_ID, crate::version());

    let configuration = Configuration::new(source.clone());
    log::info!("configuration: {}", configuration.describe());

    // An error here -- for example, an invalid `server.path` setting --
    // prevents the extension from providing any utility, so return early
    let context = match Context::new(editor.clone(), configuration) {
        Ok(context) => Arc::new(context),
        Err(err) => {
            editor.show_error_message(&format!("Could not activate {EXTENSION_ID}: {err}."));
            return Ok(None);
        },
    };

    let registry = Arc::new(CommandRegistry::new());
    commands::register_goto_definition(&registry, editor.clone());

    let inlay_hint_provider: Arc<dyn InlayHintProvider> =
        Arc::new(ServerInlayHintProvider::new(context.clone()));
    editor.register_inlay_hint_provider(crate::LANGUAGE_ID, inlay_hint_provider.clone());

    reg::register_contributed_commands(&registry, context.clone());

    // Configure other language features
    context.configure_language();

    // All other utilities provided by this extension occur via the server
    context.start_client().await?;

    context.push_inlay_hint_config(context.configuration().inlay_hint_preferences());

    let subscription =
        register_configuration_listener(context.clone(), source, configuration_changed);
    context.keep_subscription(subscription);

    log::info!("{EXTENSION_ID} activation complete");

    Ok(Some(Extension {
        context,
        commands: registry,
        inlay_hint_provider,
    }))
}

/// Re-push inlay-hint preferences whenever the host reports changed
/// settings. Reads go through a fresh [Configuration] each time; when no
/// client connection is live the push is skipped silently.
pub fn register_configuration_listener(
    context: Arc<Context>,
    source: Arc<dyn ConfigurationSource>,
    configuration_changed: &EventEmitter<()>,
) -> Subscription {
    configuration_changed.subscribe(move |_| {
        log::info!("Reloading inlay-hint configuration");
        let configuration = Configuration::new(source.clone());
        context.push_inlay_hint_config(configuration.inlay_hint_preferences());
    })
}
