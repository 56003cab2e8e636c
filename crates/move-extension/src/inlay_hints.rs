//
// inlay_hints.rs
//
// Copyright (c) The Move Contributors
// SPDX-License-Identifier: Apache-2.0
//
//

use std::sync::Arc;

use async_trait::async_trait;
use lsp_types::InlayHint;
use lsp_types::InlayHintParams;
use lsp_types::Range;
use lsp_types::TextDocumentIdentifier;
use lsp_types::Url;

use crate::config::InlayHintPreferences;
use crate::context::Context;
use crate::host::InlayHintProvider;

/// Server-specific notification carrying the user's inlay-hint preferences.
#[derive(Debug)]
pub enum InlayHintsConfigNotification {}

impl lsp_types::notification::Notification for InlayHintsConfigNotification {
    type Params = InlayHintPreferences;
    const METHOD: &'static str = "move/lsp/client/inlay_hints/config";
}

/// Inlay hints straight from the language server.
///
/// Every provider call issues a fresh `textDocument/inlayHint` request;
/// nothing is computed or cached on this side. Without a live client the
/// provider answers with nothing rather than an error, so the editor just
/// renders no hints.
pub struct ServerInlayHintProvider {
    context: Arc<Context>,
}

impl ServerInlayHintProvider {
    pub fn new(context: Arc<Context>) -> Self {
        Self { context }
    }
}

#[async_trait]
impl InlayHintProvider for ServerInlayHintProvider {
    #[tracing::instrument(level = "info", skip_all)]
    async fn provide(&self, uri: Url, range: Range) -> Option<Vec<InlayHint>> {
        let client = self.context.client()?;

        let params = InlayHintParams {
            work_done_progress_params: Default::default(),
            text_document: TextDocumentIdentifier { uri },
            range,
        };

        match client
            .request::<lsp_types::request::InlayHintRequest>(params)
            .await
        {
            Ok(hints) => hints,
            Err(err) => {
                log::error!("Inlay hint request failed: {err}");
                None
            },
        }
    }
}
