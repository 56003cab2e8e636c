//
// host.rs
//
// Copyright (c) The Move Contributors
// SPDX-License-Identifier: Apache-2.0
//
//

use std::sync::Arc;

use async_trait::async_trait;
use lsp_types::InlayHint;
use lsp_types::Range;
use lsp_types::Url;

/// The hosting editor, as seen from the extension.
///
/// Everything the activation layer needs from the IDE goes through this
/// trait: the extension never reads ambient editor state directly.
pub trait Editor: Send + Sync {
    /// Surface a user-visible error notification.
    fn show_error_message(&self, message: &str);

    /// Open `path` in an editor pane and set the selection to `selection`,
    /// taking focus.
    fn open_document(&self, path: &str, selection: Range) -> anyhow::Result<()>;

    /// Apply language-level editing behavior for Move documents. Opaque to
    /// the activation layer; the editor interprets the configuration.
    fn configure_language(&self, configuration: &LanguageConfiguration);

    /// Register `provider` for documents with the given language id. The
    /// editor owns the registration for the rest of the session.
    fn register_inlay_hint_provider(&self, language_id: &str, provider: Arc<dyn InlayHintProvider>);
}

/// Editing behavior for the Move language, applied during activation.
#[derive(Debug, Clone)]
pub struct LanguageConfiguration {
    pub language_id: String,
    pub line_comment: String,
    pub block_comment: (String, String),
    /// Identifier pattern used for word-wise selection and renames.
    pub word_pattern: String,
}

impl Default for LanguageConfiguration {
    fn default() -> Self {
        Self {
            language_id: crate::LANGUAGE_ID.to_string(),
            line_comment: String::from("//"),
            block_comment: (String::from("/*"), String::from("*/")),
            word_pattern: String::from(r"[a-zA-Z_][a-zA-Z0-9_]*"),
        }
    }
}

/// Provider of inlay hints for one document range.
///
/// Each call stands alone: implementations re-issue whatever backend request
/// they need and never cache across calls.
#[async_trait]
pub trait InlayHintProvider: Send + Sync {
    async fn provide(&self, uri: Url, range: Range) -> Option<Vec<InlayHint>>;
}
