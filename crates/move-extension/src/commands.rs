//
// commands.rs
//
// Copyright (c) The Move Contributors
// SPDX-License-Identifier: Apache-2.0
//
//

use std::sync::Arc;
use std::sync::Mutex;

use anyhow::anyhow;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::host::Editor;

pub const GOTO_DEFINITION_COMMAND: &str = "goto_definition";

type CommandHandler = Box<dyn Fn(Value) -> anyhow::Result<()> + Send + Sync>;

/// Named commands contributed to the editor.
///
/// Registration order is preserved so the contributed command palette lists
/// commands the way the extension declared them.
#[derive(Default)]
pub struct CommandRegistry {
    commands: Mutex<Vec<(String, CommandHandler)>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &self,
        name: impl Into<String>,
        handler: impl Fn(Value) -> anyhow::Result<()> + Send + Sync + 'static,
    ) {
        let name = name.into();
        let mut commands = self.commands.lock().unwrap();

        // Last registration wins, as in the editor's own command table
        commands.retain(|(existing, _)| *existing != name);
        commands.push((name, Box::new(handler)));
    }

    #[tracing::instrument(level = "info", skip(self, payload))]
    pub fn execute(&self, name: &str, payload: Value) -> anyhow::Result<()> {
        let commands = self.commands.lock().unwrap();
        let Some((_, handler)) = commands.iter().find(|(existing, _)| existing == name) else {
            return Err(anyhow!("Unknown command '{name}'"));
        };
        handler(payload)
    }

    pub fn names(&self) -> Vec<String> {
        self.commands
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.lock().unwrap().is_empty()
    }
}

/// Payload of the `goto_definition` command: where to jump.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub range: lsp_types::Range,
    #[serde(rename = "filePath")]
    pub file_path: String,
}

/// Register the `goto_definition` command: open the target document and set
/// the editor selection to the given range.
pub fn register_goto_definition(registry: &CommandRegistry, editor: Arc<dyn Editor>) {
    registry.register(GOTO_DEFINITION_COMMAND, move |payload| {
        let location: Location = serde_json::from_value(payload)?;
        editor.open_document(&location.file_path, location.range)
    });
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;
    use crate::host::LanguageConfiguration;

    #[derive(Default)]
    struct RecordingEditor {
        opened: Mutex<Vec<(String, lsp_types::Range)>>,
    }

    impl Editor for RecordingEditor {
        fn show_error_message(&self, _message: &str) {}

        fn open_document(&self, path: &str, selection: lsp_types::Range) -> anyhow::Result<()> {
            self.opened
                .lock()
                .unwrap()
                .push((path.to_string(), selection));
            Ok(())
        }

        fn configure_language(&self, _configuration: &LanguageConfiguration) {}

        fn register_inlay_hint_provider(
            &self,
            _language_id: &str,
            _provider: Arc<dyn crate::host::InlayHintProvider>,
        ) {
        }
    }

    #[test]
    fn test_goto_definition_opens_document_with_selection() {
        let registry = CommandRegistry::new();
        let editor = Arc::new(RecordingEditor::default());
        register_goto_definition(&registry, editor.clone());

        registry
            .execute(
                GOTO_DEFINITION_COMMAND,
                json!({
                    "filePath": "/work/project/sources/coin.move",
                    "range": {
                        "start": { "line": 12, "character": 4 },
                        "end": { "line": 12, "character": 9 },
                    },
                }),
            )
            .unwrap();

        let opened = editor.opened.lock().unwrap();
        assert_eq!(opened.len(), 1);
        assert_eq!(opened[0].0, "/work/project/sources/coin.move");
        assert_eq!(opened[0].1.start.line, 12);
    }

    #[test]
    fn test_goto_definition_rejects_malformed_payload() {
        let registry = CommandRegistry::new();
        register_goto_definition(&registry, Arc::new(RecordingEditor::default()));

        let result = registry.execute(GOTO_DEFINITION_COMMAND, json!({ "nope": true }));
        assert_matches!(result, Err(_));
    }

    #[test]
    fn test_unknown_command_is_an_error() {
        let registry = CommandRegistry::new();
        let result = registry.execute("does.not.exist", Value::Null);
        assert_matches!(result, Err(_));
    }

    #[test]
    fn test_registration_order_is_preserved() {
        let registry = CommandRegistry::new();
        registry.register("b", |_| Ok(()));
        registry.register("a", |_| Ok(()));
        registry.register("b", |_| Ok(()));

        // Re-registering moves the command to the end
        assert_eq!(registry.names(), vec!["a", "b"]);
    }
}
