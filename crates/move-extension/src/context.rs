//
// context.rs
//
// Copyright (c) The Move Contributors
// SPDX-License-Identifier: Apache-2.0
//
//

use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use lsp_client::Client;
use lsp_client::ServerSession;
use lsp_types::InitializeParams;

use crate::config::Configuration;
use crate::config::InlayHintPreferences;
use crate::config::DEFAULT_SERVER_NAME;
use crate::events::Subscription;
use crate::events::Subscriptions;
use crate::host::Editor;
use crate::host::LanguageConfiguration;
use crate::inlay_hints::InlayHintsConfigNotification;

/// Why a session context could not be built.
///
/// Any of these leaves the extension inert: the caller reports once and
/// stops, with no partial state behind.
#[derive(Debug)]
pub enum ContextCreationError {
    /// The configured path does not name an existing file.
    ServerNotFound { path: String },
    /// The default binary name was configured but no such binary is on the
    /// PATH.
    ServerNotOnPath { name: String },
    /// The configured path exists but is not an executable file.
    ServerNotExecutable { path: String },
}

impl fmt::Display for ContextCreationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ContextCreationError::ServerNotFound { path } => {
                write!(f, "language server binary not found at '{path}'")
            },
            ContextCreationError::ServerNotOnPath { name } => {
                write!(f, "language server '{name}' not found on the PATH")
            },
            ContextCreationError::ServerNotExecutable { path } => {
                write!(f, "language server binary at '{path}' is not executable")
            },
        }
    }
}

impl std::error::Error for ContextCreationError {}

/// The extension's session: configuration, the editor handle, and the
/// language-server client lifecycle.
pub struct Context {
    editor: Arc<dyn Editor>,
    configuration: Configuration,
    server_path: String,
    client: Mutex<Option<Client>>,
    /// The spawned server process, when this context launched one itself.
    session: Mutex<Option<ServerSession>>,
    subscriptions: Mutex<Subscriptions>,
}

impl Context {
    /// Build a context over a validated server binary.
    ///
    /// The server path is resolved from the configuration once, here; a
    /// path that does not lead to an executable fails creation rather than
    /// failing later inside the client.
    pub fn new(
        editor: Arc<dyn Editor>,
        configuration: Configuration,
    ) -> Result<Self, ContextCreationError> {
        let server_path = configuration.server_path();
        validate_server_path(&server_path, &path_entries())?;

        Ok(Self {
            editor,
            configuration,
            server_path,
            client: Mutex::new(None),
            session: Mutex::new(None),
            subscriptions: Mutex::new(Subscriptions::new()),
        })
    }

    pub fn editor(&self) -> Arc<dyn Editor> {
        self.editor.clone()
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn server_path(&self) -> &str {
        &self.server_path
    }

    /// Apply Move language editing behavior to the editor.
    pub fn configure_language(&self) {
        self.editor
            .configure_language(&LanguageConfiguration::default());
    }

    /// Spawn the language server and run the LSP handshake. Once this
    /// resolves the session is live and [Context::client] returns a handle.
    pub async fn start_client(&self) -> anyhow::Result<()> {
        let session = ServerSession::spawn(&self.server_path, &[])?;
        let client = session.client();

        let result = client
            .initialize(InitializeParams {
                process_id: Some(std::process::id()),
                ..Default::default()
            })
            .await?;

        if let Some(info) = result.server_info {
            log::info!(
                "Connected to {} {}",
                info.name,
                info.version.unwrap_or_default()
            );
        }

        *self.session.lock().unwrap() = Some(session);
        *self.client.lock().unwrap() = Some(client);
        Ok(())
    }

    /// The current client handle, if a live connection exists.
    pub fn client(&self) -> Option<Client> {
        let client = self.client.lock().unwrap();
        client.clone().filter(Client::is_connected)
    }

    /// Send current inlay-hint preferences to the server.
    ///
    /// Deliberately skipped, without queueing or retrying, when no live
    /// connection exists; the next push delivers the then-current values.
    pub fn push_inlay_hint_config(&self, preferences: InlayHintPreferences) {
        let Some(client) = self.client() else {
            log::debug!("No live client connection; not pushing inlay-hint config");
            return;
        };

        if let Err(err) = client.notify::<InlayHintsConfigNotification>(preferences) {
            log::error!("Could not push inlay-hint config: {err}");
        }
    }

    /// Park a subscription on the session's lifecycle list; it is released
    /// when the context is dropped.
    pub fn keep_subscription(&self, subscription: Subscription) {
        self.subscriptions.lock().unwrap().push(subscription);
    }

    /// Shut the language server down, if one is running.
    pub async fn shutdown(&self) -> anyhow::Result<()> {
        let client = self.client.lock().unwrap().take();
        let session = self.session.lock().unwrap().take();

        if let Some(session) = session {
            session.close().await?;
        } else if let Some(client) = client {
            if client.is_connected() {
                client.shutdown().await?;
            }
        }
        Ok(())
    }

    /// Wire a pre-connected client in place of a spawned process.
    #[cfg(any(test, feature = "testing"))]
    pub fn attach_client(&self, client: Client) {
        *self.client.lock().unwrap() = Some(client);
    }
}

fn path_entries() -> Vec<PathBuf> {
    match std::env::var_os("PATH") {
        Some(path) => std::env::split_paths(&path).collect(),
        None => Vec::new(),
    }
}

/// Check that `server_path` leads to something the process spawner can run.
fn validate_server_path(
    server_path: &str,
    path_entries: &[PathBuf],
) -> Result<(), ContextCreationError> {
    // The unresolved default name relies on the spawner's own PATH search;
    // mirror that search here so a missing binary fails activation instead
    // of the first request
    if server_path == DEFAULT_SERVER_NAME {
        let found = path_entries.iter().any(|dir| {
            is_executable(&dir.join(server_path))
                || is_executable(&dir.join(format!("{server_path}.exe")))
        });
        if !found {
            return Err(ContextCreationError::ServerNotOnPath {
                name: server_path.to_string(),
            });
        }
        return Ok(());
    }

    let path = Path::new(server_path);
    if !path.is_file() {
        return Err(ContextCreationError::ServerNotFound {
            path: server_path.to_string(),
        });
    }
    if !is_executable(path) {
        return Err(ContextCreationError::ServerNotExecutable {
            path: server_path.to_string(),
        });
    }
    Ok(())
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|metadata| metadata.is_file() && metadata.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use assert_matches::assert_matches;

    use super::*;

    fn executable_file(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"#!/bin/sh\n").unwrap();

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        path
    }

    #[test]
    fn test_missing_binary_fails_validation() {
        let err = validate_server_path("/does/not/exist/move-analyzer", &[]).unwrap_err();
        assert_matches!(err, ContextCreationError::ServerNotFound { .. });
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_default_name_requires_path_hit() {
        let err = validate_server_path(DEFAULT_SERVER_NAME, &[]).unwrap_err();
        assert_matches!(err, ContextCreationError::ServerNotOnPath { .. });
    }

    #[test]
    fn test_default_name_found_on_path() {
        let dir = tempfile::tempdir().unwrap();
        executable_file(dir.path(), DEFAULT_SERVER_NAME);

        let entries = vec![dir.path().to_path_buf()];
        validate_server_path(DEFAULT_SERVER_NAME, &entries).unwrap();
    }

    #[test]
    fn test_explicit_executable_passes() {
        let dir = tempfile::tempdir().unwrap();
        let path = executable_file(dir.path(), "custom-analyzer");

        validate_server_path(path.to_str().unwrap(), &[]).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_non_executable_file_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not-runnable");
        std::fs::write(&path, b"data").unwrap();

        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let err = validate_server_path(path.to_str().unwrap(), &[]).unwrap_err();
        assert_matches!(err, ContextCreationError::ServerNotExecutable { .. });
    }

    #[test]
    fn test_directory_is_not_a_server() {
        let dir = tempfile::tempdir().unwrap();
        let err = validate_server_path(dir.path().to_str().unwrap(), &[]).unwrap_err();
        assert_matches!(err, ContextCreationError::ServerNotFound { .. });
    }
}
