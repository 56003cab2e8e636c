//
// config.rs
//
// Copyright (c) The Move Contributors
// SPDX-License-Identifier: Apache-2.0
//
//

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

/// Settings namespace in the host's configuration storage.
pub const CONFIGURATION_NAMESPACE: &str = "move-analyzer";

/// Default name of the language server binary. When the setting resolves to
/// this exact literal the path is left alone so the OS PATH search applies
/// at spawn time.
pub const DEFAULT_SERVER_NAME: &str = "move-analyzer";

pub const SERVER_PATH_KEY: &str = "server.path";
pub const INLAY_HINTS_PARAMETER_KEY: &str = "inlay.hints.parameter";
pub const INLAY_HINTS_FIELD_TYPE_KEY: &str = "inlay.hints.field.type";
pub const INLAY_HINTS_DECLARE_VAR_KEY: &str = "inlay.hints.declare.var";

/// Host platform, as far as executable naming is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    Linux,
    Mac,
    Windows,
}

impl Os {
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Os::Windows
        } else if cfg!(target_os = "macos") {
            Os::Mac
        } else {
            Os::Linux
        }
    }

    fn executable_suffix(&self) -> Option<&'static str> {
        match self {
            Os::Windows => Some(".exe"),
            Os::Linux | Os::Mac => None,
        }
    }
}

/// Raw configuration values, keyed within [CONFIGURATION_NAMESPACE].
///
/// The host owns the storage; this trait is the injection seam between the
/// extension and whatever that storage is (an editor settings store, a JSON
/// file for the headless harness, a map in tests).
pub trait ConfigurationSource: Send + Sync {
    /// Look up the raw value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<Value>;

    /// The full raw configuration object, for diagnostic logging.
    fn snapshot(&self) -> Value;
}

/// Typed view over the host's configuration storage.
///
/// Values are read from the source on every call, never cached, so a fresh
/// `Configuration` over the same source always reflects current settings.
#[derive(Clone)]
pub struct Configuration {
    source: Arc<dyn ConfigurationSource>,
}

impl Configuration {
    pub fn new(source: Arc<dyn ConfigurationSource>) -> Self {
        Self { source }
    }

    /// A string representation of the configured values, for logging.
    pub fn describe(&self) -> String {
        self.source.snapshot().to_string()
    }

    /// The path to the move-analyzer executable.
    pub fn server_path(&self) -> String {
        let stored = self
            .source
            .get(SERVER_PATH_KEY)
            .and_then(|value| value.as_str().map(str::to_string))
            .unwrap_or_else(|| DEFAULT_SERVER_NAME.to_string());

        resolve_server_path(
            &stored,
            Os::current(),
            home::home_dir().as_deref(),
            std::env::current_dir().ok().as_deref(),
        )
    }

    pub fn inlay_hint_preferences(&self) -> InlayHintPreferences {
        InlayHintPreferences {
            field_type: self.bool_setting(INLAY_HINTS_FIELD_TYPE_KEY),
            parameter: self.bool_setting(INLAY_HINTS_PARAMETER_KEY),
            declare_var: self.bool_setting(INLAY_HINTS_DECLARE_VAR_KEY),
        }
    }

    fn bool_setting(&self, key: &str) -> bool {
        // Missing entries and entries of the wrong type both read as false
        self.source
            .get(key)
            .and_then(|value| value.as_bool())
            .unwrap_or(false)
    }
}

/// Inlay-hint display preferences, pushed to the server as the payload of
/// the configuration notification. Field names are fixed by the server's
/// wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlayHintPreferences {
    pub field_type: bool,
    pub parameter: bool,
    pub declare_var: bool,
}

/// Normalize a stored server path. Deterministic in its inputs; the caller
/// supplies platform, home directory, and working directory so every arm is
/// testable on any host.
pub(crate) fn resolve_server_path(
    stored: &str,
    os: Os,
    home: Option<&Path>,
    cwd: Option<&Path>,
) -> String {
    // An empty string cannot name an executable; fall back to the default
    if stored.is_empty() {
        return DEFAULT_SERVER_NAME.to_string();
    }

    // The default literal means "search the PATH": return it unresolved
    if stored == DEFAULT_SERVER_NAME {
        return stored.to_string();
    }

    let mut path = stored.to_string();

    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = home {
            path = home.join(rest).to_string_lossy().into_owned();
        }
    }

    if let Some(suffix) = os.executable_suffix() {
        if !path.ends_with(suffix) {
            path.push_str(suffix);
        }
    }

    let path = PathBuf::from(path);
    let path = if path.is_absolute() {
        path
    } else if let Some(cwd) = cwd {
        cwd.join(path)
    } else {
        path
    };

    path.to_string_lossy().into_owned()
}

/// Configuration source backed by an in-memory JSON object. The object's
/// keys are the dotted setting names within the namespace.
pub struct MapConfigurationSource {
    values: Value,
}

impl MapConfigurationSource {
    pub fn new(values: Value) -> Self {
        // Accept either the bare namespace object or one wrapped in the
        // namespace key, the way a full settings file stores it
        let values = match values {
            Value::Object(mut object) => match object.remove(CONFIGURATION_NAMESPACE) {
                Some(inner @ Value::Object(_)) => inner,
                _ => Value::Object(object),
            },
            other => other,
        };
        Self { values }
    }
}

impl ConfigurationSource for MapConfigurationSource {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn snapshot(&self) -> Value {
        self.values.clone()
    }
}

/// Configuration source backed by a JSON settings file, re-read on every
/// access so that edits are picked up without restarting.
pub struct FileConfigurationSource {
    path: PathBuf,
}

impl FileConfigurationSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Value {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) => {
                log::warn!(
                    "Could not read settings file '{}': {err}",
                    self.path.display()
                );
                return Value::Object(Default::default());
            },
        };

        match serde_json::from_str(&text) {
            Ok(values) => MapConfigurationSource::new(values).values,
            Err(err) => {
                log::warn!(
                    "Settings file '{}' is not valid JSON: {err}",
                    self.path.display()
                );
                Value::Object(Default::default())
            },
        }
    }
}

impl ConfigurationSource for FileConfigurationSource {
    fn get(&self, key: &str) -> Option<Value> {
        self.load().get(key).cloned()
    }

    fn snapshot(&self) -> Value {
        self.load()
    }
}
