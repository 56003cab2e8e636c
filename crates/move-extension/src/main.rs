//
// main.rs
//
// Copyright (c) The Move Contributors
// SPDX-License-Identifier: Apache-2.0
//
//

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use log::*;
use lsp_types::Range;
use move_extension::activation;
use move_extension::config::ConfigurationSource;
use move_extension::config::FileConfigurationSource;
use move_extension::events::EventEmitter;
use move_extension::host::Editor;
use move_extension::host::InlayHintProvider;
use move_extension::host::LanguageConfiguration;
use notify::Watcher;
use tracing_subscriber::EnvFilter;

/// Editor adapter for running the extension shim without a graphical host.
/// User-facing messages go to stderr, everything else is logged.
#[derive(Default)]
struct TerminalEditor {
    inlay_hint_providers: Mutex<Vec<Arc<dyn InlayHintProvider>>>,
}

impl Editor for TerminalEditor {
    fn show_error_message(&self, message: &str) {
        eprintln!("{message}");
    }

    fn open_document(&self, file_path: &str, range: Range) -> anyhow::Result<()> {
        info!(
            "Open {} at {}:{}",
            file_path, range.start.line, range.start.character
        );
        Ok(())
    }

    fn configure_language(&self, configuration: &LanguageConfiguration) {
        debug!("Configured language '{}'", configuration.language_id);
    }

    fn register_inlay_hint_provider(
        &self,
        language_id: &str,
        provider: Arc<dyn InlayHintProvider>,
    ) {
        // No documents are rendered here; hold the registration so its
        // lifetime matches a real host's
        debug!("Registered inlay hint provider for '{language_id}'");
        self.inlay_hint_providers.lock().unwrap().push(provider);
    }
}

// Re-reads happen lazily on each configuration access; the watcher only
// tells listeners that a read is worth repeating.
fn watch_settings(
    path: &Path,
    configuration_changed: Arc<EventEmitter<()>>,
) -> anyhow::Result<notify::RecommendedWatcher> {
    let (tx, rx) = std::sync::mpsc::channel();

    let mut watcher = notify::recommended_watcher(tx)?;
    watcher.watch(path, notify::RecursiveMode::NonRecursive)?;

    std::thread::spawn(move || {
        for event in rx {
            match event {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    configuration_changed.emit(&());
                },
                Ok(_) => {},
                Err(err) => warn!("Settings watcher error: {err}"),
            }
        }
    });

    Ok(watcher)
}

fn print_usage() {
    println!(
        "move-extension {}, the move-analyzer activation shim.",
        env!("CARGO_PKG_VERSION")
    );
    println!(
        r#"
Usage: move-extension [OPTIONS]

Available options:

--settings FILE          Read extension settings from the given JSON file
                         and reload them whenever the file changes
--log FILE               Log to the given file (if not specified, stdout/stderr
                         will be used)
--version                Print the version of move-extension
--help                   Print this help message
"#
    );
}

#[derive(Debug, PartialEq, Eq)]
enum CliCommand {
    Activate {
        settings_file: String,
        log_file: Option<String>,
    },
    Version,
    Help,
}

fn parse_args(mut argv: impl Iterator<Item = String>) -> Result<CliCommand, String> {
    let mut settings_file: Option<String> = None;
    let mut log_file: Option<String> = None;

    while let Some(arg) = argv.next() {
        match arg.as_str() {
            "--settings" => {
                let Some(file) = argv.next() else {
                    return Err(String::from(
                        "A settings file must be specified with the --settings argument.",
                    ));
                };
                settings_file = Some(file);
            },
            "--log" => {
                let Some(file) = argv.next() else {
                    return Err(String::from(
                        "A log file must be specified with the --log argument.",
                    ));
                };
                log_file = Some(file);
            },
            "--version" => return Ok(CliCommand::Version),
            "--help" => return Ok(CliCommand::Help),
            other => return Err(format!("Unknown argument '{other}'.")),
        }
    }

    let Some(settings_file) = settings_file else {
        return Err(String::from(
            "A settings file must be specified with the --settings argument.",
        ));
    };

    Ok(CliCommand::Activate {
        settings_file,
        log_file,
    })
}

fn initialize_logging(log_file: Option<&str>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .append(true)
                .create(true)
                .open(path)?;
            builder
                .with_writer(Arc::new(file))
                .with_ansi(false)
                .init();
        },
        None => builder.init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Get an iterator over all the command-line arguments, skipping the
    // first "argument" as it's the path/name to this executable
    let command = match parse_args(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(message) => {
            eprintln!("{message}");
            print_usage();
            std::process::exit(1);
        },
    };

    let (settings_file, log_file) = match command {
        CliCommand::Activate {
            settings_file,
            log_file,
        } => (settings_file, log_file),
        CliCommand::Version => {
            println!("move-extension {}", move_extension::version());
            return Ok(());
        },
        CliCommand::Help => {
            print_usage();
            return Ok(());
        },
    };

    initialize_logging(log_file.as_deref())?;

    let settings_path = PathBuf::from(&settings_file);

    let editor: Arc<dyn Editor> = Arc::new(TerminalEditor::default());
    let source: Arc<dyn ConfigurationSource> =
        Arc::new(FileConfigurationSource::new(&settings_path));
    let configuration_changed = Arc::new(EventEmitter::new());

    // Held for the lifetime of the session; dropping it stops the watch
    let _watcher = match watch_settings(&settings_path, configuration_changed.clone()) {
        Ok(watcher) => Some(watcher),
        Err(err) => {
            warn!("Could not watch {settings_file}: {err}");
            None
        },
    };

    let Some(extension) = activation::activate(editor, source, &configuration_changed).await?
    else {
        // The user has already been told why
        std::process::exit(1);
    };

    info!("Serving; press Ctrl-C to exit");
    tokio::signal::ctrl_c().await?;

    extension.context.shutdown().await?;

    Ok(())
}
