//! CLI smoke entry point.
//!
//! # Responsibility
//! - Load core configuration, open the configured backend, and print the
//!   project summaries.
//! - Keep output deterministic for quick local sanity checks.
//!
//! Usage: `rundown_cli [config.toml]` (defaults to `rundown.toml`).

use log::error;
use rundown_core::{
    init_logging_from, Backend, CoreConfig, EmbeddedStore, LogNotifier, ReferentialStore,
    RundownService, StorageLayout,
};
use std::process::ExitCode;

const DEFAULT_CONFIG_PATH: &str = "rundown.toml";

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("event=cli_exit module=cli status=error");
            eprintln!("rundown_cli: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), String> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = CoreConfig::load(&config_path).map_err(|err| err.to_string())?;
    init_logging_from(&config.logging).map_err(|err| err.to_string())?;

    let conn = config.open_connection().map_err(|err| err.to_string())?;
    println!("rundown_core version={}", rundown_core::core_version());
    println!("backend={}", config.storage.backend);

    match config.storage.backend {
        StorageLayout::Embedded => {
            let store = EmbeddedStore::try_new(&conn).map_err(|err| err.to_string())?;
            print_projects(store, &config)
        }
        StorageLayout::Referential => {
            let store = ReferentialStore::try_new(&conn).map_err(|err| err.to_string())?;
            print_projects(store, &config)
        }
    }
}

fn print_projects<B: Backend>(store: B, config: &CoreConfig) -> Result<(), String> {
    let service =
        RundownService::new(store, LogNotifier).with_max_projects(config.limits.max_projects);
    let projects = service.list_projects().map_err(|err| err.to_string())?;
    println!("projects={}/{}", projects.len(), service.max_projects());
    for project in projects {
        println!("{} items={} name={}", project.id, project.item_count, project.name);
    }
    Ok(())
}
