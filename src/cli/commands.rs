//! CLI command implementations
//!
//! Every command opens the container file through a `Store` handle, runs one
//! operation, and closes the handle. Read-only commands never rewrite the file.

use std::path::Path;

use crate::config::Config;
use crate::handle::Store;
use crate::observability::Logger;
use crate::storage::FileEngine;
use crate::tree::AttrPolicy;

use super::args::{Cli, Command};
use super::errors::CliResult;
use super::io::{info_json, value_json, write_json, write_lines};

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    let config = load_config(cli.config.as_deref())?;
    Logger::set_min_severity(config.severity()?);
    run_command(cli.command, &config)
}

/// Load the config file, or defaults when none is given
pub fn load_config(path: Option<&Path>) -> CliResult<Config> {
    match path {
        Some(path) => Ok(Config::load(path)?),
        None => Ok(Config::default()),
    }
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command, config: &Config) -> CliResult<()> {
    match cmd {
        Command::Ls {
            file,
            path,
            recursive,
            full_names,
        } => write_lines(&ls(&file, &path, recursive, full_names, config)?),
        Command::Tree { file, path, attrs } => write_lines(&[tree(&file, &path, attrs, config)?]),
        Command::Cat { file, path, attrs } => {
            let policy: AttrPolicy = match attrs {
                Some(spec) => spec.parse()?,
                None => config.attr_policy()?,
            };
            write_json(&cat(&file, &path, &policy, config)?)
        }
        Command::Info { file, path } => write_json(&info(&file, &path, config)?),
        Command::Rm { file, path, attr } => rm(&file, &path, attr.as_deref(), config),
        Command::Mv { file, from, to } => mv(&file, &from, &to, config),
    }
}

fn open(file: &Path, config: &Config) -> CliResult<Store<FileEngine>> {
    let engine = FileEngine::open(file)?;
    Ok(Store::open(engine, config)?)
}

/// Child names of a container
pub fn ls(
    file: &Path,
    path: &str,
    recursive: bool,
    full_names: bool,
    config: &Config,
) -> CliResult<Vec<String>> {
    let mut store = open(file, config)?;
    let names = store.ls(path, recursive, full_names)?;
    store.close()?;
    Ok(names)
}

/// Box-drawing tree below an address
pub fn tree(file: &Path, path: &str, show_attrs: bool, config: &Config) -> CliResult<String> {
    let mut store = open(file, config)?;
    let rendered = store.str(path, show_attrs)?;
    store.close()?;
    Ok(rendered.trim_end().to_string())
}

/// A stored value as JSON
pub fn cat(
    file: &Path,
    path: &str,
    policy: &AttrPolicy,
    config: &Config,
) -> CliResult<serde_json::Value> {
    let mut store = open(file, config)?;
    let value = store.read_with(path, policy)?;
    store.close()?;
    Ok(value_json(&value))
}

/// Storage details of a node as JSON
pub fn info(file: &Path, path: &str, config: &Config) -> CliResult<serde_json::Value> {
    let mut store = open(file, config)?;
    let info = store.info(path)?;
    store.close()?;
    Ok(info_json(&info))
}

/// Delete a node, or one of its attributes
pub fn rm(file: &Path, path: &str, attr: Option<&str>, config: &Config) -> CliResult<()> {
    let mut store = open(file, config)?;
    match attr {
        Some(name) => store.delete_attr(path, name)?,
        None => store.delete(path)?,
    }
    store.close()?;
    Ok(())
}

/// Move a node, creating parents of the target
pub fn mv(file: &Path, from: &str, to: &str, config: &Config) -> CliResult<()> {
    let mut store = open(file, config)?;
    store.rename(from, to)?;
    store.close()?;
    Ok(())
}
