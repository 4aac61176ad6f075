//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::path::Path;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use sitesync_core::{VlanCatalog, Workspace, loader};

use crate::cli::GlobalOpts;
use crate::config::{self, Config};
use crate::error::CliError;

/// Config file plus the directory layout it describes.
pub fn session(global: &GlobalOpts) -> Result<(Config, Workspace), CliError> {
    let cfg = config::load_config()?;
    let workspace = config::workspace(global, &cfg);
    Ok((cfg, workspace))
}

/// Load `vlans.json`, distinguishing "not there" from "broken".
pub fn load_catalog(workspace: &Workspace) -> Result<VlanCatalog, CliError> {
    let path = workspace.catalog_path();
    if !path.is_file() {
        return Err(CliError::NoCatalog {
            path: path.display().to_string(),
        });
    }
    Ok(loader::load_catalog(&path)?)
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Spinner on stderr while a long call runs; hidden when not interactive.
pub fn spinner(global: &GlobalOpts, message: String) -> ProgressBar {
    if global.quiet || !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg} [{elapsed}]") {
        bar.set_style(style);
    }
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

/// Write `contents` unless the file exists and `force` is off.
/// Returns whether the file was written.
pub fn write_new(path: &Path, contents: &str, force: bool) -> Result<bool, CliError> {
    if path.exists() && !force {
        return Ok(false);
    }
    std::fs::write(path, contents).map_err(|source| CliError::File {
        path: path.display().to_string(),
        source,
    })?;
    Ok(true)
}

pub fn create_dir(path: &Path) -> Result<(), CliError> {
    std::fs::create_dir_all(path).map_err(|source| CliError::File {
        path: path.display().to_string(),
        source,
    })
}
