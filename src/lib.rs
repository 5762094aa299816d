//! Common functionality for pvflow, a tool for modelling the lifecycle mass flows of deployed
//! photovoltaic modules.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod cli;
pub mod id;
pub mod input;
pub mod log;
pub mod model;
pub mod output;
pub mod reliability;
pub mod scenario;
pub mod settings;
pub mod simulation;
pub mod units;

#[cfg(test)]
mod fixture;

/// Get config dir for program.
///
/// The `PVFLOW_CONFIG_DIR` environment variable takes precedence. Otherwise the platform's config
/// directory is used (e.g. `~/.config/pvflow` on Linux).
pub fn get_pvflow_config_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("PVFLOW_CONFIG_DIR") {
        return PathBuf::from(dir);
    }

    let mut path = dirs::config_dir().unwrap_or_default();
    path.push("pvflow");
    path
}
