//! Path resolution for sysunit
//!
//! # Environment Variables
//!
//! - `SYSUNIT_CONFIG_DIR` - Override config directory
//! - `SYSUNIT_PATH` - Colon-separated unit search path, overrides `units.path`
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `SYSUNIT_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/sysunit` (if set)
//! 3. `~/.config/sysunit`

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "SYSUNIT_CONFIG_DIR";

/// Environment variable for the unit search path
pub const ENV_UNIT_PATH: &str = "SYSUNIT_PATH";

/// Name of the config file inside the config directory
pub const CONFIG_FILE: &str = "config.toml";

/// Get the sysunit config directory path
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!(
            "Using config dir from {}: {}",
            ENV_CONFIG_DIR,
            path.display()
        );
        return Ok(path);
    }

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join("sysunit");
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join("sysunit");
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Get the path of the config file
pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE))
}

/// Unit search path from `SYSUNIT_PATH`, if set and non-empty
pub fn unit_path_from_env() -> Option<Vec<PathBuf>> {
    let raw = std::env::var(ENV_UNIT_PATH).ok()?;
    let dirs: Vec<PathBuf> = raw
        .split(':')
        .filter(|s| !s.is_empty())
        .map(expand)
        .collect();

    if dirs.is_empty() { None } else { Some(dirs) }
}

/// Expand `~` and environment variables in a path
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}
