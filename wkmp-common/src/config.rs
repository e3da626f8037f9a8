//! Configuration file discovery and TOML loading

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Configuration file resolution in priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. Per-user config directory (`<config_dir>/wkmp/<file_name>`)
/// 4. System-wide config (`/etc/wkmp/<file_name>`, Linux only)
///
/// Returns `None` when no candidate exists; callers fall back to compiled
/// defaults. An explicit CLI or env path is returned even if it does not
/// exist so the caller can report it.
pub fn resolve_config_file(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    file_name: &str,
) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3/4: platform locations
    platform_config_candidates(file_name)
        .into_iter()
        .find(|candidate| candidate.exists())
}

/// Candidate config file locations for the current platform
fn platform_config_candidates(file_name: &str) -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join("wkmp").join(file_name));
    }

    if cfg!(target_os = "linux") {
        candidates.push(PathBuf::from("/etc/wkmp").join(file_name));
    }

    candidates
}

/// Load a TOML config file into `T`
///
/// A missing file is not an error: a warning is logged and `T::default()`
/// is returned. A file that exists but does not parse is an error.
pub fn load_toml_or_default<T>(path: Option<&Path>) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let Some(path) = path else {
        debug!("No config file found, using compiled defaults");
        return Ok(T::default());
    };

    if !path.exists() {
        warn!("Config file {} not found, using compiled defaults", path.display());
        return Ok(T::default());
    }

    let content = std::fs::read_to_string(path)?;
    let parsed = toml::from_str::<T>(&content)
        .map_err(|e| Error::Config(format!("Invalid config {}: {}", path.display(), e)))?;
    debug!("Loaded config from {}", path.display());
    Ok(parsed)
}

/// Parse TOML text into `T`, mapping failures to `Error::Config`
pub fn parse_toml<T: DeserializeOwned>(content: &str) -> Result<T> {
    toml::from_str::<T>(content).map_err(|e| Error::Config(format!("Invalid config: {}", e)))
}
