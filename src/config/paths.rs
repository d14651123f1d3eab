//! Where topomap keeps its files
//!
//! Lookup order for the config directory:
//! 1. `$TOPOMAP_CONFIG_DIR`
//! 2. `$XDG_CONFIG_HOME/topomap`
//! 3. the platform config dir (`~/.config/topomap`, `%APPDATA%\topomap\config`)
//! 4. `./.config/topomap`

use std::path::{Path, PathBuf};

const APP_DIR: &str = "topomap";
const CONFIG_FILE: &str = "config.yaml";

/// Overrides every other lookup when set and non-empty
pub const CONFIG_DIR_ENV: &str = "TOPOMAP_CONFIG_DIR";

/// Directory holding `config.yaml`
pub fn config_dir() -> PathBuf {
    if let Some(dir) = env_dir(CONFIG_DIR_ENV) {
        return dir;
    }
    if let Some(xdg) = env_dir("XDG_CONFIG_HOME") {
        return xdg.join(APP_DIR);
    }
    platform_config_dir().unwrap_or_else(|| PathBuf::from(".config").join(APP_DIR))
}

/// Full path of the config file
pub fn root_config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE)
}

/// Create `path` and its parents; existing directories are fine
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(path)
}

fn env_dir(var: &str) -> Option<PathBuf> {
    std::env::var_os(var)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

#[cfg(windows)]
fn platform_config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_DIR).map(|dirs| dirs.config_dir().to_path_buf())
}

#[cfg(not(windows))]
fn platform_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.home_dir().join(".config").join(APP_DIR))
}
