//! Module for locating the tabletdriver settings file

use std::path::PathBuf;

use crate::constants::CONFIG_PREFIX;

/// System fallback path to use if one cannot be found with XDG
const FALLBACK_BASE_PATH: &str = "/etc/tabletdriver";

/// Name of the settings file inside the config directory
const CONFIG_FILE: &str = "config.json";

/// Returns the base path for configuration data
pub fn get_base_path() -> PathBuf {
    let Ok(base_dirs) = xdg::BaseDirectories::with_prefix(CONFIG_PREFIX) else {
        log::warn!("Unable to determine config base path. Using fallback path.");
        return PathBuf::from(FALLBACK_BASE_PATH);
    };

    base_dirs.get_config_home()
}

/// Returns the path to the settings file (e.g. "~/.config/tabletdriver/config.json")
pub fn get_config_path() -> PathBuf {
    get_base_path().join(CONFIG_FILE)
}
