pub mod path;


use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::input::event::EventKind;

/// Represents all possible errors loading a configuration document
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Could not read: {0}")]
    IoError(#[from] io::Error),
    #[error("Unable to deserialize: {0}")]
    DeserializeError(#[from] serde_json::Error),
}

/// Event type number (as a string) to the list of codes to emit for it
pub type EventCodes = BTreeMap<String, Vec<u16>>;

/// The `mapping` section of a device configuration. All keys are stringified
/// integers so the document can be exchanged as JSON.
///
/// ```json
/// {
///   "buttons": { "<buttonIndex>": { "<eventType>": [<code>, ...] } },
///   "dials":   { "<dialId>": { "<step>": { "<eventType>": [<code>, ...] } } }
/// }
/// ```
#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct MappingConfig {
    #[serde(default)]
    pub buttons: BTreeMap<String, EventCodes>,
    #[serde(default)]
    pub dials: BTreeMap<String, BTreeMap<String, EventCodes>>,
}

impl MappingConfig {
    /// Map the given pad button index to the given codes
    pub fn add_button(&mut self, button: usize, kind: EventKind, codes: &[u16]) {
        self.buttons
            .entry(button.to_string())
            .or_default()
            .insert(u16::from(kind).to_string(), codes.to_vec());
    }

    /// Map one detent of the given dial in the given direction to the given codes
    pub fn add_dial(&mut self, dial: u16, step: i32, kind: EventKind, codes: &[u16]) {
        self.dials
            .entry(dial.to_string())
            .or_default()
            .entry(step.to_string())
            .or_default()
            .insert(u16::from(kind).to_string(), codes.to_vec());
    }
}

/// Configuration document for a single tablet model. Fields other than
/// `mapping` are not interpreted but are preserved so that the document
/// echoed back to the configuration store is complete.
#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq)]
pub struct DeviceConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping: Option<MappingConfig>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl DeviceConfig {
    /// Load a [DeviceConfig] from the given JSON string
    pub fn from_json(content: &str) -> Result<DeviceConfig, LoadError> {
        let config = serde_json::from_str(content)?;
        Ok(config)
    }

    /// Load a [DeviceConfig] from an already parsed JSON document
    pub fn from_value(value: serde_json::Value) -> Result<DeviceConfig, LoadError> {
        let config = serde_json::from_value(value)?;
        Ok(config)
    }

    /// Returns the configuration as a JSON document
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Settings file of the daemon. Holds the effective configuration of every
/// tablet model that has been seen, keyed by its hex product id.
///
/// Device entries are kept as raw JSON documents so that one malformed entry
/// only affects its own model. Each entry is validated by the driver it is
/// applied to.
#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct DaemonConfig {
    #[serde(default)]
    pub devices: BTreeMap<String, serde_json::Value>,
    /// Path this configuration was loaded from
    #[serde(skip)]
    pub path: Option<PathBuf>,
}

impl DaemonConfig {
    /// Load the [DaemonConfig] from the given JSON file. A missing file is
    /// not an error and results in an empty configuration.
    pub fn from_json_file(path: &Path) -> Result<DaemonConfig, LoadError> {
        let mut config = match fs::File::open(path) {
            Ok(file) => serde_json::from_reader(io::BufReader::new(file))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("No config found at {path:?}. Using defaults.");
                DaemonConfig::default()
            }
            Err(e) => return Err(e.into()),
        };
        config.path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Load the [DaemonConfig] from the given JSON file, falling back to an
    /// empty configuration if it cannot be loaded. An unreadable file is moved
    /// aside to [backup_path] before the path is reused; if that fails the
    /// returned configuration has no backing file and is never saved.
    pub fn load_or_backup(path: &Path) -> DaemonConfig {
        let e = match DaemonConfig::from_json_file(path) {
            Ok(config) => return config,
            Err(e) => e,
        };

        let backup = backup_path(path);
        log::warn!("Unable to load configuration from {path:?}, using defaults: {e}");
        let path = match fs::rename(path, &backup) {
            Ok(_) => {
                log::warn!("Moved unreadable configuration to {backup:?}");
                Some(path.to_path_buf())
            }
            Err(e) => {
                log::error!("Unable to back up {path:?}, configuration will not be saved: {e}");
                None
            }
        };

        DaemonConfig {
            path,
            ..Default::default()
        }
    }

    /// Write the configuration back to the path it was loaded from
    pub fn save(&self) -> io::Result<()> {
        let Some(path) = self.path.as_ref() else {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                "configuration has no backing file",
            ));
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
    }

    /// Returns the stored configuration document for the given product id
    pub fn device(&self, product_id: u16) -> Option<&serde_json::Value> {
        self.devices.get(&product_key(product_id))
    }

    /// Store the effective configuration document for the given product id
    pub fn set_device(&mut self, product_id: u16, config: serde_json::Value) {
        self.devices.insert(product_key(product_id), config);
    }
}

/// Returns where an unreadable settings file is moved to (e.g.
/// "config.json.bak")
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

/// Returns the key used to store a product's configuration (e.g. "092b")
pub fn product_key(product_id: u16) -> String {
    format!("{product_id:04x}")
}
