// src/config/config.rs
use crate::utils::error::MinerError;
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings for one mining profile
///
/// Replaced wholesale whenever the profile is edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinerConfig {
    /// Display name of the profile
    #[serde(default = "default_name")]
    pub name: String,

    /// Pool or solo server host (older files call this `server`)
    #[serde(default = "default_hostname", alias = "server")]
    pub hostname: String,

    /// Server port, kept as text the way it was entered
    #[serde(default = "default_port", deserialize_with = "port_from_json")]
    pub port: String,

    /// Worker login
    #[serde(default)]
    pub username: String,

    /// Worker password
    #[serde(default)]
    pub password: String,

    /// Index of the device to mine on (`None` means the first one)
    #[serde(default)]
    pub device: Option<usize>,

    /// Extra command-line flags forwarded to the worker
    #[serde(default)]
    pub flags: String,

    /// Start mining as soon as profiles are loaded
    #[serde(default)]
    pub autostart: bool,
}

fn default_name() -> String {
    "Default".into()
}

fn default_hostname() -> String {
    "localhost".into()
}

fn default_port() -> String {
    "8332".into()
}

/// Accepts the port either as a JSON number or a string
fn port_from_json<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u64),
        Text(String),
    }

    Ok(match Port::deserialize(deserializer)? {
        Port::Number(n) => n.to_string(),
        Port::Text(s) => s,
    })
}

impl MinerConfig {
    /// Creates a profile with default connection settings
    pub fn named(name: impl Into<String>) -> Self {
        MinerConfig {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Device index passed to the worker
    pub fn device_index(&self) -> usize {
        self.device.unwrap_or(0)
    }
}

impl Default for MinerConfig {
    fn default() -> Self {
        MinerConfig {
            name: default_name(),
            hostname: default_hostname(),
            port: default_port(),
            username: String::new(),
            password: String::new(),
            device: None,
            flags: String::new(),
            autostart: false,
        }
    }
}

/// Everything persisted in the profile file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Mining profiles in tab order
    #[serde(default)]
    pub profiles: Vec<MinerConfig>,

    /// Path to the official Bitcoin client used for solo mining
    #[serde(default)]
    pub bitcoin_executable: String,

    /// Whether the console view was open
    #[serde(default)]
    pub show_console: bool,

    /// Whether the summary view was open
    #[serde(default)]
    pub show_summary: bool,
}

impl Config {
    /// Loads configuration from a JSON file
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    /// * `Ok(Config)` - Successfully loaded configuration
    /// * `Err(MinerError)` - If file couldn't be read or parsed
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, MinerError> {
        let path = path.into();
        let config_str = fs::read_to_string(&path).map_err(|e| {
            MinerError::ConfigError(format!(
                "Failed to read config at {}: {}",
                path.display(),
                e
            ))
        })?;

        serde_json::from_str(&config_str)
            .map_err(|e| MinerError::ConfigError(format!("Invalid config format: {}", e)))
    }

    /// Loads the file if it exists, otherwise returns an empty configuration
    pub fn load_or_default(path: impl Into<PathBuf>) -> Result<Self, MinerError> {
        let path = path.into();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Writes the configuration as pretty-printed JSON
    ///
    /// Creates the parent directory if needed.
    pub fn save(&self, path: &Path) -> Result<(), MinerError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Default location of the profile file
    ///
    /// `%APPDATA%\poclbm\poclbm.ini` on Windows, `$HOME/.poclbm` elsewhere.
    pub fn default_location() -> Result<PathBuf, MinerError> {
        if cfg!(windows) {
            dirs::config_dir()
                .map(|dir| dir.join("poclbm").join("poclbm.ini"))
                .ok_or_else(|| MinerError::ConfigError("Cannot locate the AppData folder".into()))
        } else {
            dirs::home_dir()
                .map(|dir| dir.join(".poclbm"))
                .ok_or_else(|| MinerError::ConfigError("Cannot locate the home folder".into()))
        }
    }

    /// Generates a configuration template string
    ///
    /// # Returns
    /// Pretty-printed JSON with one example profile
    pub fn generate_template() -> String {
        let template = Config {
            profiles: vec![MinerConfig {
                name: "Default".into(),
                hostname: "mining.bitcoin.cz".into(),
                port: "8332".into(),
                username: "your_username.worker1".into(),
                password: "x".into(),
                device: Some(0),
                flags: String::new(),
                autostart: false,
            }],
            ..Config::default()
        };
        serde_json::to_string_pretty(&template).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_legacy_keys_and_numeric_port() {
        let json = r#"{
            "profiles": [
                {"name": "old", "server": "deepbit.net", "port": 8332,
                 "username": "u", "password": "p", "device": null}
            ],
            "show_summary": true
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        let profile = &config.profiles[0];
        assert_eq!(profile.hostname, "deepbit.net");
        assert_eq!(profile.port, "8332");
        assert_eq!(profile.device, None);
        assert_eq!(profile.flags, "");
        assert!(!profile.autostart);
        assert!(config.show_summary);
        assert!(!config.show_console);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config: Config = serde_json::from_str(r#"{"profiles": [{}]}"#).unwrap();
        assert_eq!(config.profiles[0], MinerConfig::default());
        assert_eq!(config.bitcoin_executable, "");
    }

    #[test]
    fn save_then_load_keeps_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(".poclbm");
        let mut config = Config::default();
        config.profiles.push(MinerConfig {
            flags: "-v -w128".into(),
            autostart: true,
            device: Some(2),
            ..MinerConfig::named("rig")
        });
        config.bitcoin_executable = "/usr/bin/bitcoind".into();

        config.save(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn missing_file_loads_as_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(dir.path().join("absent")).unwrap();
        assert!(config.profiles.is_empty());
        assert!(Config::load(dir.path().join("absent")).is_err());
    }

    #[test]
    fn template_parses_back() {
        let config: Config = serde_json::from_str(&Config::generate_template()).unwrap();
        assert_eq!(config.profiles.len(), 1);
    }
}
