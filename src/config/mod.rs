// src/config/mod.rs
//! Configuration management for the miner supervisor
//!
//! This module handles all configuration-related functionality including:
//! - Loading and saving the JSON profile file
//! - Generating configuration templates
//! - Locating the default profile file
//!
//! The core only consumes [`MinerConfig`] values; file I/O stays here.

/// Core configuration implementation
///
/// Contains the [`Config`] and [`MinerConfig`] structs that define
/// the persisted profile format.
pub mod config;

// Re-export key items for easy access
pub use config::{Config, MinerConfig};

use crate::utils::error::MinerError;
use std::path::PathBuf;

/// Loads the profile file
///
/// # Arguments
/// * `path` - Path to the configuration file, or `None` for the default location
///
/// # Returns
/// * `Ok(Config)` - Loaded configuration; empty if no file exists yet
/// * `Err(MinerError)` - If the file couldn't be read or parsed
pub fn load(path: Option<PathBuf>) -> Result<Config, MinerError> {
    let path = match path {
        Some(path) => path,
        None => Config::default_location()?,
    };
    Config::load_or_default(path)
}

/// Generates a configuration template
pub fn generate_template() -> String {
    Config::generate_template()
}
