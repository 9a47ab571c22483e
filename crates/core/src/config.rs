//! Configuration file discovery
//!
//! Values are resolved in priority order:
//! 1. CLI arguments
//! 2. Environment variables
//! 3. Config file (searched in standard locations)
//! 4. Built-in defaults

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use log::debug;
use serde::de::DeserializeOwned;

use crate::APP_NAME;

/// Where a configuration file was found
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// Path given on the command line or through the env var
    Explicit(PathBuf),
    /// Found in the current working directory
    CurrentDir(PathBuf),
    /// Found under $XDG_CONFIG_HOME/weather-gateway/
    XdgConfig(PathBuf),
    /// Found under /etc/weather-gateway/
    System(PathBuf),
    /// Nothing found, built-in defaults apply
    Defaults,
}

impl ConfigSource {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigSource::Explicit(p)
            | ConfigSource::CurrentDir(p)
            | ConfigSource::XdgConfig(p)
            | ConfigSource::System(p) => Some(p),
            ConfigSource::Defaults => None,
        }
    }
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.path() {
            Some(p) => write!(f, "{}", p.display()),
            None => write!(f, "(defaults)"),
        }
    }
}

/// Find a configuration file in the standard locations
///
/// Search order:
/// 1. `env_var` (e.g. WEATHER_GATEWAY_CONFIG), when it points at an existing file
/// 2. `filename` in the current directory
/// 3. `$XDG_CONFIG_HOME/weather-gateway/filename` (or `~/.config/...`)
/// 4. `/etc/weather-gateway/filename`
pub fn find_config_file(env_var: &str, filename: &str) -> ConfigSource {
    if let Ok(path) = env::var(env_var) {
        let p = PathBuf::from(&path);
        if p.is_file() {
            return ConfigSource::Explicit(p);
        }
        debug!("{} points at {}, which does not exist", env_var, path);
    }

    let local = PathBuf::from(filename);
    if local.is_file() {
        return ConfigSource::CurrentDir(local);
    }

    if let Some(xdg_path) = xdg_config_path(filename) {
        if xdg_path.is_file() {
            return ConfigSource::XdgConfig(xdg_path);
        }
    }

    let system = PathBuf::from("/etc").join(APP_NAME).join(filename);
    if system.is_file() {
        return ConfigSource::System(system);
    }

    ConfigSource::Defaults
}

fn xdg_config_path(filename: &str) -> Option<PathBuf> {
    if let Ok(xdg_config) = env::var("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config).join(APP_NAME).join(filename));
    }
    env::var("HOME").ok().map(|home| {
        PathBuf::from(home)
            .join(".config")
            .join(APP_NAME)
            .join(filename)
    })
}

/// Load and parse a TOML configuration file
///
/// Returns `T::default()` when the source is [`ConfigSource::Defaults`].
pub fn load_config<T: DeserializeOwned + Default>(source: &ConfigSource) -> anyhow::Result<T> {
    let Some(path) = source.path() else {
        return Ok(T::default());
    };
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}
