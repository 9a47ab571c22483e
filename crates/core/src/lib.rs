//! Weather Gateway Core Library
//!
//! Shared pieces of the gateway binaries:
//! - Configuration file discovery (XDG-compliant) and TOML loading
//! - Application-wide defaults

mod config;

pub use config::{find_config_file, load_config, ConfigSource};

/// Application name used for XDG and /etc paths
pub const APP_NAME: &str = "weather-gateway";

/// Default gateway port
pub const DEFAULT_GATEWAY_PORT: u16 = 9810;

/// Default prefix every API route is mounted under
pub const DEFAULT_ROUTE_PREFIX: &str = "/api";
