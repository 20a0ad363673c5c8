use super::types::*;
use crate::error_handling::types::ConfigError;
use clap::Parser;
use log::debug;
use serde::Deserialize;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

/// Command-line surface of the binary.
///
/// Only the configuration file is mandatory, the remaining flags override the
/// matching file values. Router credentials may also come from the
/// environment so they do not have to live in the file.
#[derive(Parser, Debug, Clone)]
#[command(name = "flowlens")]
#[command(version)]
#[command(about = "Live bidirectional session view over NAT flow exports")]
pub struct CliArgs {
    /// Path to the TOML configuration file
    pub config_file: PathBuf,

    /// UDP port receiving flow exports
    #[arg(long)]
    pub collector_port: Option<u16>,

    /// TCP port of the web interface
    #[arg(long)]
    pub web_port: Option<u16>,

    /// Base URL of the router REST API
    #[arg(long, env = "FLOWLENS_ROUTER_URL")]
    pub router_url: Option<String>,

    #[arg(long, env = "FLOWLENS_ROUTER_USERNAME")]
    pub router_username: Option<String>,

    #[arg(long, env = "FLOWLENS_ROUTER_PASSWORD", hide_env_values = true)]
    pub router_password: Option<String>,
}

/// Application configuration.
///
/// Every section falls back to its defaults when omitted, except
/// `router.base_url` which has no sensible default and is checked by
/// [`Config::validate`].
///
/// ```toml
/// [router]
/// base_url = "http://192.168.111.1:80"
/// username = "admin"
/// password = "secret"
/// ```
#[derive(Debug, PartialEq, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub collector: CollectorConfig,
    pub web: WebConfig,
    pub router: RouterConfig,
    pub window: WindowConfig,
}

impl Config {
    /// Reads the file named on the command line, applies the overrides and validates.
    pub fn load(args: &CliArgs) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(&args.config_file)?;
        config.apply_args(args);
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!("Reading configuration from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::TomlError(e.to_string()))
    }

    pub fn apply_args(&mut self, args: &CliArgs) {
        if let Some(port) = args.collector_port {
            self.collector.port = port;
        }
        if let Some(port) = args.web_port {
            self.web.port = port;
        }
        if let Some(ref url) = args.router_url {
            self.router.base_url = url.clone();
        }
        if let Some(ref username) = args.router_username {
            self.router.username = username.clone();
        }
        if let Some(ref password) = args.router_password {
            self.router.password = password.clone();
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.router.base_url.is_empty() {
            return Err(ConfigError::MissingField(String::from("router.base_url")));
        }
        if !(self.router.base_url.starts_with("http://")
            || self.router.base_url.starts_with("https://"))
        {
            return Err(ConfigError::BadUrl(format!(
                "{} is not an http(s) URL",
                self.router.base_url
            )));
        }
        if self.router.poll_interval_ms == 0 {
            return Err(ConfigError::NotInRange(String::from(
                "router.poll_interval_ms must be greater than 0",
            )));
        }
        if self.window.max_sessions == 0
            || self.window.max_connections == 0
            || self.window.max_flows == 0
            || self.window.observer_buffer == 0
        {
            return Err(ConfigError::NotInRange(String::from(
                "window sizes must be greater than 0",
            )));
        }
        if self.collector.channel_capacity == 0 {
            return Err(ConfigError::NotInRange(String::from(
                "collector.channel_capacity must be greater than 0",
            )));
        }

        let collector_ip = parse_bind_address(&self.collector.bind_address)?;
        if self.web.enabled {
            let web_ip = parse_bind_address(&self.web.bind_address)?;
            if self.web.port == self.collector.port && web_ip == collector_ip {
                return Err(ConfigError::PortConflict(self.web.port));
            }
        }

        Ok(())
    }
}

fn parse_bind_address(address: &str) -> Result<IpAddr, ConfigError> {
    address
        .parse::<IpAddr>()
        .map_err(|e| ConfigError::BadAddress(format!("{}: {}", address, e)))
}
