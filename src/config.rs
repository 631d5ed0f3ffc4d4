//! Server configuration (spec §10): a TOML file loaded at startup and
//! turned into a [`crate::share::StaticShareRegistry`] and
//! [`crate::identity::StaticIdentityStore`].

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::identity::StaticIdentityStore;
use crate::share::{Share, SharePermission, StaticShareRegistry};

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
    #[serde(default = "default_rtmax")]
    pub rtmax: u32,
    #[serde(default = "default_wtmax")]
    pub wtmax: u32,
    #[serde(default = "default_dtpref")]
    pub dtpref: u32,
    #[serde(default)]
    pub shares: HashMap<String, Share>,
    #[serde(default)]
    pub identities: HashMap<String, HashMap<u32, SharePermission>>,
}

fn default_rtmax() -> u32 {
    1 << 20
}

fn default_wtmax() -> u32 {
    1 << 20
}

fn default_dtpref() -> u32 {
    1 << 16
}

#[derive(Debug)]
pub enum ConfigError {
    Read(std::io::Error),
    Parse(toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Read(e) => write!(f, "could not read config file: {e}"),
            ConfigError::Parse(e) => write!(f, "could not parse config file: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl ServerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(ConfigError::Read)?;
        toml::from_str(&raw).map_err(ConfigError::Parse)
    }

    pub fn share_registry(&self) -> StaticShareRegistry {
        StaticShareRegistry::new(self.shares.clone())
    }

    pub fn identity_store(&self) -> StaticIdentityStore {
        StaticIdentityStore::new(self.identities.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_config() {
        let toml = r#"
            bind_addr = "0.0.0.0:2049"

            [shares.export]
            path = "/export"
            read_only = false
            default_permission = "read_write"
            identity_mapping = { kind = "none" }
        "#;
        let config: ServerConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:2049");
        assert_eq!(config.rtmax, default_rtmax());
        assert_eq!(config.shares.len(), 1);
    }
}
