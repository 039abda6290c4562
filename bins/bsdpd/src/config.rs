use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::fs;

use bsdp::BootProtocol;
use serde::Deserialize;
use thiserror::Error;

use crate::constants::DEFAULT_CONFIG_FILE_PATH;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Error while reading TOML config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Error while deserializing TOML: {0}")]
    Deserialize(#[from] toml::de::Error),
}

/// The config file as written by the operator. Everything is optional;
/// the defaults reproduce a plain NFS-less NetBoot setup on eth0.
#[derive(Debug, Default, Deserialize)]
pub struct RawConfig {
    pub catalog_root: Option<PathBuf>,
    pub boot_protocol: Option<BootProtocol>,
    pub interface: Option<String>,
    pub external_ip: Option<Ipv4Addr>,
    pub dmg_host_url: Option<String>,
    pub tftp_root: Option<PathBuf>,
    pub priority: Option<[u8; 2]>,
    pub api: Option<RawApiOptions>,
}

/// Presence of this section switches the catalog to API mode and disables
/// filesystem scanning.
#[derive(Debug, Deserialize)]
pub struct RawApiOptions {
    pub url: String,
    pub key: Option<String>,
}

#[derive(Debug)]
pub struct Config {
    pub catalog_root: PathBuf,
    pub boot_protocol: BootProtocol,
    pub interface: String,
    pub external_ip: Option<Ipv4Addr>,
    pub dmg_host_url: Option<String>,
    pub tftp_root: Option<PathBuf>,
    pub priority: Option<[u8; 2]>,
    pub api_url: Option<String>,
    pub api_key: Option<String>,
}

impl From<RawConfig> for Config {
    fn from(raw: RawConfig) -> Self {
        let (api_url, api_key) = match raw.api {
            Some(api) => (Some(api.url), api.key),
            None => (None, None),
        };

        Self {
            catalog_root: raw.catalog_root.unwrap_or_else(|| PathBuf::from("/nbi")),
            boot_protocol: raw.boot_protocol.unwrap_or(BootProtocol::Http),
            interface: raw.interface.unwrap_or_else(|| "eth0".to_string()),
            external_ip: raw.external_ip,
            dmg_host_url: raw.dmg_host_url,
            tftp_root: raw.tftp_root,
            priority: raw.priority,
            api_url,
            api_key,
        }
    }
}

impl Config {
    /// Load the configuration. An explicitly given path must exist; the
    /// default path is used only when present, and built-in defaults apply
    /// otherwise.
    pub fn load(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let raw = match path {
            Some(path) => Self::read_file(&path)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE_PATH);
                if default.exists() {
                    Self::read_file(default)?
                } else {
                    RawConfig::default()
                }
            }
        };

        Ok(raw.into())
    }

    fn read_file(path: &Path) -> Result<RawConfig, ConfigError> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_document() {
        let doc = r#"
            catalog_root = "/srv/nbi"
            boot_protocol = "nfs"
            interface = "en0"
            external_ip = "198.51.100.4"
            dmg_host_url = "http://files.example.com/nbi"
            tftp_root = "/srv/tftp"
            priority = [1, 2]

            [api]
            url = "https://api.example.com/v1/images"
            key = "1234DEADBEEF5678"
        "#;

        let raw: RawConfig = toml::from_str(doc).unwrap();
        let config = Config::from(raw);

        assert_eq!(config.catalog_root, PathBuf::from("/srv/nbi"));
        assert_eq!(config.boot_protocol, BootProtocol::Nfs);
        assert_eq!(config.interface, "en0");
        assert_eq!(config.external_ip, Some(Ipv4Addr::new(198, 51, 100, 4)));
        assert_eq!(config.priority, Some([1, 2]));
        assert_eq!(
            config.api_url.as_deref(),
            Some("https://api.example.com/v1/images")
        );
        assert_eq!(config.api_key.as_deref(), Some("1234DEADBEEF5678"));
    }

    #[test]
    fn empty_document_uses_defaults() {
        let raw: RawConfig = toml::from_str("").unwrap();
        let config = Config::from(raw);

        assert_eq!(config.catalog_root, PathBuf::from("/nbi"));
        assert_eq!(config.boot_protocol, BootProtocol::Http);
        assert_eq!(config.interface, "eth0");
        assert_eq!(config.api_url, None);
    }
}
