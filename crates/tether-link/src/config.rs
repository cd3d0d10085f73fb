// ABOUTME: Configuration loading for tether-link
// ABOUTME: Reads the printer's TOML config and persists auth tokens without touching other keys

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::error::{LinkError, Result};

/// Printer-side link configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub device: DeviceConfig,
}

/// Cloud server the device links against.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL (e.g., "https://app.example.com")
    #[serde(default)]
    pub endpoint: String,

    /// Account token; present once the device is linked
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("endpoint", &self.endpoint)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Identity the device presents to the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device name (defaults to hostname)
    #[serde(default)]
    pub name: Option<String>,
}

impl LinkConfig {
    /// Whether a usable account token is present. Blank tokens do not count.
    pub fn has_token(&self) -> bool {
        self.server
            .auth_token
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty())
    }

    /// Server base URL without a trailing slash.
    pub fn endpoint(&self) -> Result<&str> {
        let url = self.server.endpoint.trim().trim_end_matches('/');
        if url.is_empty() {
            return Err(LinkError::MissingEndpoint);
        }
        Ok(url)
    }

    /// Configured device name, falling back to the hostname.
    pub fn device_name(&self) -> String {
        self.device
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| {
                hostname::get()
                    .map(|h| h.to_string_lossy().to_string())
                    .unwrap_or_else(|_| "unknown".to_string())
            })
    }
}

/// Point-in-time view of whether the device is linked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigSnapshot {
    pub has_token: bool,
}

impl From<&LinkConfig> for ConfigSnapshot {
    fn from(config: &LinkConfig) -> Self {
        Self {
            has_token: config.has_token(),
        }
    }
}

/// Read side of the persisted configuration.
///
/// `reload` must observe writes made by other components (discovery, the
/// verification client) since the previous call.
pub trait ConfigStore: Send + Sync {
    fn reload(&self) -> Result<ConfigSnapshot>;
}

/// Config store backed by a TOML file on disk.
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the configuration from disk.
    pub fn load(&self) -> Result<LinkConfig> {
        let content = self.read()?;
        toml::from_str(&content).map_err(|source| LinkError::ParseConfig {
            path: self.path.clone(),
            source,
        })
    }

    /// Stores `token` as `server.auth_token`, keeping every other key in the file.
    pub fn save_auth_token(&self, token: &str) -> Result<()> {
        let content = self.read()?;
        let mut table: toml::Table =
            toml::from_str(&content).map_err(|source| LinkError::ParseConfig {
                path: self.path.clone(),
                source,
            })?;

        let server = table
            .entry("server")
            .or_insert(toml::Value::Table(toml::Table::new()));
        if !server.is_table() {
            *server = toml::Value::Table(toml::Table::new());
        }
        if let toml::Value::Table(server) = server {
            server.insert(
                "auth_token".to_string(),
                toml::Value::String(token.to_string()),
            );
        }

        let content = toml::to_string_pretty(&table).map_err(LinkError::SerializeConfig)?;
        self.replace(&content)
            .map_err(|source| LinkError::WriteConfig {
                path: self.path.clone(),
                source,
            })?;

        tracing::debug!(path = %self.path.display(), "auth token saved");
        Ok(())
    }

    /// Swaps in `content` through a temp file in the same directory, so the
    /// config on disk is always either the old or the new version.
    fn replace(&self, content: &str) -> io::Result<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    fn read(&self) -> Result<String> {
        fs::read_to_string(&self.path).map_err(|source| LinkError::ReadConfig {
            path: self.path.clone(),
            source,
        })
    }
}

impl ConfigStore for FileConfigStore {
    fn reload(&self) -> Result<ConfigSnapshot> {
        let config = self.load()?;
        Ok(ConfigSnapshot::from(&config))
    }
}
