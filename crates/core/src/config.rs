//! Configuration management
//!
//! Configuration lives in `config.toml` under the rft config directory
//! (`$RFT_CONFIG_DIR`, else `~/.config/rft`). It holds upload pipeline
//! options and named host profiles.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::entry::Permission;
use crate::error::{Error, Result};

/// Environment variable overriding the configuration directory
pub const CONFIG_DIR_ENV: &str = "RFT_CONFIG_DIR";

/// Prefix of environment variables holding host secrets
pub const SECRET_ENV_PREFIX: &str = "RFT_SECRET_";

const CONFIG_FILE: &str = "config.toml";

/// Remote protocol of a host profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    S3,
    Swift,
    Dav,
    Ftp,
    Sftp,
}

impl Protocol {
    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::S3 => "s3",
            Protocol::Swift => "swift",
            Protocol::Dav => "dav",
            Protocol::Ftp => "ftp",
            Protocol::Sftp => "sftp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "s3" => Ok(Protocol::S3),
            "swift" => Ok(Protocol::Swift),
            "dav" | "webdav" => Ok(Protocol::Dav),
            "ftp" => Ok(Protocol::Ftp),
            "sftp" => Ok(Protocol::Sftp),
            other => Err(Error::Config(format!("Unknown protocol: {other}"))),
        }
    }
}

/// Options of the upload filter pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadOptions {
    /// Upload under a provisional name and rename once complete
    pub temporary: bool,
    /// Provisional name template with `{name}` and `{uuid}` placeholders
    pub temporary_format: String,
    /// Restore POSIX permissions after upload
    pub permissions: bool,
    /// Restore the ACL derived from the permissions after upload
    pub acl: bool,
    /// Restore the modification time after upload
    pub timestamp: bool,
    /// Use the default permissions instead of the local mode
    pub use_default_permissions: bool,
    pub default_file_permission: String,
    pub default_directory_permission: String,
    /// Units prepared concurrently
    pub parallel: usize,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            temporary: false,
            temporary_format: "{name}-{uuid}".to_string(),
            permissions: false,
            acl: false,
            timestamp: false,
            use_default_permissions: false,
            default_file_permission: "644".to_string(),
            default_directory_permission: "755".to_string(),
            parallel: 4,
        }
    }
}

impl UploadOptions {
    pub fn default_file_permission(&self) -> Result<Permission> {
        Permission::from_octal(&self.default_file_permission)
            .map_err(|e| Error::Config(format!("default_file_permission: {e}")))
    }

    pub fn default_directory_permission(&self) -> Result<Permission> {
        Permission::from_octal(&self.default_directory_permission)
            .map_err(|e| Error::Config(format!("default_directory_permission: {e}")))
    }

    /// Reject option combinations the pipeline cannot honor
    pub fn validate(&self) -> Result<()> {
        if self.temporary && !self.temporary_format.contains("{uuid}") {
            return Err(Error::Config(
                "temporary_format must contain {uuid}".to_string(),
            ));
        }
        if self.parallel == 0 {
            return Err(Error::Config("parallel must be at least 1".to_string()));
        }
        self.default_file_permission()?;
        self.default_directory_permission()?;
        Ok(())
    }
}

fn default_encoding() -> String {
    "UTF-8".to_string()
}

/// Connection details of a named host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostProfile {
    pub protocol: Protocol,
    /// Endpoint URL (auth URL for Swift)
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    /// Character set of FTP listings
    #[serde(default = "default_encoding")]
    pub encoding: String,
}

impl HostProfile {
    pub fn new(protocol: Protocol, endpoint: impl Into<String>) -> Self {
        Self {
            protocol,
            endpoint: endpoint.into(),
            region: None,
            username: None,
            secret: None,
            encoding: default_encoding(),
        }
    }

    /// Secret from the profile, else from `RFT_SECRET_<NAME>`
    pub fn resolve_secret(&self, name: &str) -> Option<String> {
        self.secret.clone().or_else(|| std::env::var(secret_env(name)).ok())
    }
}

/// Environment variable holding the secret of host `name`
pub fn secret_env(name: &str) -> String {
    let suffix: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{SECRET_ENV_PREFIX}{suffix}")
}

/// Root of `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub upload: UploadOptions,
    pub hosts: BTreeMap<String, HostProfile>,
}

impl Config {
    pub fn host(&self, name: &str) -> Result<&HostProfile> {
        self.hosts
            .get(name)
            .ok_or_else(|| Error::Config(format!("Unknown host: {name}")))
    }
}

/// Loads and saves the configuration file
#[derive(Debug, Clone)]
pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    /// Manager for the default location
    pub fn new() -> Result<Self> {
        let dir = match std::env::var_os(CONFIG_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::config_dir()
                .ok_or_else(|| Error::Config("Cannot determine config directory".to_string()))?
                .join("rft"),
        };
        Ok(Self::with_path(dir.join(CONFIG_FILE)))
    }

    /// Manager for an explicit file path
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the configuration; a missing file yields the defaults
    pub fn load(&self) -> Result<Config> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "No config file, using defaults");
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(&self.path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", self.path.display())))?;
        config.upload.validate()?;
        Ok(config)
    }

    pub fn save(&self, config: &Config) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(config).map_err(|e| Error::Config(e.to_string()))?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}
