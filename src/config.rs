//! Service configuration loaded from TOML.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub import: ImportConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Directory every backing file resolves under.
    #[serde(default = "default_document_root")]
    pub document_root: String,

    /// Defaults to `<document_root>/metadata.db`.
    #[serde(default)]
    pub database_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Upper bound for producing a response head; 0 disables it.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportConfig {
    /// File extension (without dot) picked up from the document root.
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Author recorded for files without a manifest entry.
    #[serde(default = "default_author")]
    pub default_author: String,

    /// Optional TOML file of per-file metadata.
    #[serde(default)]
    pub manifest: Option<String>,
}

fn default_document_root() -> String {
    "novels".into()
}

fn default_host() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    5000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_extension() -> String {
    "txt".into()
}

fn default_author() -> String {
    "Unknown".into()
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            document_root: default_document_root(),
            database_path: None,
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            extension: default_extension(),
            default_author: default_author(),
            manifest: None,
        }
    }
}

impl Config {
    /// Load from `path`, or from the per-user config file when it exists,
    /// or fall back to defaults. Environment overrides apply last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// `<config dir>/textshelf/config.toml`, where the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "textshelf").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Apply `PORT` and `TEXTSHELF_DOCUMENT_ROOT`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(port) = lookup("PORT") {
            self.gateway.port = port
                .trim()
                .parse()
                .with_context(|| format!("PORT must be a port number, got `{port}`"))?;
        }
        if let Some(root) = lookup("TEXTSHELF_DOCUMENT_ROOT") {
            self.catalog.document_root = root;
        }
        Ok(())
    }

    pub fn document_root(&self) -> PathBuf {
        expand(&self.catalog.document_root)
    }

    pub fn database_path(&self) -> PathBuf {
        match &self.catalog.database_path {
            Some(path) => expand(path),
            None => self.document_root().join("metadata.db"),
        }
    }

    pub fn manifest_path(&self) -> Option<PathBuf> {
        self.import.manifest.as_deref().map(expand)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.gateway.host, self.gateway.port)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.gateway.request_timeout_secs > 0)
            .then(|| Duration::from_secs(self.gateway.request_timeout_secs))
    }
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).to_string())
}
