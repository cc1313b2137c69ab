//! `faturai.toml` loading and environment overrides

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use faturai_core::{CategoryDefinition, CategoryDictionary};
use faturai_import::ImportOptions;
use faturai_server::ServerConfig;
use serde::Deserialize;

pub const CONFIG_FILE: &str = "faturai.toml";
const DATABASE_FILE: &str = "faturai.db";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    /// Bunyan-style JSON lines
    Json,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Local store directory (defaults to the platform data dir)
    pub data_dir: Option<PathBuf>,
    /// SQLite file used by `serve` (defaults to `<data_dir>/faturai.db`)
    pub database: Option<PathBuf>,
    pub log_filter: Option<String>,
    pub log_format: LogFormat,
    pub server: ServerSection,
    pub import: ImportSection,
    /// Extra dictionary entries, merged over the built-in ones
    pub categories: Vec<CategoryDefinition>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
    pub session_ttl_hours: i64,
    pub secure_cookies: bool,
    pub allowed_origins: Vec<String>,
    pub max_upload_bytes: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        let defaults = ServerConfig::default();
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            session_ttl_hours: defaults.session_ttl_hours,
            secure_cookies: defaults.secure_cookies,
            allowed_origins: defaults.allowed_origins,
            max_upload_bytes: defaults.max_upload_bytes,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ImportSection {
    pub delimiter: Option<char>,
    pub absolute_amounts: bool,
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("br", "faturai", "FaturAi")
}

impl Config {
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Invalid configuration")?;
        if let Some(bad) = config.categories.iter().find(|c| c.name.trim().is_empty()) {
            bail!("Category '{}' in configuration has an empty name", bad.id);
        }
        Ok(config)
    }

    /// Reads `path`, or the default config file when it exists. Environment
    /// overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                Self::parse(&content)?
            }
            None => match project_dirs().map(|d| d.config_dir().join(CONFIG_FILE)) {
                Some(default) if default.exists() => {
                    let content = std::fs::read_to_string(&default)
                        .with_context(|| format!("Failed to read config {}", default.display()))?;
                    Self::parse(&content)?
                }
                _ => Config::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(dir) = var("FATURAI_DATA_DIR") {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(db) = var("FATURAI_DATABASE") {
            self.database = Some(PathBuf::from(db));
        }
        if let Some(host) = var("FATURAI_HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("FATURAI_PORT") {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("FATURAI_PORT is not a valid port: '{port}'"))?;
        }
        Ok(())
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => project_dirs()
                .map(|d| d.data_dir().to_path_buf())
                .context("Could not determine a data directory; set data_dir or FATURAI_DATA_DIR"),
        }
    }

    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database {
            Some(db) => Ok(db.clone()),
            None => Ok(self.data_dir()?.join(DATABASE_FILE)),
        }
    }

    pub fn import_options(&self) -> Result<ImportOptions> {
        let delimiter = match self.import.delimiter {
            Some(c) if c.is_ascii() => Some(c as u8),
            Some(c) => bail!("Delimiter must be an ASCII character, got '{c}'"),
            None => None,
        };
        Ok(ImportOptions {
            delimiter,
            absolute_amounts: self.import.absolute_amounts,
            source: None,
        })
    }

    pub fn server_config(&self) -> Result<ServerConfig> {
        Ok(ServerConfig {
            allowed_origins: self.server.allowed_origins.clone(),
            session_ttl_hours: self.server.session_ttl_hours,
            secure_cookies: self.server.secure_cookies,
            max_upload_bytes: self.server.max_upload_bytes,
            import: self.import_options()?,
        })
    }

    /// Built-in dictionary, then config entries, then categories saved with
    /// `faturai categories add`.
    pub fn dictionary(&self, saved: Vec<CategoryDefinition>) -> CategoryDictionary {
        CategoryDictionary::builtin()
            .merge(self.categories.iter().cloned())
            .merge(saved)
    }
}
