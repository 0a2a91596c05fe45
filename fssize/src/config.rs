//! Module configuration loading and parsing
//!
//! The module reads an optional `fssize.conf` (TOML) from the host's
//! `LoadModulePath`, or from `$FSSIZE_CONFIG` when set. A missing file means
//! defaults; a file that exists but cannot be read or parsed fails `init`.

use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;

use crate::fssize::{DEFAULT_PRECISION, MAX_PRECISION};
use crate::host;

pub const CONFIG_FILE_NAME: &str = "fssize.conf";
pub const CONFIG_ENV: &str = "FSSIZE_CONFIG";

static CURRENT: OnceLock<ModuleConfig> = OnceLock::new();
static DEFAULTS: OnceLock<ModuleConfig> = OnceLock::new();

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config from {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ModuleConfig {
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Append to this file instead of stderr.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    #[serde(default = "default_precision")]
    pub precision: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            precision: default_precision(),
        }
    }
}

impl ReportConfig {
    pub fn effective_precision(&self) -> usize {
        self.precision.min(MAX_PRECISION)
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_precision() -> usize {
    DEFAULT_PRECISION
}

/// Where the config file is expected, if anywhere.
pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }
    host::load_module_path().map(|dir| dir.join(CONFIG_FILE_NAME))
}

/// Parse configuration from a TOML string.
pub fn parse(content: &str, path: &Path) -> Result<ModuleConfig, ConfigError> {
    toml::from_str(content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load configuration from `path`; `Ok(None)` when the file does not exist.
pub fn load_from(path: &Path) -> Result<Option<ModuleConfig>, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    parse(&content, path).map(Some)
}

/// Resolve and load the module configuration, falling back to defaults.
///
/// Returns the config together with the file it came from, for logging.
pub fn load() -> Result<(ModuleConfig, Option<PathBuf>), ConfigError> {
    let Some(path) = config_path() else {
        return Ok((ModuleConfig::default(), None));
    };
    match load_from(&path)? {
        Some(config) => Ok((config, Some(path))),
        None => Ok((ModuleConfig::default(), None)),
    }
}

/// Make `config` the process-wide configuration. The first install wins.
pub fn install(config: ModuleConfig) -> &'static ModuleConfig {
    CURRENT.get_or_init(|| config)
}

/// The installed configuration, or defaults before `init` ran.
pub fn current() -> &'static ModuleConfig {
    CURRENT
        .get()
        .unwrap_or_else(|| DEFAULTS.get_or_init(ModuleConfig::default))
}
