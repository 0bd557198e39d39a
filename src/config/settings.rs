//! Application settings and paths.
//!
//! Manages XDG-compliant paths for configuration and data.

use crate::error::{ConfigError, ConfigResult};
use crate::types::DEFAULT_PORT_SPEC;
use directories::ProjectDirs;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Application directory paths following XDG Base Directory Specification.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Configuration directory (~/.config/httpsweep)
    pub config_dir: PathBuf,
    /// Data directory (~/.local/share/httpsweep)
    pub data_dir: PathBuf,
}

impl Paths {
    /// Resolve the platform directories. Nothing is created on disk.
    pub fn resolve() -> ConfigResult<Self> {
        let project = ProjectDirs::from("com", "httpsweep", "httpsweep")
            .ok_or(ConfigError::DirectoryNotFound)?;

        Ok(Self {
            config_dir: project.config_dir().to_path_buf(),
            data_dir: project.data_dir().to_path_buf(),
        })
    }

    /// Get the path to the settings file.
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }

    /// Get the path to the default result database.
    pub fn database_file(&self) -> PathBuf {
        self.data_dir.join("httpsweep.db")
    }
}

/// Application-wide settings. Command line flags take precedence.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Default number of probe workers.
    pub default_threads: usize,
    /// Default request timeout in seconds.
    pub default_timeout_secs: f64,
    /// Ports probed when none are given.
    pub default_ports: String,
    /// `User-Agent` sent with every probe; the built-in one when unset.
    pub user_agent: Option<String>,
    /// Accept self-signed and otherwise invalid certificates.
    pub accept_invalid_certs: bool,
    /// Probes served by a worker before its HTTP client is rebuilt.
    pub recycle_after: usize,
    /// Requests per second across all workers, 0 for unlimited.
    pub rate_limit: u32,
    /// Result database location; the XDG data directory when unset.
    pub database: Option<PathBuf>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            default_threads: 5,
            default_timeout_secs: 5.0,
            default_ports: DEFAULT_PORT_SPEC.to_string(),
            user_agent: None,
            accept_invalid_certs: true,
            recycle_after: 1,
            rate_limit: 0,
            database: None,
        }
    }
}

impl AppSettings {
    /// Load settings from the default location, falling back to defaults
    /// when the file does not exist.
    pub fn load(paths: &Paths) -> ConfigResult<Self> {
        let file = paths.settings_file();
        if !file.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&file)
    }

    /// Load settings from a specific file.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let settings: Self =
            serde_json::from_str(&content).map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.default_threads == 0 {
            return Err(ConfigError::InvalidFormat(
                "default_threads must be at least 1".into(),
            ));
        }
        if !(self.default_timeout_secs.is_finite() && self.default_timeout_secs > 0.0) {
            return Err(ConfigError::InvalidFormat(
                "default_timeout_secs must be a positive number".into(),
            ));
        }
        Ok(())
    }

    /// Database path: explicit override, then settings, then the data dir.
    pub fn database_path(&self, paths: &Paths, flag: Option<&Path>) -> PathBuf {
        flag.map(Path::to_path_buf)
            .or_else(|| self.database.clone())
            .unwrap_or_else(|| paths.database_file())
    }
}
