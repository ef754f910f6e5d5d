use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Configuration from `config.toml` in the data directory
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub flags: FlagConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlagConfig {
    /// Read flag overrides from `flags.toml` next to the data files
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Minimum seconds between flag refreshes
    #[serde(default = "default_min_fetch_secs")]
    pub min_fetch_interval_secs: u64,
}

impl Default for FlagConfig {
    fn default() -> Self {
        FlagConfig {
            enabled: true,
            min_fetch_interval_secs: default_min_fetch_secs(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_min_fetch_secs() -> u64 {
    3600
}

/// Error type for config loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Resolve the data directory: explicit override, then `LISTO_DATA_DIR`,
/// then `$XDG_DATA_HOME/listo`, then `~/.local/share/listo`.
pub fn resolve_data_dir(override_dir: Option<&str>) -> PathBuf {
    if let Some(dir) = override_dir {
        return PathBuf::from(dir);
    }
    if let Ok(dir) = std::env::var("LISTO_DATA_DIR") {
        return PathBuf::from(dir);
    }
    let data_home = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_home().join(".local").join("share"));
    data_home.join("listo")
}

fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/"))
}

/// Load `config.toml` from the data directory. A missing file yields the
/// default config; an unreadable or malformed file is an error.
pub fn load_config(data_dir: &Path) -> Result<AppConfig, ConfigError> {
    let path = data_dir.join("config.toml");
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(AppConfig::default()),
        Err(e) => return Err(ConfigError::Read { path, source: e }),
    };
    toml::from_str(&content).map_err(|e| ConfigError::Parse { path, source: e })
}
