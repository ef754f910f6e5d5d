use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

/// Feature flags consulted by the CLI surface. The stores never read these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flags {
    pub feature_categories: bool,
    pub feature_statistics: bool,
}

impl Default for Flags {
    fn default() -> Self {
        Flags {
            feature_categories: true,
            feature_statistics: true,
        }
    }
}

/// Error type for flag fetching
#[derive(Debug, thiserror::Error)]
pub enum FlagError {
    #[error("could not read flag source {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse flag source {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Where flag overrides come from. Fetched asynchronously; a failed fetch
/// leaves the current values in place.
#[async_trait]
pub trait FlagSource: Send + Sync {
    async fn fetch(&self) -> Result<HashMap<String, bool>, FlagError>;
}

/// Flag overrides read from a `flags.toml` file in the data directory:
///
/// ```toml
/// [flags]
/// feature_categories = false
/// ```
///
/// A missing file means no overrides.
pub struct FileSource {
    path: PathBuf,
}

#[derive(Deserialize, Default)]
struct FlagsFile {
    #[serde(default)]
    flags: HashMap<String, bool>,
}

impl FileSource {
    pub fn new(path: &Path) -> Self {
        FileSource {
            path: path.to_path_buf(),
        }
    }
}

#[async_trait]
impl FlagSource for FileSource {
    async fn fetch(&self) -> Result<HashMap<String, bool>, FlagError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => {
                return Err(FlagError::Read {
                    path: self.path.clone(),
                    source: e,
                });
            }
        };
        let parsed: FlagsFile = toml::from_str(&content).map_err(|e| FlagError::Parse {
            path: self.path.clone(),
            source: e,
        })?;
        Ok(parsed.flags)
    }
}

/// Holds the current flag values, refreshed from a source no more often
/// than the minimum fetch interval. Unknown keys in the source are
/// ignored; known keys missing from the source keep their defaults.
pub struct FlagGate {
    source: Option<Box<dyn FlagSource>>,
    flags: Flags,
    min_fetch_interval: Duration,
    last_fetch: Option<Instant>,
}

impl FlagGate {
    pub fn new(source: Box<dyn FlagSource>, min_fetch_interval: Duration) -> Self {
        FlagGate {
            source: Some(source),
            flags: Flags::default(),
            min_fetch_interval,
            last_fetch: None,
        }
    }

    /// A gate with no source; every flag stays at its default.
    pub fn defaults() -> Self {
        FlagGate {
            source: None,
            flags: Flags::default(),
            min_fetch_interval: Duration::ZERO,
            last_fetch: None,
        }
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn categories_enabled(&self) -> bool {
        self.flags.feature_categories
    }

    pub fn statistics_enabled(&self) -> bool {
        self.flags.feature_statistics
    }

    /// Fetch fresh values if the interval allows it. Returns whether a
    /// fetch was performed. Fetch failures are logged and leave the
    /// current values in place.
    pub async fn refresh(&mut self) -> bool {
        let Some(source) = &self.source else {
            return false;
        };
        if let Some(last) = self.last_fetch {
            if last.elapsed() < self.min_fetch_interval {
                debug!("flag refresh skipped, within minimum fetch interval");
                return false;
            }
        }
        match source.fetch().await {
            Ok(values) => {
                let defaults = Flags::default();
                self.flags.feature_categories = values
                    .get("feature_categories")
                    .copied()
                    .unwrap_or(defaults.feature_categories);
                self.flags.feature_statistics = values
                    .get("feature_statistics")
                    .copied()
                    .unwrap_or(defaults.feature_statistics);
                self.last_fetch = Some(Instant::now());
                true
            }
            Err(e) => {
                warn!(error = %e, "could not refresh feature flags, keeping current values");
                self.last_fetch = Some(Instant::now());
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticSource(HashMap<String, bool>);

    #[async_trait]
    impl FlagSource for StaticSource {
        async fn fetch(&self) -> Result<HashMap<String, bool>, FlagError> {
            Ok(self.0.clone())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl FlagSource for FailingSource {
        async fn fetch(&self) -> Result<HashMap<String, bool>, FlagError> {
            Err(FlagError::Read {
                path: PathBuf::from("flags.toml"),
                source: std::io::Error::other("unreachable"),
            })
        }
    }

    #[test]
    fn defaults_are_all_on() {
        let gate = FlagGate::defaults();
        assert!(gate.categories_enabled());
        assert!(gate.statistics_enabled());
    }

    #[tokio::test]
    async fn refresh_applies_overrides_and_ignores_unknown_keys() {
        let mut values = HashMap::new();
        values.insert("feature_categories".to_string(), false);
        values.insert("feature_shiny".to_string(), true);

        let mut gate = FlagGate::new(Box::new(StaticSource(values)), Duration::ZERO);
        assert!(gate.refresh().await);
        assert!(!gate.categories_enabled());
        assert!(gate.statistics_enabled());
    }

    #[tokio::test]
    async fn failed_fetch_keeps_current_values() {
        let mut gate = FlagGate::new(Box::new(FailingSource), Duration::ZERO);
        assert!(!gate.refresh().await);
        assert_eq!(gate.flags(), Flags::default());
    }

    #[tokio::test]
    async fn refresh_within_interval_is_a_no_op() {
        let mut values = HashMap::new();
        values.insert("feature_statistics".to_string(), false);

        let mut gate = FlagGate::new(
            Box::new(StaticSource(values)),
            Duration::from_secs(3600),
        );
        assert!(gate.refresh().await);
        assert!(!gate.refresh().await);
    }

    #[tokio::test]
    async fn file_source_missing_file_means_no_overrides() {
        let source = FileSource::new(Path::new("/nonexistent/flags.toml"));
        assert!(source.fetch().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn file_source_parses_flag_table() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("flags.toml");
        std::fs::write(&path, "[flags]\nfeature_categories = false\n").unwrap();

        let source = FileSource::new(&path);
        let values = source.fetch().await.unwrap();
        assert_eq!(values.get("feature_categories"), Some(&false));
    }
}
