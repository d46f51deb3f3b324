//! Configuration management for ratecast.
//!
//! Configuration is read from `~/.config/ratecast/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::extract::ExtractorConfig;
use crate::pagination::PaginationConfig;
use crate::pipeline::BatchConfig;
use crate::renderer::RendererConfig;
use crate::store::CacheConfig;

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub renderer: RendererConfig,
    pub pagination: PaginationConfig,
    pub extractor: ExtractorConfig,
    pub batch: BatchConfig,
    pub cache: CacheConfig,
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// If the config file exists but is invalid, returns an error.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::default_config_path()?)
    }

    /// Load configuration from an explicit path, creating it when absent.
    pub fn load_from(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            Self::create_default_config(config_path)?;
            return Ok(Self::default());
        }

        let content = fs::read_to_string(config_path).map_err(|e| ConfigError::Io {
            path: config_path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path.to_path_buf(),
            source: e,
        })
    }

    /// Get the default config file path: `~/.config/ratecast/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("ratecast").join("config.toml"))
    }

    /// Location of the result cache database: `[cache].path` or the user data directory.
    pub fn cache_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.cache.path {
            return Ok(path.clone());
        }
        let data_dir = dirs::data_dir().ok_or(ConfigError::NoDataDir)?;
        Ok(data_dir.join("ratecast").join("cache.db"))
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# ratecast configuration
#
# Every key is optional; anything left out falls back to its default.

[renderer]
# "chrome" drives a headless browser and can paginate.
# "http" does a single GET and sees only the first page of reviews.
backend = "chrome"

# Run browser in headless mode (no visible window)
headless = true

# Timeout for each renderer call in seconds
timeout_secs = 30

# Wait time after page load for dynamic content (milliseconds)
wait_after_load_ms = 2000

# Maximum concurrent browser pages
max_sessions = 2

# Marketplace origin; review listings live at {base_url}/product/{id}/reviews
base_url = "https://www.ozon.ru"

# Captions of the button that reveals more reviews
load_more_labels = ["Показать еще", "Показать ещё", "Load more", "Show more"]

[pagination]
# Hard upper bound on scroll rounds per product
max_rounds = 50

# Wait after each scroll before checking for new content (milliseconds)
settle_ms = 1500

# Wait after clicking "load more" (milliseconds)
trigger_settle_ms = 1000

# Log progress every N rounds (0 disables)
progress_every = 10

[extractor]
# Selector cascades, tried in order; the first one that yields a value wins.
containers = [
    "div[data-widget=\"webSingleProductScore\"]",
    "div[class*=\"tsBodyM\"][class*=\"commentCard\"]",
]
rating = [
    "svg[class*=\"star\"][class*=\"fill\"]",
    "use[href*=\"#star\"][class*=\"fill\"]",
    "div[class*=\"star\"] svg[class*=\"fill\"]",
]
date = [
    "span[class*=\"tsBodyS\"][class*=\"color--secondary\"]",
    "div[class*=\"date\"]",
]
text = [
    "span[class*=\"tsBodyM\"]",
    "[itemprop=\"reviewBody\"]",
]

[batch]
# Minimum gap between product renders (milliseconds)
pacing_ms = 2000

# Products analyzed at once; 1 keeps batches sequential
workers = 1

# Upper bound on one product's analysis in seconds
analysis_timeout_secs = 300

[cache]
# Reuse analysis results between runs
enabled = true

# Hours a cached result stays fresh
ttl_hours = 6

# Database location (default: user data directory)
# path = "/tmp/ratecast.db"
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Could not determine data directory")]
    NoDataDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::RendererBackend;

    #[test]
    fn test_default_config_deserializes() {
        let content = Config::default_config_content();
        let config: Config = toml::from_str(&content).expect("Default config should be valid TOML");

        let defaults = Config::default();
        assert_eq!(config.renderer.backend, RendererBackend::Chrome);
        assert_eq!(config.renderer.base_url, defaults.renderer.base_url);
        assert_eq!(config.renderer.load_more_labels, defaults.renderer.load_more_labels);
        assert_eq!(config.pagination, defaults.pagination);
        assert_eq!(config.extractor, defaults.extractor);
        assert_eq!(config.batch, defaults.batch);
        assert_eq!(config.cache, defaults.cache);
    }

    #[test]
    fn test_partial_config() {
        let content = r##"
[renderer]
backend = "http"

[pagination]
max_rounds = 5
"##;
        let config: Config = toml::from_str(content).expect("Partial config should work");

        assert_eq!(config.renderer.backend, RendererBackend::Http);
        assert_eq!(config.pagination.max_rounds, 5);
        // Untouched keys keep their defaults
        assert_eq!(config.pagination.settle_ms, 1500);
        assert_eq!(config.renderer.timeout_secs, 30);
        assert_eq!(config.batch.pacing_ms, 2000);
    }

    #[test]
    fn test_empty_config() {
        let config: Config = toml::from_str("").expect("Empty config should work");
        assert_eq!(config.pagination.max_rounds, 50);
        assert_eq!(config.cache.ttl_hours, 6);
        assert!(config.cache.enabled);
    }

    #[test]
    fn test_invalid_backend_is_rejected() {
        let content = "[renderer]\nbackend = \"lynx\"\n";
        assert!(toml::from_str::<Config>(content).is_err());
    }

    #[test]
    fn test_load_from_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ratecast").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.pagination.max_rounds, 50);

        fs::write(&path, "[batch]\nworkers = 3\n").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.batch.workers, 3);
    }

    #[test]
    fn test_load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[pagination]\nmax_rounds = \"many\"\n").unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_cache_path_override() {
        let mut config = Config::default();
        config.cache.path = Some(PathBuf::from("/tmp/custom.db"));
        assert_eq!(config.cache_path().unwrap(), PathBuf::from("/tmp/custom.db"));
    }
}
