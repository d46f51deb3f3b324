use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererBackend {
    /// Headless Chrome; required for listings that load reviews on scroll.
    Chrome,
    /// Plain HTTP GET; no script execution and no pagination.
    Http,
}

/// Configuration for the page renderer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Which renderer implementation to use (default: chrome)
    pub backend: RendererBackend,

    /// Whether to run the browser in headless mode (default: true)
    pub headless: bool,

    /// Timeout for each call into the renderer in seconds (default: 30)
    pub timeout_secs: u64,

    /// Wait time after page load for dynamic content in milliseconds (default: 2000)
    pub wait_after_load_ms: u64,

    /// Maximum concurrent browser pages (default: 2)
    pub max_sessions: usize,

    /// User agent string to use
    pub user_agent: Option<String>,

    /// Marketplace origin the review listing URL is built from
    pub base_url: String,

    /// Button captions that reveal more reviews
    pub load_more_labels: Vec<String>,

    /// CSS scope searched for the "load more" button
    pub load_more_scope: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            backend: RendererBackend::Chrome,
            headless: true,
            timeout_secs: 30,
            wait_after_load_ms: 2000,
            max_sessions: 2,
            user_agent: Some(
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                    .to_string(),
            ),
            base_url: "https://www.ozon.ru".to_string(),
            load_more_labels: vec![
                "Показать еще".to_string(),
                "Показать ещё".to_string(),
                "Load more".to_string(),
                "Show more".to_string(),
            ],
            load_more_scope: "[data-widget=\"webReviewProductScore\"]".to_string(),
        }
    }
}

impl RendererConfig {
    /// Get the per-call timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get the wait time after load as a Duration
    pub fn wait_after_load(&self) -> Duration {
        Duration::from_millis(self.wait_after_load_ms)
    }

    /// Create a config optimized for speed (may miss late content)
    pub fn fast() -> Self {
        Self {
            timeout_secs: 15,
            wait_after_load_ms: 1000,
            max_sessions: 4,
            ..Default::default()
        }
    }

    /// Create a config optimized for completeness (slower)
    pub fn thorough() -> Self {
        Self {
            timeout_secs: 60,
            wait_after_load_ms: 4000,
            max_sessions: 1,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = RendererConfig::default();
        assert_eq!(config.backend, RendererBackend::Chrome);
        assert!(config.headless);
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.wait_after_load_ms, 2000);
        assert_eq!(config.max_sessions, 2);
        assert!(!config.load_more_labels.is_empty());
    }

    #[test]
    fn test_presets() {
        let fast = RendererConfig::fast();
        assert_eq!(fast.timeout(), Duration::from_secs(15));
        assert_eq!(fast.max_sessions, 4);

        let thorough = RendererConfig::thorough();
        assert_eq!(thorough.wait_after_load(), Duration::from_millis(4000));
        assert_eq!(thorough.max_sessions, 1);
        assert!(thorough.headless);
    }

    #[test]
    fn test_backend_from_toml() {
        let config: RendererConfig = toml::from_str("backend = \"http\"").unwrap();
        assert_eq!(config.backend, RendererBackend::Http);
        assert_eq!(config.timeout_secs, 30);
    }
}
