use serde::{Deserialize, Serialize};

/// Ordered selector cascades used to pull reviews out of a listing.
///
/// Each list is tried front to back; the first selector producing a value wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Review containers. Later entries are only used when earlier ones match nothing.
    pub containers: Vec<String>,

    /// Filled-star indicator nodes; the match count inside a container is its rating.
    pub rating: Vec<String>,

    /// Element holding the review date text.
    pub date: Vec<String>,

    /// Element holding the review body (optional).
    pub text: Vec<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            containers: vec![
                "div[data-widget=\"webSingleProductScore\"]".to_string(),
                "div[class*=\"tsBodyM\"][class*=\"commentCard\"]".to_string(),
            ],
            rating: vec![
                "svg[class*=\"star\"][class*=\"fill\"]".to_string(),
                "use[href*=\"#star\"][class*=\"fill\"]".to_string(),
                "div[class*=\"star\"] svg[class*=\"fill\"]".to_string(),
            ],
            date: vec![
                "span[class*=\"tsBodyS\"][class*=\"color--secondary\"]".to_string(),
                "div[class*=\"date\"]".to_string(),
            ],
            text: vec![
                "span[class*=\"tsBodyM\"]".to_string(),
                "[itemprop=\"reviewBody\"]".to_string(),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cascades_have_fallbacks() {
        let config = ExtractorConfig::default();
        assert!(config.containers.len() >= 2);
        assert!(config.rating.len() >= 2);
        assert!(config.date.len() >= 2);
        assert!(!config.text.is_empty());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ExtractorConfig = toml::from_str("date = [\"time\"]").unwrap();
        assert_eq!(config.date, vec!["time"]);
        assert_eq!(config.rating, ExtractorConfig::default().rating);
    }
}
