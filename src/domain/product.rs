use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::app::{RatecastError, Result};

/// `/product/<slug>/<digits>` path form.
const STRUCTURED_PATTERN: &str = r"/product/[^/?#]+/(\d{6,})";
/// First run of at least six digits anywhere in the input.
const DIGIT_RUN_PATTERN: &str = r"(\d{6,})";

static PATTERNS: OnceLock<[Regex; 2]> = OnceLock::new();

/// Locator patterns in priority order, compiled once per process.
fn patterns() -> Result<&'static [Regex; 2]> {
    if let Some(patterns) = PATTERNS.get() {
        return Ok(patterns);
    }
    let compiled = [Regex::new(STRUCTURED_PATTERN)?, Regex::new(DIGIT_RUN_PATTERN)?];
    Ok(PATTERNS.get_or_init(|| compiled))
}

/// Numeric product identifier on the target marketplace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    /// Resolve a bare numeric identifier or extract one from a locator string.
    pub fn resolve(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(RatecastError::UnresolvedIdentifier(input.to_string()));
        }

        if input.chars().all(|c| c.is_ascii_digit()) {
            return Ok(Self(input.to_string()));
        }

        for re in patterns()? {
            if let Some(id) = re.captures(input).and_then(|c| c.get(1)) {
                return Ok(Self(id.as_str().to_string()));
            }
        }

        Err(RatecastError::UnresolvedIdentifier(input.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Location of the review listing for this product under `base_url`.
    pub fn reviews_url(&self, base_url: &str) -> Result<Url> {
        let base = Url::parse(base_url)
            .map_err(|e| RatecastError::Config(format!("Invalid base URL {}: {}", base_url, e)))?;
        base.join(&format!("/product/{}/reviews", self.0))
            .map_err(|e| RatecastError::Config(format!("Invalid reviews URL: {}", e)))
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_numeric_identifier() {
        assert_eq!(ProductId::resolve("123456").unwrap().as_str(), "123456");
        assert_eq!(ProductId::resolve("  987654321 ").unwrap().as_str(), "987654321");
    }

    #[test]
    fn test_slug_locator_uses_digit_run() {
        let id = ProductId::resolve("https://example.test/product/widget-123456789").unwrap();
        assert_eq!(id.as_str(), "123456789");
    }

    #[test]
    fn test_structured_path_form() {
        let id = ProductId::resolve("https://example.test/product/widget/1234567/?x=99999999").unwrap();
        assert_eq!(id.as_str(), "1234567");
    }

    #[test]
    fn test_locator_with_query_parameters() {
        let id = ProductId::resolve("https://www.ozon.ru/product/test-456789123/?asb=123").unwrap();
        assert_eq!(id.as_str(), "456789123");
    }

    #[test]
    fn test_unresolvable_inputs() {
        for input in ["not-a-product", "", "   ", "https://example.test/product/widget-12345"] {
            match ProductId::resolve(input) {
                Err(RatecastError::UnresolvedIdentifier(_)) => {}
                other => panic!("expected UnresolvedIdentifier for {:?}, got {:?}", input, other),
            }
        }
    }

    #[test]
    fn test_patterns_are_compiled_once() {
        let first = patterns().unwrap();
        ProductId::resolve("https://example.test/product/widget-123456789").unwrap();
        assert!(std::ptr::eq(first, patterns().unwrap()));
    }

    #[test]
    fn test_reviews_url() {
        let id = ProductId::resolve("123456789").unwrap();
        let url = id.reviews_url("https://www.ozon.ru").unwrap();
        assert_eq!(url.as_str(), "https://www.ozon.ru/product/123456789/reviews");
    }
}
