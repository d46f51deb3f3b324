//! Cascading selector strategies.
//!
//! Every strategy is a pure function of a markup fragment; a [`SelectorChain`]
//! tries its strategies in order until one yields a value.

use scraper::{ElementRef, Html, Selector};

use crate::app::{RatecastError, Result};

pub fn parse_selector(source: &str) -> Result<Selector> {
    Selector::parse(source).map_err(|e| RatecastError::Selector {
        selector: source.to_string(),
        reason: e.to_string(),
    })
}

/// Number of nodes under `scope` matched by `selector`.
pub fn count_matches(scope: ElementRef<'_>, selector: &Selector) -> usize {
    scope.select(selector).count()
}

/// Whitespace-normalized text of the first non-empty match under `scope`.
pub fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope
        .select(selector)
        .map(|el| normalize_whitespace(el.text()))
        .find(|text| !text.is_empty())
}

fn normalize_whitespace<'a>(fragments: impl Iterator<Item = &'a str>) -> String {
    fragments
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// An ordered list of compiled selectors for one field.
pub struct SelectorChain {
    entries: Vec<(String, Selector)>,
}

impl SelectorChain {
    pub fn compile(sources: &[String]) -> Result<Self> {
        let entries = sources
            .iter()
            .map(|s| parse_selector(s).map(|sel| (s.clone(), sel)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { entries })
    }

    /// Matches of the first selector that finds anything, with that selector's source.
    pub fn first_nonempty<'a>(&self, document: &'a Html) -> Option<(&str, Vec<ElementRef<'a>>)> {
        self.entries.iter().find_map(|(source, selector)| {
            let found: Vec<_> = document.select(selector).collect();
            (!found.is_empty()).then_some((source.as_str(), found))
        })
    }

    /// First non-zero node count.
    pub fn first_count(&self, scope: ElementRef<'_>) -> Option<usize> {
        self.entries
            .iter()
            .map(|(_, selector)| count_matches(scope, selector))
            .find(|&n| n > 0)
    }

    pub fn first_text(&self, scope: ElementRef<'_>) -> Option<String> {
        self.entries
            .iter()
            .find_map(|(_, selector)| first_text(scope, selector))
    }
}
