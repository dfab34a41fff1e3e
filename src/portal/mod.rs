//! Addressing for the recipe portal
//!
//! This module knows how recipe identifiers map to page URLs and back, and
//! how the search listing, comment API, and recipe-of-the-day feed are
//! addressed.

use crate::config::PortalConfig;
use regex::Regex;
use std::sync::OnceLock;

/// Extracts the recipe identifier from a recipe page URL
///
/// Identifiers are the numeric path segment following `rezepte/`.
///
/// # Examples
///
/// ```
/// use ladle::portal::identifier_from_url;
///
/// let id = identifier_from_url("https://www.chefkoch.de/rezepte/1234567/Kuchen.html");
/// assert_eq!(id.as_deref(), Some("1234567"));
/// assert_eq!(identifier_from_url("https://www.chefkoch.de/rs/s0/Rezepte.html"), None);
/// ```
pub fn identifier_from_url(url: &str) -> Option<String> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

    PATTERN
        .get_or_init(|| Regex::new(r"rezepte/(\d+)/").ok())
        .as_ref()?
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Prepares a free-text search term for the search URL
///
/// Surrounding whitespace is removed and every inner whitespace character
/// becomes `+`.
pub fn search_term(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| if c.is_whitespace() { '+' } else { c })
        .collect()
}

/// URL builder for one portal deployment
#[derive(Debug, Clone)]
pub struct Portal {
    base_url: String,
    api_url: String,
}

impl Portal {
    pub fn new(base_url: &str, api_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &PortalConfig) -> Self {
        Self::new(&config.base_url, &config.api_url)
    }

    /// Page of a single recipe
    pub fn recipe_url(&self, id: &str) -> String {
        format!("{}/rezepte/{}/", self.base_url, id)
    }

    /// Search listing starting at result `start`; `None` lists every recipe
    pub fn search_url(&self, term: Option<&str>, start: usize) -> String {
        match term {
            Some(term) => format!("{}/rs/s{}/{}/Rezepte.html", self.base_url, start, term),
            None => format!("{}/rs/s{}/Rezepte.html", self.base_url, start),
        }
    }

    /// One page of a recipe's comments from the JSON API
    pub fn comments_url(&self, id: &str, offset: usize, limit: usize) -> String {
        format!(
            "{}/v2/recipes/{}/comments?offset={}&limit={}&order=1&orderBy=1",
            self.api_url, id, offset, limit
        )
    }

    /// RSS feed announcing the recipe of the day
    pub fn daily_feed_url(&self) -> String {
        format!("{}/recipe-of-the-day/rss", self.base_url)
    }
}

impl Default for Portal {
    fn default() -> Self {
        Self::from_config(&PortalConfig::default())
    }
}
