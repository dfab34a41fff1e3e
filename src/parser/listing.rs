//! Parsers for the portal's listing documents
//!
//! These cover the pages that lead to recipes rather than recipes
//! themselves: search result pages, the recipe-of-the-day feed, and the
//! comment API.

use crate::parser::{Comment, ParseError};
use regex::Regex;
use scraper::{Html, Selector};
use serde::Deserialize;
use serde_json::Value;

/// Extracts result URLs from a search listing page
///
/// The listing embeds its results as a JSON-LD `itemListElement`. A page
/// without that block has no results.
pub fn parse_search_results(document: &str) -> Result<Vec<String>, ParseError> {
    let html = Html::parse_document(document);
    let selector = Selector::parse(r#"script[type="application/ld+json"]"#)
        .map_err(|e| ParseError::Malformed(e.to_string()))?;

    for script in html.select(&selector) {
        let raw = script.text().collect::<String>();
        if !raw.contains("itemListElement") {
            continue;
        }

        let data: Value = serde_json::from_str(&raw)?;
        let items = data
            .get("itemListElement")
            .and_then(Value::as_array)
            .ok_or(ParseError::MissingField("itemListElement"))?;

        return Ok(items
            .iter()
            .filter_map(|item| item.get("url").and_then(Value::as_str))
            .map(str::to_string)
            .collect());
    }

    Ok(Vec::new())
}

/// Extracts the link of the first item in the recipe-of-the-day feed
pub fn parse_daily_feed(document: &str) -> Result<String, ParseError> {
    let pattern = Regex::new(r"(?s)<item\b.*?<link>\s*(.*?)\s*</link>")
        .map_err(|e| ParseError::Malformed(e.to_string()))?;

    pattern
        .captures(document)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|link| !link.is_empty())
        .ok_or(ParseError::MissingField("item link"))
}

/// One page of comments from the comment API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentPage {
    /// Total number of comments the recipe has, when the API declares it
    pub total: Option<usize>,
    pub comments: Vec<Comment>,
}

#[derive(Deserialize)]
struct RawCommentPage {
    count: Option<usize>,
    #[serde(default)]
    results: Vec<RawComment>,
}

#[derive(Deserialize)]
struct RawComment {
    #[serde(default)]
    text: String,
    owner: Option<RawOwner>,
}

#[derive(Deserialize)]
struct RawOwner {
    #[serde(default)]
    username: String,
}

/// Parses a comment API response body
pub fn parse_comment_page(body: &str) -> Result<CommentPage, ParseError> {
    let raw: RawCommentPage = serde_json::from_str(body)?;

    Ok(CommentPage {
        total: raw.count,
        comments: raw
            .results
            .into_iter()
            .map(|c| Comment {
                text: c.text,
                author: c.owner.map(|o| o.username).unwrap_or_default(),
            })
            .collect(),
    })
}
