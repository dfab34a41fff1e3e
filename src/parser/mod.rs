//! Page parsing for fetched portal documents
//!
//! The crawler only depends on two fields of a parsed recipe: its identifier
//! and the identifiers of related recipes. Everything else a parser extracts
//! travels as an opaque JSON payload straight into the output record.
//!
//! - [`PageParser`]: the parsing capability the crawler is built against
//! - [`RecipePageParser`]: the HTML implementation for recipe pages
//! - listing parsers for search results, the daily feed, and comment pages

mod listing;
mod recipe;

pub use listing::{parse_comment_page, parse_daily_feed, parse_search_results, CommentPage};
pub use recipe::RecipePageParser;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised while turning a document into structured data
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed document: {0}")]
    Malformed(String),
}

/// Converts a raw document into a [`Record`]
///
/// Implementations must be pure with respect to the crawler: a failure is
/// reported as a [`ParseError`] and never panics across the worker boundary.
pub trait PageParser: Send + Sync {
    fn parse(&self, id: &str, document: &str) -> Result<Record, ParseError>;
}

/// A single comment left under a recipe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub text: String,
    pub author: String,
}

/// A successfully parsed recipe
#[derive(Debug, Clone, Serialize)]
pub struct Record {
    pub id: String,

    /// Identifiers of recipes referenced by this one, in page order
    pub related: Vec<String>,

    pub comment_count: usize,
    pub comments: Vec<Comment>,
    pub fetched_at: DateTime<Utc>,

    /// Parser-specific fields, written out unchanged
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Record {
    pub fn new(id: impl Into<String>, related: Vec<String>) -> Self {
        Self {
            id: id.into(),
            related,
            comment_count: 0,
            comments: Vec::new(),
            fetched_at: Utc::now(),
            payload: Map::new(),
        }
    }

    /// Adds an opaque payload field
    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.payload.insert(key.to_string(), value.into());
        self
    }

    /// Attaches comments, keeping `comment_count` in step
    pub fn set_comments(&mut self, comments: Vec<Comment>) {
        self.comment_count = comments.len();
        self.comments = comments;
    }
}
