//! Ladle: a breadth-first recipe crawler
//!
//! This crate crawls a single recipe portal level by level, following the
//! related-recipe links of every fetched page. Fetches run on a bounded worker
//! pool behind a process-wide rate limiter, and every processed recipe is
//! recorded in a persistent, crash-safe deduplication index.

pub mod config;
pub mod crawler;
pub mod index;
pub mod output;
pub mod parser;
pub mod portal;

use thiserror::Error;

/// Main error type for Ladle operations
#[derive(Debug, Error)]
pub enum LadleError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Index error: {0}")]
    Index(#[from] index::IndexError),

    #[error("Parse error: {0}")]
    Parse(#[from] parser::ParseError),

    #[error("Could not resolve seeds: {0}")]
    Seed(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid rate limit: {0}")]
    InvalidRateLimit(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Ladle operations
pub type Result<T> = std::result::Result<T, LadleError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::{Config, RateLimit};
pub use crawler::{Coordinator, CrawlReport, SeedSource};
pub use index::DedupIndex;
pub use parser::{PageParser, Record};
pub use portal::{identifier_from_url, Portal};
