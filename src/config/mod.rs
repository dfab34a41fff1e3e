//! Configuration module for Ladle
//!
//! This module handles loading, parsing, and validating the crawler
//! configuration. A TOML file is optional; every value has a default and the
//! command line may override any of them before validation runs.
//!
//! # Example
//!
//! ```no_run
//! use ladle::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("ladle.toml")).unwrap();
//! println!("Recursion depth: {}", config.crawler.recursion_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, OutputConfig, PortalConfig, RateLimit};

// Re-export parser functions
pub use parser::{load_config, parse_config};
pub use validation::validate;
