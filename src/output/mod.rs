//! Output module for persisting crawled recipes
//!
//! This module handles:
//! - The sink interface records are handed to after a successful fetch
//! - Writing one pretty-printed JSON file per recipe

mod json;
mod traits;

pub use json::JsonFileSink;
pub use traits::{OutputError, OutputResult, RecordSink};
