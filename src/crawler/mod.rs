//! Crawler module for recipe fetching and traversal
//!
//! This module contains the core crawling logic, including:
//! - Request pacing and randomized request headers
//! - HTTP fetching with bounded retries
//! - Paginated search and comment fetching
//! - Seed resolution and level-by-level coordination
//! - Cooperative shutdown on interrupt

mod coordinator;
mod fetcher;
mod headers;
mod pagination;
mod rate_limiter;
mod seeds;
mod shutdown;
mod transport;

#[cfg(test)]
mod testing;

pub use coordinator::{CrawlReport, Coordinator};
pub use fetcher::{FetchError, FetchOutcome, Fetcher, DEFAULT_MAX_ATTEMPTS};
pub use headers::random_headers;
pub use pagination::{fetch_comments, fetch_search_results, COMMENT_PAGE_SIZE, SEARCH_PAGE_SIZE};
pub use rate_limiter::RateLimiter;
pub use seeds::{resolve_seeds, SeedSource};
pub use shutdown::{install_signal_handler, Shutdown};
pub use transport::{build_http_client, HttpResponse, HttpTransport, ReqwestTransport, TransportError};
