//! Fetch executor
//!
//! This module turns a URL into a body and an identifier into a recipe:
//! - Single, unpaced GET requests through the transport
//! - Bounded retries behind the rate limiter
//! - Handing successful bodies to the page parser
//! - Attaching comments to parsed recipes
//!
//! # Retry Policy
//!
//! | Condition | Action |
//! |-----------|--------|
//! | HTTP 2xx | Return the body |
//! | Any other status | Retry immediately, up to the attempt cap |
//! | Network error / timeout | Retry immediately, up to the attempt cap |
//! | Shutdown requested | Stop retrying |
//!
//! Attempts are bounded by count only; there is no backoff between them
//! beyond the rate limiter's spacing.

use crate::crawler::pagination::fetch_comments;
use crate::crawler::rate_limiter::RateLimiter;
use crate::crawler::shutdown::Shutdown;
use crate::crawler::transport::{HttpResponse, HttpTransport, TransportError};
use crate::parser::{PageParser, ParseError, Record};
use crate::portal::Portal;
use std::sync::Arc;
use thiserror::Error;

/// Default number of attempts per resource
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Why a resource could not be obtained
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Giving up on {url} after {attempts} attempt(s), last status: {}", describe_status(.last_status, .last_error))]
    Exhausted {
        url: String,
        attempts: u32,
        last_status: Option<u16>,
        last_error: Option<String>,
    },

    #[error("Could not parse {url}: {source}")]
    Parse { url: String, source: ParseError },

    #[error("Fetch of {url} abandoned during shutdown")]
    Interrupted { url: String },
}

fn describe_status(status: &Option<u16>, error: &Option<String>) -> String {
    match (status, error) {
        (Some(status), _) => status.to_string(),
        (None, Some(error)) => format!("none ({})", error),
        (None, None) => "none".to_string(),
    }
}

impl FetchError {
    /// Status code of the final failed attempt, if the server answered
    pub fn last_status(&self) -> Option<u16> {
        match self {
            FetchError::Exhausted { last_status, .. } => *last_status,
            _ => None,
        }
    }
}

/// Result of fetching one recipe
///
/// Failures carry no related identifiers, so they never expand the crawl.
#[derive(Debug)]
pub enum FetchOutcome {
    Fetched(Record),
    Failed { id: String, error: FetchError },
}

/// Fetches resources through a shared transport and rate limiter
pub struct Fetcher {
    transport: Arc<dyn HttpTransport>,
    limiter: Arc<RateLimiter>,
    max_attempts: u32,
    shutdown: Shutdown,
}

impl Fetcher {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        limiter: Arc<RateLimiter>,
        max_attempts: u32,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            transport,
            limiter,
            max_attempts: max_attempts.max(1),
            shutdown,
        }
    }

    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    /// Issues one GET without pacing or retries
    pub async fn fetch_once(&self, url: &str) -> Result<HttpResponse, TransportError> {
        self.transport.get(url).await
    }

    /// Fetches a URL, retrying until a 2xx response or the attempt cap
    ///
    /// Every attempt waits on the rate limiter first.
    pub async fn fetch_with_retry(&self, url: &str) -> Result<String, FetchError> {
        let mut last_status = None;
        let mut last_error = None;

        for attempt in 1..=self.max_attempts {
            self.limiter.wait().await;

            match self.fetch_once(url).await {
                Ok(response) if response.is_success() => {
                    tracing::trace!("Fetched {} on attempt {}", url, attempt);
                    return Ok(response.body);
                }
                Ok(response) => {
                    tracing::debug!(
                        "Attempt {}/{} for {} returned status {}",
                        attempt,
                        self.max_attempts,
                        url,
                        response.status
                    );
                    last_status = Some(response.status);
                }
                Err(e) => {
                    tracing::debug!(
                        "Attempt {}/{} for {} failed: {}",
                        attempt,
                        self.max_attempts,
                        url,
                        e
                    );
                    last_error = Some(e.to_string());
                }
            }

            if attempt < self.max_attempts && self.shutdown.is_triggered() {
                return Err(FetchError::Interrupted {
                    url: url.to_string(),
                });
            }
        }

        let error = FetchError::Exhausted {
            url: url.to_string(),
            attempts: self.max_attempts,
            last_status,
            last_error,
        };
        tracing::warn!("{}", error);
        Err(error)
    }

    /// Fetches and parses one recipe, then attaches its comments
    ///
    /// Never fails outright: transport exhaustion and parse errors both come
    /// back as [`FetchOutcome::Failed`] for this identifier alone. A recipe
    /// whose comments were cut short by shutdown is reported as interrupted
    /// rather than returned incomplete.
    pub async fn fetch_recipe(
        &self,
        id: &str,
        portal: &Portal,
        parser: &dyn PageParser,
        comment_fetch_count: i64,
    ) -> FetchOutcome {
        let url = portal.recipe_url(id);
        tracing::debug!("Fetching {}", url);

        let body = match self.fetch_with_retry(&url).await {
            Ok(body) => body,
            Err(error) => {
                return FetchOutcome::Failed {
                    id: id.to_string(),
                    error,
                }
            }
        };

        let mut record = match parser.parse(id, &body) {
            Ok(record) => record,
            Err(source) => {
                tracing::warn!("Could not parse {}: {}", url, source);
                return FetchOutcome::Failed {
                    id: id.to_string(),
                    error: FetchError::Parse { url, source },
                };
            }
        };

        if comment_fetch_count != 0 {
            if self.shutdown.is_triggered() {
                return interrupted(id, url);
            }
            let comments = fetch_comments(self, portal, id, comment_fetch_count).await;
            if self.shutdown.is_triggered() {
                return interrupted(id, url);
            }
            tracing::debug!("Fetched {} comments for {}", comments.len(), id);
            record.set_comments(comments);
        }

        FetchOutcome::Fetched(record)
    }
}

fn interrupted(id: &str, url: String) -> FetchOutcome {
    FetchOutcome::Failed {
        id: id.to_string(),
        error: FetchError::Interrupted { url },
    }
}
