//! Seed resolution
//!
//! Turns the user's choice of starting point into the identifiers of level 0.

use crate::crawler::fetcher::Fetcher;
use crate::crawler::pagination::fetch_search_results;
use crate::parser::parse_daily_feed;
use crate::portal::{identifier_from_url, search_term, Portal};
use crate::LadleError;

/// Where a crawl starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedSource {
    /// The recipe of the day
    Daily,
    /// Results of one or more free-text searches
    Search(Vec<String>),
    /// Recipe page URLs
    Urls(Vec<String>),
    /// Bare recipe identifiers
    Ids(Vec<String>),
    /// The complete recipe listing
    All,
}

/// Resolves a seed source into level-0 identifiers
///
/// Only the daily feed can fail the run: without it there is nothing to
/// crawl. Listings that break off part way yield what they gathered.
pub async fn resolve_seeds(
    source: &SeedSource,
    fetcher: &Fetcher,
    portal: &Portal,
    search_result_count: usize,
) -> Result<Vec<String>, LadleError> {
    match source {
        SeedSource::Ids(ids) => Ok(ids
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect()),

        SeedSource::Urls(urls) => Ok(urls
            .iter()
            .filter_map(|url| {
                let id = identifier_from_url(url);
                if id.is_none() {
                    tracing::warn!("No recipe identifier in {}, ignoring it", url);
                }
                id
            })
            .collect()),

        SeedSource::Search(terms) => {
            let mut ids = Vec::new();
            for raw in terms {
                let term = search_term(raw);
                if term.is_empty() {
                    continue;
                }
                tracing::info!("Searching for '{}'", raw.trim());
                let urls =
                    fetch_search_results(fetcher, portal, Some(&term), Some(search_result_count))
                        .await;
                tracing::info!("Search '{}' returned {} results", raw.trim(), urls.len());
                ids.extend(urls.iter().filter_map(|url| identifier_from_url(url)));
            }
            Ok(ids)
        }

        SeedSource::All => {
            tracing::info!("Listing all recipes");
            let urls = fetch_search_results(fetcher, portal, None, None).await;
            Ok(urls
                .iter()
                .filter_map(|url| identifier_from_url(url))
                .collect())
        }

        SeedSource::Daily => {
            let feed_url = portal.daily_feed_url();
            let feed = fetcher
                .fetch_with_retry(&feed_url)
                .await
                .map_err(|e| LadleError::Seed(e.to_string()))?;
            let link = parse_daily_feed(&feed)?;
            let id = identifier_from_url(&link).ok_or_else(|| {
                LadleError::Seed(format!("Recipe of the day link has no identifier: {}", link))
            })?;
            tracing::info!("Recipe of the day is {}", id);
            Ok(vec![id])
        }
    }
}
