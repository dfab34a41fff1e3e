//! Paginated fetching
//!
//! Two drivers share one shape: fetch a page, collect its items, and move on
//! until a page comes back short or the wanted amount is reached. Each page
//! goes through the fetcher's retry policy. When a later page still fails,
//! pagination stops and the items gathered so far are returned.

use crate::crawler::fetcher::Fetcher;
use crate::parser::{parse_comment_page, parse_search_results, Comment};
use crate::portal::Portal;

/// Results per search listing page
pub const SEARCH_PAGE_SIZE: usize = 30;

/// Largest comment page the API serves
pub const COMMENT_PAGE_SIZE: usize = 500;

/// Collects result URLs from the search listing
///
/// `term` selects a search; `None` walks the listing of all recipes. `limit`
/// caps the number of results; `None` continues until the listing ends.
pub async fn fetch_search_results(
    fetcher: &Fetcher,
    portal: &Portal,
    term: Option<&str>,
    limit: Option<usize>,
) -> Vec<String> {
    let max_pages = limit.map(|n| n.div_ceil(SEARCH_PAGE_SIZE));
    let mut urls = Vec::new();
    let mut page = 0;

    while max_pages.map_or(true, |max| page < max) {
        if page > 0 && fetcher.shutdown().is_triggered() {
            tracing::debug!("Search stopped by shutdown with {} results", urls.len());
            break;
        }

        let url = portal.search_url(term, page * SEARCH_PAGE_SIZE);
        tracing::debug!("Processing search page {}", page + 1);

        let body = match fetcher.fetch_with_retry(&url).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(
                    "Search stopped early at page {} with {} results: {}",
                    page + 1,
                    urls.len(),
                    e
                );
                break;
            }
        };

        let results = match parse_search_results(&body) {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!(
                    "Unreadable search page {}, keeping {} results: {}",
                    page + 1,
                    urls.len(),
                    e
                );
                break;
            }
        };

        tracing::debug!("Received {} results", results.len());
        let received = results.len();
        urls.extend(results);

        if received < SEARCH_PAGE_SIZE {
            break;
        }
        page += 1;
    }

    if let Some(limit) = limit {
        urls.truncate(limit);
    }
    urls
}

/// Collects a recipe's comments from the comment API
///
/// `requested` follows the configuration convention: 0 fetches nothing, a
/// positive value caps the number of comments, a negative value fetches all
/// of them. The total declared by the first page bounds the walk. No page
/// is requested once shutdown has been raised.
pub async fn fetch_comments(
    fetcher: &Fetcher,
    portal: &Portal,
    id: &str,
    requested: i64,
) -> Vec<Comment> {
    if requested == 0 {
        return Vec::new();
    }
    let wanted = usize::try_from(requested).ok();

    let mut comments: Vec<Comment> = Vec::new();
    let mut declared_total: Option<usize> = None;

    loop {
        let offset = comments.len();
        if fetcher.shutdown().is_triggered() {
            tracing::debug!("Comments for {} stopped by shutdown at offset {}", id, offset);
            break;
        }

        let limit = match wanted {
            Some(wanted) => COMMENT_PAGE_SIZE.min(wanted - offset),
            None => COMMENT_PAGE_SIZE,
        };

        let url = portal.comments_url(id, offset, limit);
        let body = match fetcher.fetch_with_retry(&url).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(
                    "Comments for {} stopped at offset {} ({} of {} collected): {}",
                    id,
                    offset,
                    comments.len(),
                    describe_total(declared_total),
                    e
                );
                break;
            }
        };

        let page = match parse_comment_page(&body) {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(
                    "Unreadable comment page for {} at offset {}: {}",
                    id,
                    offset,
                    e
                );
                break;
            }
        };

        if declared_total.is_none() {
            declared_total = page.total;
        }

        let received = page.comments.len();
        comments.extend(page.comments);

        if received < limit {
            break;
        }
        if declared_total.is_some_and(|total| comments.len() >= total) {
            break;
        }
        if wanted.is_some_and(|wanted| comments.len() >= wanted) {
            break;
        }
    }

    if let Some(wanted) = wanted {
        comments.truncate(wanted);
    }
    comments
}

fn describe_total(total: Option<usize>) -> String {
    total.map_or_else(|| "unknown".to_string(), |t| t.to_string())
}
