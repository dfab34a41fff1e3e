//! Crawl coordinator - breadth-first orchestration
//!
//! The coordinator walks the portal one level at a time:
//! - Dispatching the identifiers of a level onto a bounded worker pool
//! - Skipping identifiers the index already knows (unless forced)
//! - Persisting each fetched recipe and recording it in the index
//! - Collecting related identifiers into the next level
//!
//! A level is fully drained before the next one is built, so nothing
//! discovered at depth `n` is fetched while depth `n` is still running.

use crate::config::Config;
use crate::crawler::fetcher::{FetchError, FetchOutcome, Fetcher};
use crate::crawler::rate_limiter::RateLimiter;
use crate::crawler::seeds::{resolve_seeds, SeedSource};
use crate::crawler::shutdown::Shutdown;
use crate::crawler::transport::HttpTransport;
use crate::index::DedupIndex;
use crate::output::{JsonFileSink, RecordSink};
use crate::parser::{PageParser, RecipePageParser};
use crate::portal::Portal;
use crate::LadleError;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Totals of a finished crawl
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    /// Recipes fetched, persisted and recorded in the index
    pub fetched: usize,

    /// Identifiers skipped because the index already held them
    pub skipped: usize,

    /// Identifiers whose fetch or parse failed
    pub failed: usize,

    /// Recipes not recorded because of a write failure or shutdown
    pub discarded: usize,

    /// Levels that were dispatched
    pub levels: u32,

    /// Whether the crawl stopped because of an interrupt
    pub interrupted: bool,
}

/// What one worker made of its identifier
#[derive(Debug)]
enum WorkerOutcome {
    Fetched { related: Vec<String> },
    Failed,
    Discarded { related: Vec<String> },
}

/// Everything a worker task needs, shared by all tasks of a run
struct Worker {
    fetcher: Arc<Fetcher>,
    portal: Arc<Portal>,
    parser: Arc<dyn PageParser>,
    sink: Arc<dyn RecordSink>,
    index: Arc<DedupIndex>,
    shutdown: Shutdown,
    comment_fetch_count: i64,
}

impl Worker {
    async fn process(&self, id: String) -> WorkerOutcome {
        let outcome = self
            .fetcher
            .fetch_recipe(
                &id,
                &self.portal,
                self.parser.as_ref(),
                self.comment_fetch_count,
            )
            .await;

        let record = match outcome {
            FetchOutcome::Fetched(record) => record,
            FetchOutcome::Failed {
                error: error @ FetchError::Interrupted { .. },
                ..
            } => {
                tracing::debug!("{}", error);
                return WorkerOutcome::Discarded {
                    related: Vec::new(),
                };
            }
            FetchOutcome::Failed { id, .. } => {
                tracing::debug!("Skipping {} after failed fetch", id);
                return WorkerOutcome::Failed;
            }
        };

        if self.shutdown.is_triggered() {
            tracing::debug!("Discarding {} fetched during shutdown", id);
            return WorkerOutcome::Discarded {
                related: Vec::new(),
            };
        }

        if let Err(e) = self.sink.persist(&record) {
            tracing::error!("Failed to write recipe {}: {}", id, e);
            return WorkerOutcome::Discarded {
                related: record.related,
            };
        }

        if let Err(e) = self.index.add(&id) {
            tracing::warn!("Recipe {} written but not indexed: {}", id, e);
            return WorkerOutcome::Discarded {
                related: record.related,
            };
        }

        tracing::info!(
            "Fetched {} ({} related, {} comments)",
            id,
            record.related.len(),
            record.comment_count
        );
        WorkerOutcome::Fetched {
            related: record.related,
        }
    }
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    index: Arc<DedupIndex>,
    fetcher: Arc<Fetcher>,
    portal: Arc<Portal>,
    parser: Arc<dyn PageParser>,
    sink: Arc<dyn RecordSink>,
    shutdown: Shutdown,
}

impl Coordinator {
    /// Creates a coordinator with the HTML recipe parser and JSON file output
    ///
    /// The rate limiter built here is the only one of the run; every request
    /// the coordinator issues, seeds and comments included, passes through it.
    pub fn new(
        config: Arc<Config>,
        index: Arc<DedupIndex>,
        transport: Arc<dyn HttpTransport>,
        shutdown: Shutdown,
    ) -> Self {
        let limiter = Arc::new(RateLimiter::new(config.crawler.rate_limit));
        let fetcher = Fetcher::new(
            transport,
            limiter,
            config.crawler.max_fetch_attempts,
            shutdown.clone(),
        );

        Self {
            portal: Arc::new(Portal::from_config(&config.portal)),
            sink: Arc::new(JsonFileSink::new(config.output.folder.clone())),
            parser: Arc::new(RecipePageParser),
            fetcher: Arc::new(fetcher),
            config,
            index,
            shutdown,
        }
    }

    /// Replaces the page parser
    pub fn with_parser(mut self, parser: Arc<dyn PageParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Replaces the record sink
    pub fn with_sink(mut self, sink: Arc<dyn RecordSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn index(&self) -> &DedupIndex {
        &self.index
    }

    /// Resolves a seed source into the identifiers of level 0
    pub async fn resolve_seeds(&self, source: &SeedSource) -> Result<Vec<String>, LadleError> {
        resolve_seeds(
            source,
            &self.fetcher,
            &self.portal,
            self.config.crawler.search_result_count,
        )
        .await
    }

    /// Runs the crawl from the given level-0 identifiers
    ///
    /// Per-recipe failures never surface here; they are counted in the
    /// report. In index-only mode the seeds are recorded without any fetch.
    pub async fn run(&self, seeds: Vec<String>) -> Result<CrawlReport, LadleError> {
        if self.config.crawler.index_only {
            return self.index_seeds(&seeds);
        }

        let start_time = Instant::now();
        let max_depth = self.config.crawler.recursion_depth;
        let worker = Arc::new(Worker {
            fetcher: Arc::clone(&self.fetcher),
            portal: Arc::clone(&self.portal),
            parser: Arc::clone(&self.parser),
            sink: Arc::clone(&self.sink),
            index: Arc::clone(&self.index),
            shutdown: self.shutdown.clone(),
            comment_fetch_count: self.config.crawler.comment_fetch_count,
        });

        let mut report = CrawlReport::default();
        let mut level = seeds;
        let mut depth = 0;

        while !level.is_empty() {
            tracing::info!("Level {}: {} identifiers", depth, level.len());
            report.levels += 1;

            let related = self.run_level(&worker, &level, depth, &mut report).await;

            if self.shutdown.is_triggered() {
                tracing::warn!("Crawl interrupted after level {}", depth);
                report.interrupted = true;
                break;
            }
            if depth >= max_depth {
                break;
            }

            level = related;
            depth += 1;
        }

        tracing::info!(
            "Crawl finished: {} fetched, {} skipped, {} failed, {} discarded in {:?}",
            report.fetched,
            report.skipped,
            report.failed,
            report.discarded,
            start_time.elapsed()
        );

        Ok(report)
    }

    /// Dispatches one level and waits for every worker to finish
    ///
    /// Returns the related identifiers of the level's successful fetches.
    async fn run_level(
        &self,
        worker: &Arc<Worker>,
        level: &[String],
        depth: u32,
        report: &mut CrawlReport,
    ) -> Vec<String> {
        let semaphore = Arc::new(Semaphore::new(self.config.crawler.worker_pool_size.max(1)));
        let mut tasks = JoinSet::new();
        let mut dispatched = HashSet::new();

        for id in level {
            if !dispatched.insert(id.as_str()) {
                continue;
            }

            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                break;
            };

            if self.shutdown.is_triggered() {
                tracing::debug!("Shutdown requested, no further dispatch");
                break;
            }

            if !self.config.crawler.force_all && self.index.contains(id) {
                if depth == 0 {
                    tracing::warn!("Recipe {} is already in the index, skipping", id);
                } else {
                    tracing::debug!("Recipe {} is already in the index, skipping", id);
                }
                report.skipped += 1;
                continue;
            }

            let worker = Arc::clone(worker);
            let id = id.clone();
            tasks.spawn(async move {
                let _permit = permit;
                worker.process(id).await
            });
        }

        let mut related = Vec::new();
        let mut completed = 0;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(WorkerOutcome::Fetched { related: ids }) => {
                    report.fetched += 1;
                    related.extend(ids);
                }
                Ok(WorkerOutcome::Failed) => report.failed += 1,
                Ok(WorkerOutcome::Discarded { related: ids }) => {
                    report.discarded += 1;
                    related.extend(ids);
                }
                Err(e) => {
                    tracing::error!("Worker task failed: {}", e);
                    report.failed += 1;
                }
            }

            completed += 1;
            if completed % 10 == 0 {
                tracing::info!(
                    "Progress: level {}, {} recipes done, {} in flight",
                    depth,
                    completed,
                    tasks.len()
                );
            }
        }

        related
    }

    fn index_seeds(&self, seeds: &[String]) -> Result<CrawlReport, LadleError> {
        let mut added = 0;
        for id in seeds {
            if self.index.add(id)? {
                added += 1;
            }
        }

        tracing::info!(
            "Index-only run: {} of {} identifiers were new",
            added,
            seeds.len()
        );

        Ok(CrawlReport {
            skipped: seeds.len() - added,
            ..CrawlReport::default()
        })
    }
}
