use crate::ConfigError;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Main configuration structure for Ladle
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub portal: PortalConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CrawlerConfig {
    /// Number of breadth-first expansion steps after the seed level
    pub recursion_depth: u32,

    /// Fetch identifiers even when the index already contains them
    pub force_all: bool,

    /// Only record the seed identifiers in the index, never fetch
    pub index_only: bool,

    /// Minimum spacing between outbound requests
    pub rate_limit: RateLimit,

    /// Attempts per resource before giving up on it
    pub max_fetch_attempts: u32,

    /// Number of concurrent fetch workers within a level
    pub worker_pool_size: usize,

    /// Comments to load per recipe (0 = none, negative = all)
    pub comment_fetch_count: i64,

    /// Number of results to collect per search term
    pub search_result_count: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            recursion_depth: 0,
            force_all: false,
            index_only: false,
            rate_limit: RateLimit::default(),
            max_fetch_attempts: crate::crawler::DEFAULT_MAX_ATTEMPTS,
            worker_pool_size: 8,
            comment_fetch_count: 100,
            search_result_count: 30,
        }
    }
}

/// Addresses of the recipe portal
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PortalConfig {
    /// Root of the HTML pages (recipes, search, feeds)
    pub base_url: String,

    /// Root of the JSON API (comments)
    pub api_url: String,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.chefkoch.de".to_string(),
            api_url: "https://api.chefkoch.de".to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct OutputConfig {
    /// Folder receiving one JSON file per recipe and the index
    pub folder: PathBuf,

    /// File name of the deduplication index inside `folder`
    pub index_file: String,
}

impl OutputConfig {
    /// Full path of the deduplication index
    pub fn index_path(&self) -> PathBuf {
        self.folder.join(&self.index_file)
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            folder: PathBuf::from("crawl"),
            index_file: "index.dat".to_string(),
        }
    }
}

/// Delay between two outbound requests, in fractional seconds
///
/// A range is re-sampled uniformly for every request.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "RawRateLimit")]
pub enum RateLimit {
    Fixed(f64),
    Range { min: f64, max: f64 },
}

impl Default for RateLimit {
    fn default() -> Self {
        RateLimit::Range { min: 0.1, max: 0.5 }
    }
}

impl RateLimit {
    /// Builds a fixed limit, rejecting negative, non-finite or oversized values
    pub fn fixed(seconds: f64) -> Result<Self, ConfigError> {
        check_seconds(seconds)?;
        Ok(RateLimit::Fixed(seconds))
    }

    /// Builds a range limit, rejecting inverted or invalid bounds
    pub fn range(min: f64, max: f64) -> Result<Self, ConfigError> {
        check_seconds(min)?;
        check_seconds(max)?;
        if min > max {
            return Err(ConfigError::InvalidRateLimit(format!(
                "lower bound {} exceeds upper bound {}",
                min, max
            )));
        }
        Ok(RateLimit::Range { min, max })
    }

    /// Re-checks the bounds; values built through serde or `FromStr` already pass
    pub fn check(&self) -> Result<(), ConfigError> {
        match *self {
            RateLimit::Fixed(s) => Self::fixed(s).map(|_| ()),
            RateLimit::Range { min, max } => Self::range(min, max).map(|_| ()),
        }
    }
}

/// Longest delay accepted between two requests
const MAX_DELAY_SECONDS: f64 = 3600.0;

fn check_seconds(seconds: f64) -> Result<(), ConfigError> {
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(ConfigError::InvalidRateLimit(format!(
            "delay must be a non-negative number of seconds, got {}",
            seconds
        )));
    }
    if seconds > MAX_DELAY_SECONDS {
        return Err(ConfigError::InvalidRateLimit(format!(
            "delay of {}s exceeds the maximum of {}s",
            seconds, MAX_DELAY_SECONDS
        )));
    }
    Ok(())
}

impl FromStr for RateLimit {
    type Err = ConfigError;

    /// Accepts `"0.2"`, `"0.1,0.5"` and `"[0.1,0.5]"`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let inner = trimmed
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .unwrap_or(trimmed);

        let parse = |part: &str| {
            part.trim()
                .parse::<f64>()
                .map_err(|_| ConfigError::InvalidRateLimit(format!("malformed value '{}'", s)))
        };

        match inner.split_once(',') {
            Some((min, max)) => RateLimit::range(parse(min)?, parse(max)?),
            None => RateLimit::fixed(parse(inner)?),
        }
    }
}

impl fmt::Display for RateLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateLimit::Fixed(s) => write!(f, "{}s", s),
            RateLimit::Range { min, max } => write!(f, "{}s to {}s", min, max),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRateLimit {
    Seconds(f64),
    Bounds(Vec<f64>),
    Text(String),
}

impl TryFrom<RawRateLimit> for RateLimit {
    type Error = ConfigError;

    fn try_from(raw: RawRateLimit) -> Result<Self, Self::Error> {
        match raw {
            RawRateLimit::Seconds(s) => RateLimit::fixed(s),
            RawRateLimit::Bounds(bounds) => match bounds.as_slice() {
                [fixed] => RateLimit::fixed(*fixed),
                [min, max] => RateLimit::range(*min, *max),
                _ => Err(ConfigError::InvalidRateLimit(format!(
                    "expected one or two bounds, got {}",
                    bounds.len()
                ))),
            },
            RawRateLimit::Text(text) => text.parse(),
        }
    }
}
