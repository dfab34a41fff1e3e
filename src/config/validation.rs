use crate::config::types::{Config, CrawlerConfig, OutputConfig, PortalConfig};
use crate::ConfigError;
use url::Url;

/// Upper bound on concurrent fetch workers
const MAX_WORKER_POOL_SIZE: usize = 64;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_portal_config(&config.portal)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.worker_pool_size < 1 || config.worker_pool_size > MAX_WORKER_POOL_SIZE {
        return Err(ConfigError::Validation(format!(
            "worker_pool_size must be between 1 and {}, got {}",
            MAX_WORKER_POOL_SIZE, config.worker_pool_size
        )));
    }

    if config.max_fetch_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max_fetch_attempts must be >= 1, got {}",
            config.max_fetch_attempts
        )));
    }

    config.rate_limit.check()?;

    Ok(())
}

/// Validates portal addresses
fn validate_portal_config(config: &PortalConfig) -> Result<(), ConfigError> {
    validate_http_url("base_url", &config.base_url)?;
    validate_http_url("api_url", &config.api_url)?;
    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.folder.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output folder cannot be empty".to_string(),
        ));
    }

    if config.index_file.is_empty() || config.index_file.contains(['/', '\\']) {
        return Err(ConfigError::Validation(format!(
            "index_file must be a plain file name, got '{}'",
            config.index_file
        )));
    }

    Ok(())
}

fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} must use http or https, got '{}'",
            field, value
        )));
    }

    Ok(())
}
