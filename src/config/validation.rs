use crate::config::types::{Config, CrawlerConfig, ProxyConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
///
/// This is the check run on configuration files. The engine itself only
/// runs [`check_crawl_limits`] when a crawl starts.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    check_crawl_limits(&config.crawler)?;
    validate_crawler_config(&config.crawler)?;
    validate_proxy_config(&config.proxy)?;
    Ok(())
}

/// Rejects limits that make a crawl impossible
///
/// max_depth and max_pages are unsigned, so "negative" bounds cannot occur.
pub fn check_crawl_limits(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_retry < 1 {
        return Err(ConfigError::Validation(format!(
            "max_retry must be greater than 0, got {}",
            config.max_retry
        )));
    }

    if config.max_threads < 1 {
        return Err(ConfigError::Validation(format!(
            "max_threads must be greater than 0, got {}",
            config.max_threads
        )));
    }

    Ok(())
}

fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be at least 1 second, got {}",
            config.timeout_secs
        )));
    }

    Ok(())
}

fn validate_proxy_config(config: &ProxyConfig) -> Result<(), ConfigError> {
    if config.host.trim().is_empty() {
        return Err(ConfigError::Validation(
            "proxy host cannot be empty".to_string(),
        ));
    }

    if config.port == 0 {
        return Err(ConfigError::Validation(
            "proxy port must be non-zero".to_string(),
        ));
    }

    Url::parse(&config.ping_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid ping_url: {}", e)))?;

    Ok(())
}
