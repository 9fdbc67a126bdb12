use crate::config::types::{Config, CrawlerConfig, EndpointConfig, LoggingConfig, OutputConfig};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

const MAX_PAGE_LIMIT: usize = 500;
const MAX_CONCURRENCY: usize = 100;
const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_endpoint_config(&config.endpoints)?;
    validate_output_config(&config.output)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.repeat_interval_secs < 1 {
        return Err(ConfigError::Validation(
            "repeat_interval_secs must be >= 1".to_string(),
        ));
    }

    if config.page_limit < 1 || config.page_limit > MAX_PAGE_LIMIT {
        return Err(ConfigError::Validation(format!(
            "page_limit must be between 1 and {}, got {}",
            MAX_PAGE_LIMIT, config.page_limit
        )));
    }

    for (name, value) in [
        ("story_concurrency", config.story_concurrency),
        ("link_concurrency", config.link_concurrency),
    ] {
        if value < 1 || value > MAX_CONCURRENCY {
            return Err(ConfigError::Validation(format!(
                "{} must be between 1 and {}, got {}",
                name, MAX_CONCURRENCY, value
            )));
        }
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates endpoint URLs, templates and the link selector
fn validate_endpoint_config(config: &EndpointConfig) -> Result<(), ConfigError> {
    validate_http_url("top_stories_url", &config.top_stories_url)?;

    for (name, template) in [
        ("item_url_template", &config.item_url_template),
        ("comment_url_template", &config.comment_url_template),
    ] {
        if !template.contains("{id}") {
            return Err(ConfigError::Validation(format!(
                "{} must contain an {{id}} placeholder, got '{}'",
                name, template
            )));
        }
        validate_http_url(name, &template.replace("{id}", "1"))?;
    }

    if Selector::parse(&config.link_selector).is_err() {
        return Err(ConfigError::Validation(format!(
            "link_selector is not a valid CSS selector: '{}'",
            config.link_selector
        )));
    }

    Ok(())
}

fn validate_http_url(name: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", name, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} must use http or https, got '{}'",
            name, value
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.download_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "download_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates logging configuration
fn validate_logging_config(config: &LoggingConfig) -> Result<(), ConfigError> {
    let level = config.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        return Err(ConfigError::Validation(format!(
            "log_level must be one of {}, got '{}'",
            LOG_LEVELS.join(", "),
            config.log_level
        )));
    }

    Ok(())
}
