use crate::config::types::{
    ClientConfig, Config, HarvesterConfig, ListingConfig, OutputConfig, SiteConfig,
    PAGE_PLACEHOLDER,
};
use crate::ConfigError;
use url::Url;

const MAX_WORKERS: usize = 1000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_harvester_config(&config.harvester)?;
    validate_client_config(&config.client)?;
    validate_site_config(&config.site)?;
    validate_listings(&config.listings)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates harvester configuration
fn validate_harvester_config(config: &HarvesterConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > MAX_WORKERS {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and {}, got {}",
            MAX_WORKERS, config.workers
        )));
    }

    if config.batch_size < 1 {
        return Err(ConfigError::Validation(format!(
            "batch_size must be >= 1, got {}",
            config.batch_size
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs must be >= 1, got {}",
            config.request_timeout_secs
        )));
    }

    Ok(())
}

/// Validates HTTP client configuration
fn validate_client_config(config: &ClientConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.connect_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "connect_timeout_secs must be >= 1, got {}",
            config.connect_timeout_secs
        )));
    }

    Ok(())
}

/// Validates the site base URL
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    validate_http_url(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))
}

/// Validates listing templates and page bounds
fn validate_listings(listings: &[ListingConfig]) -> Result<(), ConfigError> {
    if listings.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[listing]] entry is required".to_string(),
        ));
    }

    for listing in listings {
        let placeholders = listing.template.matches(PAGE_PLACEHOLDER).count();
        if placeholders != 1 {
            return Err(ConfigError::InvalidTemplate(format!(
                "template '{}' must contain '{}' exactly once, found {}",
                listing.template, PAGE_PLACEHOLDER, placeholders
            )));
        }

        let sample = listing.template.replace(PAGE_PLACEHOLDER, "1");
        validate_http_url(&sample).map_err(|e| {
            ConfigError::InvalidTemplate(format!("template '{}': {}", listing.template, e))
        })?;

        if listing.pages < 1 {
            return Err(ConfigError::Validation(format!(
                "listing '{}' must request at least one page",
                listing.template
            )));
        }
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.dataset_path.is_empty() {
        return Err(ConfigError::Validation(
            "dataset_path cannot be empty".to_string(),
        ));
    }

    for (name, path) in [
        ("failure_log_path", &config.failure_log_path),
        ("database_path", &config.database_path),
        ("summary_path", &config.summary_path),
    ] {
        if matches!(path, Some(p) if p.is_empty()) {
            return Err(ConfigError::Validation(format!(
                "{} cannot be empty when set",
                name
            )));
        }
    }

    Ok(())
}

/// Accepts absolute http(s) URLs that carry a host
fn validate_http_url(raw: &str) -> Result<(), String> {
    let url = Url::parse(raw).map_err(|e| format!("'{}': {}", raw, e))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(format!("'{}' must use http or https", raw));
    }

    if url.host_str().is_none() {
        return Err(format!("'{}' has no host", raw));
    }

    Ok(())
}
