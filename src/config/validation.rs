use crate::config::types::{
    Config, CrawlConfig, DuplicateConfig, OutputConfig, RateLimitConfig, UserAgentConfig,
    WireConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_wire_config(&config.wire)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_crawl_config(&config.crawl)?;
    validate_rate_limit_config(&config.rate_limit)?;
    validate_duplicate_config(&config.duplicates)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates wire API settings
fn validate_wire_config(config: &WireConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' must use http or https",
            config.base_url
        )));
    }

    if config.username.is_empty() {
        return Err(ConfigError::Validation(
            "wire username cannot be empty".to_string(),
        ));
    }

    if config.document_format.is_empty()
        || !config
            .document_format
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "document_format must be a non-empty token, got '{}'",
            config.document_format
        )));
    }

    Ok(())
}

/// Validates crawl cycle configuration
pub fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.interval_minutes < 1 {
        return Err(ConfigError::Validation(format!(
            "interval_minutes must be >= 1, got {}",
            config.interval_minutes
        )));
    }

    if config.categories.is_empty() {
        return Err(ConfigError::Validation(
            "at least one category must be configured".to_string(),
        ));
    }

    if config.batch_size < 1 || config.batch_size > 100 {
        return Err(ConfigError::Validation(format!(
            "batch_size must be between 1 and 100, got {}",
            config.batch_size
        )));
    }

    for key in config.languages.keys() {
        if key.parse::<i64>().is_err() {
            return Err(ConfigError::Validation(format!(
                "languages table key '{}' is not a category code",
                key
            )));
        }
    }

    if config.source.trim().is_empty() {
        return Err(ConfigError::Validation(
            "source cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates wire pacing
fn validate_rate_limit_config(config: &RateLimitConfig) -> Result<(), ConfigError> {
    if config.max_items_per_request < 1 || config.max_items_per_request > 100 {
        return Err(ConfigError::Validation(format!(
            "max_items_per_request must be between 1 and 100, got {}",
            config.max_items_per_request
        )));
    }

    if config.max_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be >= 1, got {}",
            config.max_retries
        )));
    }

    Ok(())
}

/// Validates similarity scan settings
fn validate_duplicate_config(config: &DuplicateConfig) -> Result<(), ConfigError> {
    if config.threshold < 1 || config.threshold > 100 {
        return Err(ConfigError::Validation(format!(
            "duplicate threshold must be between 1 and 100, got {}",
            config.threshold
        )));
    }

    if config.scan_limit < 2 {
        return Err(ConfigError::Validation(format!(
            "scan_limit must be >= 2, got {}",
            config.scan_limit
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.recent_errors < 1 {
        return Err(ConfigError::Validation(
            "recent_errors must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::SaveStrategy;
    use std::collections::BTreeMap;

    fn crawl_config() -> CrawlConfig {
        CrawlConfig {
            interval_minutes: 15,
            categories: vec![1, 4],
            languages: BTreeMap::new(),
            default_languages: vec![1],
            auto_publish: false,
            enable_ai: false,
            enable_duplicate_check: true,
            enable_photo_search: false,
            batch_size: 20,
            save_strategy: SaveStrategy::Skip,
            run_immediately: true,
            source: "AA".to_string(),
        }
    }

    #[test]
    fn test_validate_crawl_config() {
        assert!(validate_crawl_config(&crawl_config()).is_ok());

        let mut zero_interval = crawl_config();
        zero_interval.interval_minutes = 0;
        assert!(validate_crawl_config(&zero_interval).is_err());

        let mut no_categories = crawl_config();
        no_categories.categories.clear();
        assert!(validate_crawl_config(&no_categories).is_err());

        let mut huge_batch = crawl_config();
        huge_batch.batch_size = 101;
        assert!(validate_crawl_config(&huge_batch).is_err());

        let mut bad_key = crawl_config();
        bad_key.languages.insert("health".to_string(), vec![1]);
        assert!(validate_crawl_config(&bad_key).is_err());
    }

    #[test]
    fn test_validate_duplicate_config() {
        assert!(validate_duplicate_config(&DuplicateConfig::default()).is_ok());
        assert!(validate_duplicate_config(&DuplicateConfig {
            threshold: 0,
            scan_limit: 100
        })
        .is_err());
        assert!(validate_duplicate_config(&DuplicateConfig {
            threshold: 101,
            scan_limit: 100
        })
        .is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("desk@news.example.com").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("invalid").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("user@").is_err());
        assert!(validate_email("user@domain").is_err());
        assert!(validate_email("a@b@c.com").is_err());
    }
}
