use crate::config::types::{
    BudgetConfig, Config, HttpConfig, OutputConfig, SourceConfig, SyncConfig, TraversalConfig,
};
use crate::ConfigError;
use url::Url;

/// Normalizes configuration values that have a single canonical spelling
pub fn canonicalize(config: &mut Config) {
    let base = config.source.base_url.trim().to_string();
    config.source.base_url = if base.ends_with('/') {
        base
    } else {
        format!("{}/", base)
    };

    for ext in config.source.allowed_extensions.iter_mut() {
        *ext = ext.trim().to_lowercase();
    }

    for pattern in config.source.data_name_patterns.iter_mut() {
        *pattern = pattern.trim().to_lowercase();
    }
}

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_source_config(&config.source)?;
    validate_traversal_config(&config.traversal)?;
    validate_sync_config(&config.sync)?;
    validate_budget_config(&config.budget)?;
    validate_http_config(&config.http)?;
    validate_output_config(&config.output)?;
    Ok(())
}

fn validate_source_config(config: &SourceConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "base-url '{}' must use http or https",
            config.base_url
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' has no host",
            config.base_url
        )));
    }

    if config.allowed_extensions.is_empty() {
        return Err(ConfigError::Validation(
            "allowed-extensions cannot be empty".to_string(),
        ));
    }

    for ext in &config.allowed_extensions {
        if ext.len() < 2 || !ext.starts_with('.') || ext.contains('/') {
            return Err(ConfigError::Validation(format!(
                "allowed extension '{}' must look like '.ext'",
                ext
            )));
        }
    }

    if config
        .data_name_patterns
        .iter()
        .any(|pattern| pattern.is_empty() || pattern.contains('/'))
    {
        return Err(ConfigError::Validation(
            "data-name-patterns must be non-empty and contain no '/'".to_string(),
        ));
    }

    if config.directory_names.iter().any(|name| name.contains('/')) {
        return Err(ConfigError::Validation(
            "directory-names must be single path segments".to_string(),
        ));
    }

    Ok(())
}

fn validate_traversal_config(config: &TraversalConfig) -> Result<(), ConfigError> {
    if config.max_concurrency < 1 || config.max_concurrency > 32 {
        return Err(ConfigError::Validation(format!(
            "max-concurrency must be between 1 and 32, got {}",
            config.max_concurrency
        )));
    }

    Ok(())
}

fn validate_sync_config(config: &SyncConfig) -> Result<(), ConfigError> {
    if config.concurrency < 1 || config.concurrency > 8 {
        return Err(ConfigError::Validation(format!(
            "sync concurrency must be between 1 and 8, got {}",
            config.concurrency
        )));
    }

    if config.destination_prefix.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "destination-prefix must be relative, got '{}'",
            config.destination_prefix
        )));
    }

    if config.max_files == Some(0) {
        return Err(ConfigError::Validation(
            "max-files must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

fn validate_budget_config(config: &BudgetConfig) -> Result<(), ConfigError> {
    if config.max_execution_ms == 0 {
        return Err(ConfigError::Validation(
            "max-execution-ms must be > 0".to_string(),
        ));
    }

    if config.safety_margin_ms >= config.max_execution_ms {
        return Err(ConfigError::Validation(format!(
            "safety-margin-ms ({}) must be smaller than max-execution-ms ({})",
            config.safety_margin_ms, config.max_execution_ms
        )));
    }

    Ok(())
}

fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs == 0 || config.download_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "HTTP timeouts must be > 0".to_string(),
        ));
    }

    if config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max-retries must be <= 10, got {}",
            config.max_retries
        )));
    }

    if !config.backoff_factor.is_finite() || config.backoff_factor < 0.0 {
        return Err(ConfigError::Validation(format!(
            "backoff-factor must be a non-negative number, got {}",
            config.backoff_factor
        )));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    if matches!(&config.summary_path, Some(p) if p.is_empty()) {
        return Err(ConfigError::Validation(
            "summary-path cannot be empty when set".to_string(),
        ));
    }

    Ok(())
}
