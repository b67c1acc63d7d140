use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0 and a public URL is set
/// - Every concurrency limit and timeout is non-zero
/// - The proxy, when present, is a usable proxy URL
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.server.public_url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "server.public_url cannot be empty".to_string(),
        ));
    }

    for (name, value) in [
        ("queue.concurrency", config.queue.concurrency),
        ("fetcher.concurrency", config.fetcher.concurrency),
        ("upscaler.concurrency", config.upscaler.concurrency),
    ] {
        if value == 0 {
            return Err(ConfigError::ValidationError(format!(
                "{} must be at least 1",
                name
            )));
        }
    }

    if config.fetcher.timeout_secs == 0 || config.upscaler.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "timeouts must be at least 1 second".to_string(),
        ));
    }

    if let Some(ref proxy) = config.fetcher.proxy {
        reqwest::Proxy::all(proxy.as_str()).map_err(|e| {
            ConfigError::ValidationError(format!("fetcher.proxy is invalid: {}", e))
        })?;
    }

    Ok(())
}
