use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Prefix for nested environment overrides, e.g. `IMGUP_SERVER__PORT=8080`.
pub const ENV_PREFIX: &str = "IMGUP_";

/// Flat environment names understood for compatibility with older deployments.
const LEGACY_ENV_KEYS: &[(&str, &str)] = &[
    ("PORT", "server.port"),
    ("HOST_URL", "server.public_url"),
    ("DB_PATH", "database.path"),
    ("PROCESS_DIR", "storage.process_root"),
    ("REALCUGAN_PATH", "upscaler.executable"),
    ("MODELS_PATH", "upscaler.models_dir"),
    ("CONCURRENCY_QUEUE", "queue.concurrency"),
    ("DOWNLOAD_CONCURRENCY", "fetcher.concurrency"),
    ("UPSCALE_CONCURRENCY", "upscaler.concurrency"),
];

fn legacy_key(name: &str) -> Option<&'static str> {
    LEGACY_ENV_KEYS
        .iter()
        .find(|(legacy, _)| legacy.eq_ignore_ascii_case(name))
        .map(|(_, nested)| *nested)
}

fn legacy_env() -> Env {
    let names: Vec<&str> = LEGACY_ENV_KEYS.iter().map(|(legacy, _)| *legacy).collect();
    Env::raw()
        .only(&names)
        .map(|key| match legacy_key(key.as_str()) {
            Some(nested) => nested.into(),
            None => key.as_str().into(),
        })
}

fn with_env(figment: Figment) -> Figment {
    figment
        .merge(legacy_env())
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let figment = with_env(
        Figment::from(Serialized::defaults(Config::default())).merge(Toml::file(path)),
    );

    figment
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Load configuration from defaults and environment variables only
pub fn load_config_from_env() -> Result<Config, ConfigError> {
    with_env(Figment::from(Serialized::defaults(Config::default())))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}
