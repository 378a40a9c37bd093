use std::env;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
    #[error("Configuration errors: {}", .0.join(", "))]
    Missing(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub people_ttl: Duration,
    pub suggestions_ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub immich_url: String,
    pub immich_api_key: String,
    pub host: String,
    pub port: u16,
    pub debug: bool,
    pub cors_origins: Vec<String>,
    pub cache: CacheConfig,
}

const DEFAULT_CORS_ORIGINS: &str =
    "http://localhost:3000,http://localhost:8000,http://127.0.0.1:8000";

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup, so tests don't have to
    /// touch the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Config {
            immich_url: get("IMMICH_URL", "http://localhost:2283")
                .trim_end_matches('/')
                .to_string(),
            immich_api_key: get("IMMICH_API_KEY", ""),
            host: get("HOST", "0.0.0.0"),
            port: parse_value("PORT", &get("PORT", "8000"))?,
            debug: parse_bool("DEBUG", &get("DEBUG", "false"))?,
            cors_origins: parse_origins(&get("CORS_ORIGINS", DEFAULT_CORS_ORIGINS)),
            cache: CacheConfig {
                people_ttl: Duration::from_secs(parse_value(
                    "CACHE_TTL_PEOPLE",
                    &get("CACHE_TTL_PEOPLE", "300"),
                )?),
                suggestions_ttl: Duration::from_secs(parse_value(
                    "CACHE_TTL_SUGGESTIONS",
                    &get("CACHE_TTL_SUGGESTIONS", "600"),
                )?),
            },
        })
    }

    /// Checks that every required setting is present, reporting all of the
    /// missing ones at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.immich_url.is_empty() {
            errors.push("IMMICH_URL is required".to_string());
        }
        if self.immich_api_key.is_empty() {
            errors.push("IMMICH_API_KEY is required".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Missing(errors))
        }
    }

    pub fn default_log_level(&self) -> &'static str {
        if self.debug {
            "debug"
        } else {
            "info"
        }
    }
}

fn parse_value<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
    })
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: raw.to_string(),
        }),
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}
