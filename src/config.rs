//! Configuration management for Novel Ingest

use serde::Deserialize;
use std::env;
use std::time::Duration;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub storage: Option<StorageConfig>,
    pub queue: QueueConfig,
    pub relay: RelayConfig,
    pub jobs: JobConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// S3-compatible bucket used for cover images
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: Option<String>,
    /// Base URL the stored covers are served from; defaults to `{endpoint}/{bucket}`
    pub public_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    pub nats_url: Option<String>,
    pub subject: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    pub poll_interval_ms: u64,
    pub batch_size: i64,
    pub max_attempts: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobConfig {
    pub enable_code_filter: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub filter: String,
    pub format: LogFormat,
}

impl RelayConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl StorageConfig {
    pub fn public_base_url(&self) -> String {
        self.public_url
            .clone()
            .unwrap_or_else(|| {
                format!("{}/{}", self.endpoint.trim_end_matches('/'), self.bucket)
            })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database: DatabaseConfig {
                url: "sqlite:./novels.db".to_string(),
                max_connections: 5,
            },
            storage: None,
            queue: QueueConfig {
                nats_url: None,
                subject: "translation_jobs".to_string(),
            },
            relay: RelayConfig {
                poll_interval_ms: 1000,
                batch_size: 50,
                max_attempts: 10,
            },
            jobs: JobConfig {
                enable_code_filter: false,
            },
            logging: LoggingConfig {
                filter: "novel_ingest=info".to_string(),
                format: LogFormat::Pretty,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key lookup, falling back to defaults
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Config::default();

        // Media storage is optional; without a bucket covers are skipped
        let storage = match (var("S3_ENDPOINT"), var("S3_BUCKET")) {
            (Some(endpoint), Some(bucket)) => {
                let required = |key: &str| {
                    var(key).ok_or_else(|| {
                        AppError::Config(format!("{} must be set when S3_ENDPOINT and S3_BUCKET are", key))
                    })
                };
                Some(StorageConfig {
                    endpoint,
                    bucket,
                    access_key: required("S3_ACCESS_KEY")?,
                    secret_key: required("S3_SECRET_KEY")?,
                    region: var("S3_REGION"),
                    public_url: var("MEDIA_PUBLIC_URL"),
                })
            }
            _ => None,
        };

        Ok(Config {
            database: DatabaseConfig {
                url: var("DATABASE_URL").unwrap_or(defaults.database.url),
                max_connections: parse_var(&var, "DATABASE_MAX_CONNECTIONS", defaults.database.max_connections),
            },
            storage,
            queue: QueueConfig {
                nats_url: var("NATS_URL"),
                subject: var("TRANSLATION_QUEUE").unwrap_or(defaults.queue.subject),
            },
            relay: RelayConfig {
                poll_interval_ms: parse_var(&var, "OUTBOX_POLL_INTERVAL_MS", defaults.relay.poll_interval_ms),
                batch_size: parse_var(&var, "OUTBOX_BATCH_SIZE", defaults.relay.batch_size),
                max_attempts: parse_var(&var, "OUTBOX_MAX_ATTEMPTS", defaults.relay.max_attempts),
            },
            jobs: JobConfig {
                enable_code_filter: parse_var(
                    &var,
                    "TRANSLATION_ENABLE_CODE_FILTER",
                    defaults.jobs.enable_code_filter,
                ),
            },
            logging: LoggingConfig {
                filter: var("LOG_FILTER").unwrap_or(defaults.logging.filter),
                format: match var("LOG_FORMAT").unwrap_or_default().as_str() {
                    "json" => LogFormat::Json,
                    _ => LogFormat::Pretty,
                },
            },
        })
    }
}

fn parse_var<T: std::str::FromStr>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    var(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.queue.subject, "translation_jobs");
        assert_eq!(config.relay.poll_interval(), Duration::from_secs(1));
        assert!(config.storage.is_none());
    }

    #[test]
    fn test_public_base_url_falls_back_to_bucket_path() {
        let storage = StorageConfig {
            endpoint: "http://localhost:9000/".to_string(),
            bucket: "covers".to_string(),
            access_key: "admin".to_string(),
            secret_key: "secret".to_string(),
            region: None,
            public_url: None,
        };
        assert_eq!(storage.public_base_url(), "http://localhost:9000/covers");
    }

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_reads_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "sqlite://ingest.db"),
            ("OUTBOX_BATCH_SIZE", "7"),
            ("OUTBOX_MAX_ATTEMPTS", "not a number"),
            ("LOG_FORMAT", "json"),
        ]))
        .unwrap();
        assert_eq!(config.database.url, "sqlite://ingest.db");
        assert_eq!(config.relay.batch_size, 7);
        assert_eq!(config.relay.max_attempts, 10);
        assert!(matches!(config.logging.format, LogFormat::Json));
        assert!(config.storage.is_none());
    }

    #[test]
    fn test_partial_storage_settings_are_an_error() {
        let err = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "sqlite://ingest.db"),
            ("S3_ENDPOINT", "http://localhost:9000"),
            ("S3_BUCKET", "covers"),
            ("S3_SECRET_KEY", "secret"),
        ]))
        .unwrap_err();
        match err {
            AppError::Config(message) => assert!(message.contains("S3_ACCESS_KEY")),
            other => panic!("expected a configuration error, got {:?}", other),
        }
    }
}
