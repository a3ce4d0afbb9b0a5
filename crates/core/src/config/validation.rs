//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use std::collections::HashSet;

use crate::config::{AppConfig, CacheConfig};
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    /// - any cache setting is rejected by [`CacheConfig::validate`]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 50MB".into() });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        self.cache.validate()
    }
}

impl CacheConfig {
    /// Validate cache naming, routing prefixes and the manifest.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `version` is empty
    /// - `origin` is not an absolute http(s) URL
    /// - a cache base name is empty or two base names collide
    /// - a routing prefix or reserved path does not start with `/`
    /// - `offline_data_key` lies outside `offline_data_prefix`
    ///
    /// Returns `ConfigError::Missing` if the manifest lacks the offline page.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version.trim().is_empty() {
            return Err(ConfigError::Invalid { field: "cache.version".into(), reason: "must not be empty".into() });
        }

        let origin = self.origin_url()?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                field: "cache.origin".into(),
                reason: format!("unsupported scheme: {}", origin.scheme()),
            });
        }

        let names = [
            ("cache.shell_cache", &self.shell_cache),
            ("cache.dynamic_cache", &self.dynamic_cache),
            ("cache.offline_data_cache", &self.offline_data_cache),
        ];
        let mut seen = HashSet::new();
        for (field, name) in names {
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid { field: field.into(), reason: "must not be empty".into() });
            }
            if !seen.insert(name.as_str()) {
                let reason = format!("duplicate cache name: {name}");
                return Err(ConfigError::Invalid { field: field.into(), reason });
            }
        }

        let paths = [
            ("cache.static_prefix", &self.static_prefix),
            ("cache.offline_data_prefix", &self.offline_data_prefix),
            ("cache.offline_data_key", &self.offline_data_key),
            ("cache.offline_page", &self.offline_page),
        ];
        for (field, path) in paths {
            if !path.starts_with('/') {
                return Err(ConfigError::Invalid { field: field.into(), reason: "must start with '/'".into() });
            }
        }

        if !self.offline_data_key.starts_with(&self.offline_data_prefix) {
            return Err(ConfigError::Invalid {
                field: "cache.offline_data_key".into(),
                reason: format!("must live under {}", self.offline_data_prefix),
            });
        }

        if !self.manifest.iter().any(|u| u == &self.offline_page) {
            return Err(ConfigError::Missing {
                field: "cache.manifest".into(),
                hint: format!("add {} so the offline document is cached at install", self.offline_page),
            });
        }

        if self.allowed_cdn_hosts.is_empty() {
            tracing::warn!("allowed_cdn_hosts is empty; cross-origin assets will be treated as dynamic requests");
        }

        Ok(())
    }
}
