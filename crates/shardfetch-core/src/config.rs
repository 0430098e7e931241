use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

/// Longest delay or request interval a config may ask for.
pub const MAX_CONFIGURED_DELAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Converts configured seconds into a `Duration`, rejecting negative,
/// non-finite and oversized values.
pub(crate) fn configured_duration(what: &'static str, secs: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(secs)
        .ok()
        .filter(|d| *d <= MAX_CONFIGURED_DELAY)
        .ok_or_else(|| ConfigError::Duration {
            what,
            value: secs.to_string(),
            max_secs: MAX_CONFIGURED_DELAY.as_secs(),
        })
}

/// Retry policy parameters (`[retry]` in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per address (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            base_delay_secs: 1.0,
            max_delay_secs: 60,
        }
    }
}

/// Provider request rate (`[rate_limit]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests per second allowed on each token (0 disables spacing).
    pub requests_per_sec: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_sec: 5.0,
        }
    }
}

/// Provider endpoint and timeouts (`[provider]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base API URL; query parameters are appended per request.
    pub api_url: String,
    pub connect_timeout_secs: u64,
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.etherscan.io/api".to_string(),
            connect_timeout_secs: 15,
            timeout_secs: 60,
        }
    }
}

/// Global configuration loaded from `~/.config/shardfetch/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Concurrent in-flight requests allowed per token.
    pub token_multiplier: usize,
    /// Unpack multi-file sources next to each saved record.
    pub extract_sources: bool,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            token_multiplier: 1,
            extract_sources: true,
            retry: RetryConfig::default(),
            rate_limit: RateLimitConfig::default(),
            provider: ProviderConfig::default(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("shardfetch")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<FetchConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = FetchConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

/// Load configuration from an explicit file.
pub fn load_from_path(path: &Path) -> Result<FetchConfig> {
    let data =
        fs::read_to_string(path).with_context(|| format!("read config: {}", path.display()))?;
    let cfg: FetchConfig =
        toml::from_str(&data).with_context(|| format!("parse config: {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = FetchConfig::default();
        assert_eq!(cfg.token_multiplier, 1);
        assert!(cfg.extract_sources);
        assert_eq!(cfg.retry.max_attempts, 8);
        assert!((cfg.rate_limit.requests_per_sec - 5.0).abs() < 1e-9);
    }

    #[test]
    fn configured_duration_bounds() {
        assert_eq!(
            configured_duration("delay", 0.25).unwrap(),
            Duration::from_millis(250)
        );
        assert_eq!(configured_duration("delay", 0.0).unwrap(), Duration::ZERO);
        for bad in [-1.0, f64::NAN, f64::INFINITY, 1e300, 86_401.0] {
            assert!(
                matches!(
                    configured_duration("delay", bad),
                    Err(ConfigError::Duration { what: "delay", .. })
                ),
                "{bad} accepted"
            );
        }
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = FetchConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: FetchConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.token_multiplier, cfg.token_multiplier);
        assert_eq!(parsed.provider.api_url, cfg.provider.api_url);
        assert_eq!(parsed.retry.max_delay_secs, cfg.retry.max_delay_secs);
    }

    #[test]
    fn config_toml_sections_are_optional() {
        let toml = r#"
            token_multiplier = 3
            extract_sources = false
        "#;
        let cfg: FetchConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.token_multiplier, 3);
        assert!(!cfg.extract_sources);
        assert_eq!(cfg.retry.max_attempts, 8);
        assert_eq!(cfg.provider.timeout_secs, 60);
    }

    #[test]
    fn config_toml_custom_sections() {
        let toml = r#"
            token_multiplier = 2
            extract_sources = true

            [retry]
            max_attempts = 3
            base_delay_secs = 0.5
            max_delay_secs = 15

            [rate_limit]
            requests_per_sec = 2.5

            [provider]
            api_url = "http://127.0.0.1:9000/api"
            connect_timeout_secs = 5
            timeout_secs = 10
        "#;
        let cfg: FetchConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.retry.max_attempts, 3);
        assert!((cfg.retry.base_delay_secs - 0.5).abs() < 1e-9);
        assert!((cfg.rate_limit.requests_per_sec - 2.5).abs() < 1e-9);
        assert_eq!(cfg.provider.api_url, "http://127.0.0.1:9000/api");
        assert_eq!(cfg.provider.connect_timeout_secs, 5);
    }

    #[test]
    fn load_from_path_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "token_multiplier = \"many\"").unwrap();
        let err = load_from_path(&path).unwrap_err();
        assert!(format!("{err:#}").contains("parse config"));
    }
}
