use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Configuration loading error: {0}")]
    ConfigLoad(#[from] ConfigError),
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

pub type Result<T> = std::result::Result<T, ConfigurationError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GardenConfig {
    /// Etherscan transfer-history API configuration
    pub etherscan: EtherscanConfig,

    /// ENS reverse-lookup configuration
    pub ens: EnsConfig,

    /// Redis configuration
    pub redis: RedisConfig,

    /// Urlbox screenshot capture configuration
    pub urlbox: UrlboxConfig,

    /// OpenSea listing refresh configuration
    pub opensea: OpenSeaConfig,

    /// IPFS pinning configuration (queue consumer)
    pub ipfs: IpfsConfig,

    /// Screenshot refresh queue configuration
    pub queue: QueueConfig,

    /// Site-level settings (URL templates, garden contract)
    pub site: SiteConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EtherscanConfig {
    /// Etherscan API key
    pub api_key: String,

    /// Etherscan API base URL
    pub api_base_url: String,

    /// Network name used in log context (e.g. "homestead")
    pub network: String,

    /// Transfers per page; Etherscan serves at most 1000
    pub page_size: u32,

    /// Hard pagination cap; Etherscan refuses to serve beyond 10 pages
    pub max_pages: u32,

    /// Request timeout in seconds
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsConfig {
    /// ENS resolution API base URL
    pub api_base_url: String,

    /// Request timeout in seconds
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlboxConfig {
    /// Urlbox API key
    pub api_key: String,

    /// Urlbox render base URL
    pub api_base_url: String,

    /// Request timeout in seconds; renders are slow
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenSeaConfig {
    /// OpenSea API base URL
    pub api_base_url: String,

    /// OpenSea API key (optional for the force-update endpoint)
    pub api_key: Option<String>,

    /// Request timeout in seconds
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpfsConfig {
    /// Infura IPFS project id
    pub project_id: String,

    /// Infura IPFS project secret
    pub project_secret: String,

    /// IPFS HTTP API base URL
    pub api_base_url: String,

    /// Public gateway prefix for pinned content
    pub gateway_url: String,

    /// Request timeout in seconds
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Delay before the first screenshot-apply attempt (e.g. "30s")
    pub initial_delay: String,

    /// Ordered retry ladder walked on successive failures
    pub retry_schedule: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Website base URL used for image / external_url templates
    pub website_url: String,
}

impl Default for GardenConfig {
    fn default() -> Self {
        Self {
            etherscan: EtherscanConfig {
                api_key: "".to_string(), // Must be set in .env or config file
                api_base_url: "https://api.etherscan.io/api".to_string(),
                network: "homestead".to_string(),
                page_size: 1000,
                max_pages: 10,
                request_timeout_seconds: 30,
            },
            ens: EnsConfig {
                api_base_url: "https://api.ensideas.com".to_string(),
                request_timeout_seconds: 10,
            },
            redis: RedisConfig {
                url: "redis://127.0.0.1:6379".to_string(),
            },
            urlbox: UrlboxConfig {
                api_key: "".to_string(),
                api_base_url: "https://api.urlbox.io/v1".to_string(),
                request_timeout_seconds: 90,
            },
            opensea: OpenSeaConfig {
                api_base_url: "https://api.opensea.io".to_string(),
                api_key: None,
                request_timeout_seconds: 15,
            },
            ipfs: IpfsConfig {
                project_id: "".to_string(),
                project_secret: "".to_string(),
                api_base_url: "https://ipfs.infura.io:5001".to_string(),
                gateway_url: "https://ipfs.infura.io/ipfs/".to_string(),
                request_timeout_seconds: 60,
            },
            queue: QueueConfig {
                initial_delay: "30s".to_string(),
                retry_schedule: vec![
                    "15s", "30s", "1m", "5m", "10m", "30m", "1h", "2h", "4h",
                ]
                .into_iter()
                .map(String::from)
                .collect(),
            },
            site: SiteConfig {
                website_url: "tokengarden.art".to_string(),
            },
        }
    }
}

impl EtherscanConfig {
    pub fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(ConfigurationError::InvalidValue(
                "Etherscan API key is required".to_string(),
            ));
        }

        if self.page_size == 0 {
            return Err(ConfigurationError::InvalidValue(
                "Etherscan page size must be greater than 0".to_string(),
            ));
        }

        if self.max_pages == 0 {
            return Err(ConfigurationError::InvalidValue(
                "Etherscan max pages must be greater than 0".to_string(),
            ));
        }

        if self.request_timeout_seconds == 0 {
            return Err(ConfigurationError::InvalidValue(
                "Request timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl QueueConfig {
    /// Initial delay as a typed duration
    pub fn initial_delay(&self) -> Result<Duration> {
        parse_duration(&self.initial_delay)
    }

    /// Retry ladder as typed durations, in order
    pub fn retry_schedule(&self) -> Result<Vec<Duration>> {
        self.retry_schedule.iter().map(|s| parse_duration(s)).collect()
    }

    pub fn validate(&self) -> Result<()> {
        self.initial_delay()?;
        self.retry_schedule()?;
        Ok(())
    }
}

impl GardenConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path("config.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let mut config_builder = Config::builder()
            // Start with defaults
            .add_source(Config::try_from(&GardenConfig::default())?);

        // Add config file if it exists
        if config_path.as_ref().exists() {
            info!(
                "Loading configuration from: {}",
                config_path.as_ref().display()
            );
            config_builder = config_builder.add_source(File::from(config_path.as_ref()));
        } else {
            debug!("Config file not found, using defaults and environment variables");
        }

        // Add environment variables with prefix
        config_builder = config_builder.add_source(
            Environment::with_prefix("GARDEN")
                .try_parsing(true)
                .separator("__")
                .list_separator(","),
        );

        let config = config_builder.build()?;
        let garden_config: GardenConfig = config.try_deserialize()?;

        garden_config.validate()?;

        Ok(garden_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.etherscan.validate()?;
        self.queue.validate()?;

        if self.redis.url.is_empty() {
            return Err(ConfigurationError::InvalidValue(
                "Redis URL is required".to_string(),
            ));
        }

        if self.site.website_url.is_empty() {
            return Err(ConfigurationError::InvalidValue(
                "Website URL is required".to_string(),
            ));
        }

        Ok(())
    }

    /// Get configuration as a JSON value for diagnostics
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Parse a duration string like "30s", "5m", "2h" into a typed duration.
///
/// The retry ladder was historically encoded as literal strings; they are
/// parsed once at startup so the scheduler only ever sees `Duration`s.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let trimmed = input.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| {
            ConfigurationError::InvalidValue(format!("duration '{}' has no unit", input))
        })?;

    let (value, unit) = trimmed.split_at(split);
    let value: u64 = value.parse().map_err(|_| {
        ConfigurationError::InvalidValue(format!("duration '{}' has no numeric value", input))
    })?;

    let duration = match unit {
        "ms" => Duration::from_millis(value),
        "s" => Duration::from_secs(value),
        "m" => Duration::from_secs(value * 60),
        "h" => Duration::from_secs(value * 3600),
        other => {
            return Err(ConfigurationError::InvalidValue(format!(
                "unknown duration unit '{}' in '{}'",
                other, input
            )))
        }
    };

    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_duration_units() {
        assert_eq!(parse_duration("15s").unwrap(), Duration::from_secs(15));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
    }

    #[test]
    fn rejects_malformed_durations() {
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("10d").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn default_retry_ladder_parses() {
        let config = GardenConfig::default();
        let ladder = config.queue.retry_schedule().unwrap();
        assert_eq!(ladder.len(), 9);
        assert_eq!(ladder[0], Duration::from_secs(15));
        assert_eq!(ladder[8], Duration::from_secs(4 * 3600));
        assert_eq!(config.queue.initial_delay().unwrap(), Duration::from_secs(30));
    }

    #[test]
    fn validation_requires_api_key() {
        let mut config = GardenConfig::default();
        assert!(config.validate().is_err());

        config.etherscan.api_key = "key".to_string();
        assert!(config.validate().is_ok());
    }
}
