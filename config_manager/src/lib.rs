use config::{Config, ConfigError, Environment, File};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Configuration loading error: {0}")]
    ConfigLoad(#[from] ConfigError),
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

pub type Result<T> = std::result::Result<T, ConfigurationError>;

/// Supported price windows, in the short form price sources understand
pub const SUPPORTED_TIMEFRAMES: &[&str] = &["live", "1d", "1w", "1m", "3m", "1y", "all"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SystemConfig {
    /// Network the wallet is connected to
    pub network: NetworkConfig,

    /// Fiat pricing settings
    pub pricing: PricingConfig,

    /// Swap detection settings
    pub swap: SwapConfig,

    /// Presentation of display records
    pub display: DisplayConfig,

    /// Transaction fetch behaviour
    pub fetch: FetchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// Chain id as a hex string, e.g. "0x1"
    pub chain_id: String,

    /// Symbol of the native currency
    pub native_symbol: String,

    /// Decimals of the native currency
    pub native_decimals: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricingConfig {
    /// Fiat currency prices are quoted in
    pub fiat_currency: String,

    /// Price window used for activity views
    pub timeframe: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SwapConfig {
    /// Contract address in-wallet swaps are sent to
    pub exchange_proxy_address: String,

    /// Label shown for the exchange proxy
    pub exchange_proxy_label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisplayConfig {
    /// chrono format string for transaction dates
    pub date_format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FetchConfig {
    /// Include token transactions when viewing the native asset
    pub include_all_assets: bool,

    /// Retries per account before its transactions are treated as empty
    pub max_retries: u32,

    /// Delays before each retry after a rate limit, in milliseconds
    pub rate_limit_delays_ms: Vec<u64>,

    /// Delays before each retry after a timeout, in milliseconds
    pub timeout_delays_ms: Vec<u64>,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig {
                chain_id: "0x1".to_string(),
                native_symbol: "ETH".to_string(),
                native_decimals: 18,
            },
            pricing: PricingConfig {
                fiat_currency: "usd".to_string(),
                timeframe: "live".to_string(),
            },
            swap: SwapConfig {
                exchange_proxy_address: "0xdef1c0ded9bec7f1a1670819833240f027b25eff".to_string(),
                exchange_proxy_label: "0x Exchange Proxy".to_string(),
            },
            display: DisplayConfig {
                date_format: "%Y-%m-%d %I:%M %p".to_string(),
            },
            fetch: FetchConfig {
                include_all_assets: true,
                max_retries: 2,
                rate_limit_delays_ms: vec![500, 1000],
                timeout_delays_ms: vec![250, 500],
            },
        }
    }
}

impl NetworkConfig {
    pub fn validate(&self) -> Result<()> {
        if self.native_symbol.trim().is_empty() {
            return Err(ConfigurationError::InvalidValue(
                "Native symbol cannot be empty".to_string(),
            ));
        }

        let chain_id = Regex::new(r"^0x[0-9a-fA-F]+$")
            .map_err(|e| ConfigurationError::InvalidValue(format!("Regex error: {}", e)))?;
        if !chain_id.is_match(&self.chain_id) {
            return Err(ConfigurationError::InvalidValue(format!(
                "Chain id must be a hex string: '{}'",
                self.chain_id
            )));
        }

        Ok(())
    }
}

impl SwapConfig {
    pub fn validate(&self) -> Result<()> {
        let address = Regex::new(r"^0x[0-9a-fA-F]{40}$")
            .map_err(|e| ConfigurationError::InvalidValue(format!("Regex error: {}", e)))?;
        if !address.is_match(&self.exchange_proxy_address) {
            return Err(ConfigurationError::InvalidValue(format!(
                "Exchange proxy is not a valid address: '{}'",
                self.exchange_proxy_address
            )));
        }

        Ok(())
    }
}

impl FetchConfig {
    pub fn validate(&self) -> Result<()> {
        let max_retries = self.max_retries as usize;
        if self.rate_limit_delays_ms.len() < max_retries || self.timeout_delays_ms.len() < max_retries {
            return Err(ConfigurationError::InvalidValue(format!(
                "Need at least {} retry delays per failure kind",
                max_retries
            )));
        }

        Ok(())
    }
}

impl SystemConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path("config.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let mut config_builder = Config::builder()
            // Start with defaults
            .add_source(Config::try_from(&SystemConfig::default())?);

        if config_path.as_ref().exists() {
            info!(
                "Loading configuration from: {}",
                config_path.as_ref().display()
            );
            config_builder = config_builder.add_source(File::from(config_path.as_ref()));
        } else {
            debug!("Config file not found, using defaults and environment variables");
        }

        // WALLET__PRICING__FIAT_CURRENCY=eur style overrides
        config_builder = config_builder.add_source(
            Environment::with_prefix("WALLET")
                .try_parsing(true)
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("fetch.rate_limit_delays_ms")
                .with_list_parse_key("fetch.timeout_delays_ms"),
        );

        let mut system_config: SystemConfig = config_builder.build()?.try_deserialize()?;

        let original_fiat = system_config.pricing.fiat_currency.clone();
        system_config.pricing.fiat_currency = normalize_fiat_currency(&original_fiat)
            .unwrap_or_else(|_| {
                warn!("Keeping unrecognised fiat currency as given: '{}'", original_fiat);
                original_fiat.trim().to_lowercase()
            });

        if original_fiat != system_config.pricing.fiat_currency {
            info!(
                "Normalized fiat currency in configuration: '{}' -> '{}'",
                original_fiat, system_config.pricing.fiat_currency
            );
        }

        system_config.pricing.timeframe = system_config.pricing.timeframe.trim().to_lowercase();

        system_config.validate()?;

        Ok(system_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.network.validate()?;
        self.swap.validate()?;
        self.fetch.validate()?;

        if self.pricing.fiat_currency.trim().is_empty() {
            return Err(ConfigurationError::InvalidValue(
                "Fiat currency cannot be empty".to_string(),
            ));
        }

        if !SUPPORTED_TIMEFRAMES.contains(&self.pricing.timeframe.as_str()) {
            return Err(ConfigurationError::InvalidValue(format!(
                "Unsupported price timeframe: '{}'",
                self.pricing.timeframe
            )));
        }

        if self.display.date_format.trim().is_empty() {
            return Err(ConfigurationError::InvalidValue(
                "Date format cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Get configuration as a JSON value
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Normalize fiat currency names to the lowercase code price sources expect
pub fn normalize_fiat_currency(input: &str) -> std::result::Result<String, String> {
    match input.trim().to_lowercase().as_str() {
        "usd" | "$" | "us dollar" => Ok("usd".to_string()),
        "eur" | "€" | "euro" => Ok("eur".to_string()),
        "gbp" | "£" | "pound" => Ok("gbp".to_string()),
        "jpy" | "¥" | "yen" => Ok("jpy".to_string()),
        "btc" => Ok("btc".to_string()),
        _ => Err(format!("Unsupported fiat currency: '{}'", input)),
    }
}

/// Configuration manager for loading and managing system configuration
#[derive(Debug)]
pub struct ConfigManager {
    config: SystemConfig,
}

impl ConfigManager {
    /// Create a new configuration manager
    pub fn new() -> Result<Self> {
        let config = SystemConfig::load()?;
        info!("Configuration loaded successfully");
        debug!("Configuration: {:#?}", config);

        Ok(Self { config })
    }

    /// Create configuration manager from a specific file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = SystemConfig::load_from_path(path)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    /// Replace the configuration after validating it
    pub fn update_config(&mut self, new_config: SystemConfig) -> Result<()> {
        new_config.validate()?;
        self.config = new_config;
        info!("Configuration updated");
        Ok(())
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new().unwrap_or_else(|_| Self {
            config: SystemConfig::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_config(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("{}-{}.toml", name, std::process::id()));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = SystemConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.network.native_symbol, "ETH");
        assert_eq!(config.pricing.fiat_currency, "usd");
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = SystemConfig::load_from_path("/nonexistent/wallet-config.toml").unwrap();
        assert_eq!(config.swap, SystemConfig::default().swap);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let path = write_config(
            "wallet-config-override",
            r#"
[network]
chain_id = "0x89"
native_symbol = "MATIC"
native_decimals = 18

[pricing]
fiat_currency = "EUR"
timeframe = "1D"
"#,
        );

        let config = SystemConfig::load_from_path(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(config.network.native_symbol, "MATIC");
        assert_eq!(config.pricing.fiat_currency, "eur");
        assert_eq!(config.pricing.timeframe, "1d");
        assert_eq!(config.display.date_format, "%Y-%m-%d %I:%M %p");
    }

    #[test]
    fn test_invalid_proxy_rejected() {
        let mut config = SystemConfig::default();
        config.swap.exchange_proxy_address = "0x1234".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retry_delays_must_cover_retries() {
        let mut config = SystemConfig::default();
        config.fetch.max_retries = 5;
        assert!(config.validate().is_err());

        let mut manager = ConfigManager { config: SystemConfig::default() };
        assert!(manager.update_config(config).is_err());
        assert_eq!(manager.config().fetch.max_retries, 2);
    }

    #[test]
    fn test_normalize_fiat_currency() {
        assert_eq!(normalize_fiat_currency(" USD ").unwrap(), "usd");
        assert_eq!(normalize_fiat_currency("€").unwrap(), "eur");
        assert!(normalize_fiat_currency("doubloons").is_err());
    }
}
