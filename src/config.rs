use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use crate::error::ConfigError;
use crate::models::Currency;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub explorer: ExplorerConfig,
    pub currency: CurrencyConfig,
    pub database: DatabaseConfig,
    pub processing: ProcessingConfig,
    pub api: ApiConfig,
    pub logging: LoggingConfig,
}

/// TzKT explorer client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplorerConfig {
    /// TzKT API base URL
    pub endpoint: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Initial retry delay in seconds
    pub retry_delay_seconds: u64,
    /// Maximum retry delay in seconds
    pub max_retry_delay_seconds: u64,
}

/// Native currency the ledger values are expressed in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrencyConfig {
    pub symbol: String,
    pub decimals: u32,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database file path
    pub path: String,
    /// Enable WAL mode for better concurrency
    pub enable_wal_mode: bool,
    /// Database busy timeout in milliseconds
    pub busy_timeout_ms: u32,
}

/// Block processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Head polling interval in seconds
    pub poll_interval_seconds: u64,
    /// First level to index on an empty database. 0 means start at the head.
    pub start_level: u64,
    /// Extract internal operation legs as their own records
    pub include_internal_operations: bool,
    /// Maximum levels processed between two head polls
    pub max_levels_per_batch: u32,
    /// Delay before a failed level is attempted again
    pub retry_delay_seconds: u64,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Server port
    pub port: u16,
    /// Server host/bind address
    pub host: String,
    /// Default page size for transaction listings
    pub default_page_size: u32,
    /// Largest page size a client may request
    pub max_page_size: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.tzkt.io".to_string(),
            timeout_seconds: 30,
            max_retries: 5,
            retry_delay_seconds: 2,
            max_retry_delay_seconds: 60,
        }
    }
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        let xtz = Currency::xtz();
        Self {
            symbol: xtz.symbol,
            decimals: xtz.decimals,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "./ledger.db".to_string(),
            enable_wal_mode: true,
            busy_timeout_ms: 5000,
        }
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: 8,
            start_level: 0,
            include_internal_operations: true,
            max_levels_per_batch: 10,
            retry_delay_seconds: 5,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            default_page_size: 100,
            max_page_size: 1000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl CurrencyConfig {
    pub fn to_currency(&self) -> Currency {
        Currency::new(&self.symbol, self.decimals)
    }
}

fn parse_env<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw,
            }),
        Err(_) => Ok(None),
    }
}

impl AppConfig {
    /// Load configuration from file and environment variables
    /// Environment variables take precedence over file values
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file()?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the TOML file named by `CONFIG_FILE`.
    /// A missing file yields the defaults.
    pub fn load_from_file() -> Result<Self, ConfigError> {
        let config_path = env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());

        if !Path::new(&config_path).exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| ConfigError::FileNotFound(config_path.clone()))?;
        let config: AppConfig = toml::from_str(&content)
            .map_err(|e| ConfigError::Parsing(e.to_string()))?;
        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        // Explorer
        if let Ok(endpoint) = env::var("TZKT_API_URL") {
            self.explorer.endpoint = endpoint;
        }
        if let Some(timeout) = parse_env("EXPLORER_TIMEOUT_SECONDS")? {
            self.explorer.timeout_seconds = timeout;
        }
        if let Some(retries) = parse_env("EXPLORER_MAX_RETRIES")? {
            self.explorer.max_retries = retries;
        }

        // Currency
        if let Ok(symbol) = env::var("CURRENCY_SYMBOL") {
            self.currency.symbol = symbol;
        }
        if let Some(decimals) = parse_env("CURRENCY_DECIMALS")? {
            self.currency.decimals = decimals;
        }

        // Database
        if let Ok(path) = env::var("DATABASE_PATH") {
            self.database.path = path;
        }

        // Processing
        if let Some(interval) = parse_env("BLOCK_POLL_INTERVAL")? {
            self.processing.poll_interval_seconds = interval;
        }
        if let Some(start_level) = parse_env("START_LEVEL")? {
            self.processing.start_level = start_level;
        }
        if let Some(include_internal) = parse_env("INCLUDE_INTERNAL_OPERATIONS")? {
            self.processing.include_internal_operations = include_internal;
        }

        // API
        if let Some(port) = parse_env("API_PORT")? {
            self.api.port = port;
        }
        if let Ok(host) = env::var("API_HOST") {
            self.api.host = host;
        }

        // Logging
        if let Ok(level) = env::var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = env::var("LOG_FORMAT") {
            self.logging.format = format;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.explorer.endpoint.starts_with("http://") && !self.explorer.endpoint.starts_with("https://") {
            return Err(ConfigError::InvalidUrl(self.explorer.endpoint.clone()));
        }

        if self.explorer.timeout_seconds == 0 || self.explorer.timeout_seconds > 300 {
            return Err(invalid("explorer.timeout_seconds", self.explorer.timeout_seconds));
        }

        if self.explorer.max_retries == 0 || self.explorer.max_retries > 20 {
            return Err(invalid("explorer.max_retries", self.explorer.max_retries));
        }

        if self.explorer.retry_delay_seconds > self.explorer.max_retry_delay_seconds {
            return Err(invalid("explorer.retry_delay_seconds", self.explorer.retry_delay_seconds));
        }

        let symbol = self.currency.symbol.trim();
        if symbol.is_empty() || symbol.len() > 16 {
            return Err(invalid("currency.symbol", &self.currency.symbol));
        }

        // 10^28 is the largest power of ten rust_decimal can scale by
        if self.currency.decimals > 28 {
            return Err(invalid("currency.decimals", self.currency.decimals));
        }

        if self.processing.poll_interval_seconds == 0 || self.processing.poll_interval_seconds > 300 {
            return Err(invalid("processing.poll_interval_seconds", self.processing.poll_interval_seconds));
        }

        if self.processing.max_levels_per_batch == 0 || self.processing.max_levels_per_batch > 1000 {
            return Err(invalid("processing.max_levels_per_batch", self.processing.max_levels_per_batch));
        }

        if self.api.port == 0 {
            return Err(invalid("api.port", self.api.port));
        }

        if self.api.default_page_size == 0 || self.api.default_page_size > self.api.max_page_size {
            return Err(invalid("api.default_page_size", self.api.default_page_size));
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(invalid("logging.level", &self.logging.level));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(invalid("logging.format", &self.logging.format));
        }

        if self.database.path.trim().is_empty() {
            return Err(invalid("database.path", &self.database.path));
        }

        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample_config() -> Result<String, ConfigError> {
        let config = Self::default();
        toml::to_string_pretty(&config)
            .map_err(|e| ConfigError::Parsing(e.to_string()))
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Parsing(e.to_string()))?;
        fs::write(path, content)
            .map_err(|_| ConfigError::FileNotFound(path.to_string()))?;
        Ok(())
    }
}

fn invalid(key: &str, value: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}
