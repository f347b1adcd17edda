use std::env;
use std::time::Duration;

pub use config::ConfigError;
use config::{Config, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub store: StoreSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreSettings {
    pub address: String,
    pub index: String,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub level: String,
    pub format: String,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with default values
            .set_default("store.address", "http://localhost:9200")?
            .set_default("store.index", "warehouse")?
            .set_default("store.request_timeout_ms", 5000)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "text")?
            // Add configuration file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{environment}")).required(false))
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables with prefix
            .add_source(Environment::with_prefix("STOCKROOM").separator("__"))
            .build()?;

        config.try_deserialize()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.store.request_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_can_be_loaded() {
        let settings = Settings::new();
        assert!(settings.is_ok());
    }

    #[test]
    fn test_default_store_settings() {
        let settings = Settings::new().unwrap();
        assert!(settings.store.address.starts_with("http"));
        assert!(!settings.store.index.is_empty());
        assert_eq!(settings.request_timeout(), Duration::from_millis(settings.store.request_timeout_ms));
    }
}
