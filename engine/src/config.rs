//! Engine configuration.

use std::time::Duration;

use ledgersweep_common::Currency;

/// Main engine configuration.
///
/// The sweep interval and house-account selection are explicit deployment
/// parameters, not hidden constants.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How often the settlement sweep runs.
    pub sweep_interval: Duration,
    /// Currency of the house account that receives settled proceeds.
    pub settlement_currency: Currency,
    /// Email of the admin user who owns the house account.
    pub house_admin_email: String,
    /// Completed-purchase lines per notification batch.
    pub notification_batch_size: usize,
    /// Base URL of the exchange rate quote service.
    pub rate_base_url: String,
    /// Timeout for a single rate lookup.
    pub rate_timeout: Duration,
    /// Log level for the binary.
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(60),
            settlement_currency: Currency::usd(),
            house_admin_email: "house@ledgersweep.local".to_string(),
            notification_batch_size: 5,
            rate_base_url: "https://api.frankfurter.app".to_string(),
            rate_timeout: Duration::from_secs(3),
            log_level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(secs) = std::env::var("LEDGERSWEEP_SWEEP_INTERVAL_SECS") {
            if let Ok(secs) = secs.parse() {
                config.sweep_interval = Duration::from_secs(secs);
            }
        }

        if let Ok(currency) = std::env::var("LEDGERSWEEP_SETTLEMENT_CURRENCY") {
            config.settlement_currency = Currency::new(currency);
        }

        if let Ok(email) = std::env::var("LEDGERSWEEP_HOUSE_ADMIN_EMAIL") {
            config.house_admin_email = email;
        }

        if let Ok(size) = std::env::var("LEDGERSWEEP_NOTIFICATION_BATCH_SIZE") {
            if let Ok(size) = size.parse() {
                config.notification_batch_size = size;
            }
        }

        if let Ok(url) = std::env::var("LEDGERSWEEP_RATE_URL") {
            config.rate_base_url = url;
        }

        if let Ok(ms) = std::env::var("LEDGERSWEEP_RATE_TIMEOUT_MS") {
            if let Ok(ms) = ms.parse() {
                config.rate_timeout = Duration::from_millis(ms);
            }
        }

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.log_level = level;
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.sweep_interval.is_zero() {
            return Err("Sweep interval cannot be zero".to_string());
        }

        if self.notification_batch_size == 0 {
            return Err("Notification batch size cannot be zero".to_string());
        }

        if self.rate_base_url.is_empty() {
            return Err("Rate service URL cannot be empty".to_string());
        }

        if self.rate_timeout.is_zero() {
            return Err("Rate lookup timeout cannot be zero".to_string());
        }

        if self.house_admin_email.is_empty() {
            return Err("House admin email cannot be empty".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sweep_interval, Duration::from_secs(60));
        assert_eq!(config.notification_batch_size, 5);
        assert_eq!(config.settlement_currency, Currency::usd());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let mut config = EngineConfig::default();
        config.notification_batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = EngineConfig::default();
        config.sweep_interval = Duration::ZERO;
        assert!(config.validate().is_err());
    }
}
