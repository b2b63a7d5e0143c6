use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;

use crate::acceptance::FeeSchedule;
use crate::booking::PricingTable;

/// Placeholder secret used when neither the file nor `JWT_SECRET` sets one
pub const DEV_JWT_SECRET: &str = "dev-only-secret-change-me";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub fees: FeeSchedule,
    #[serde(default)]
    pub pricing: PricingTable,
    #[serde(default)]
    pub acceptance: AcceptanceConfig,
    #[serde(default)]
    pub booking: BookingConfig,
    #[serde(default)]
    pub drivers: DriversConfig,
    #[serde(default)]
    pub phone: PhoneConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    #[serde(default)]
    pub feed: FeedConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// In-process store, state is lost on restart
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    #[serde(default)]
    pub postgres_url: Option<String>,
    pub max_connections: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            postgres_url: None,
            max_connections: 20,
        }
    }
}

/// How the coordinator makes debit + booking transition consistent
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AcceptMode {
    /// Single store transaction, no compensation path
    #[default]
    Transactional,
    /// Debit, conditional transition, refund on failure
    Compensating,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct AcceptanceConfig {
    pub mode: AcceptMode,
    /// Only `approved` drivers may accept bookings
    pub require_approved_driver: bool,
}

impl Default for AcceptanceConfig {
    fn default() -> Self {
        Self {
            mode: AcceptMode::Transactional,
            require_approved_driver: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct BookingConfig {
    /// Credit the acceptance fee back when a confirmed booking is cancelled
    pub refund_on_cancel: bool,
    pub max_shared_seats: i32,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            refund_on_cancel: false,
            max_shared_seats: 4,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct DriversConfig {
    pub welcome_bonus: i64,
    pub auto_approve: bool,
}

impl Default for DriversConfig {
    fn default() -> Self {
        Self {
            welcome_bonus: 100_000,
            auto_approve: false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct PhoneConfig {
    /// Country calling code without `+`
    pub country_code: String,
    /// Length of the national format including the leading `0`
    pub national_length: usize,
}

impl Default for PhoneConfig {
    fn default() -> Self {
        Self {
            country_code: "98".to_string(),
            national_length: 11,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 secret, overridden by `JWT_SECRET`
    pub jwt_secret: String,
    pub session_ttl_hours: i64,
    pub otp_ttl_secs: u64,
    pub otp_resend_secs: u64,
    pub otp_max_attempts: u32,
    pub admin_username: String,
    /// Argon2 PHC string; admin login is disabled when absent
    #[serde(default)]
    pub admin_password_hash: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEV_JWT_SECRET.to_string(),
            session_ttl_hours: 24,
            otp_ttl_secs: 120,
            otp_resend_secs: 60,
            otp_max_attempts: 5,
            admin_username: "admin".to_string(),
            admin_password_hash: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct NotifyConfig {
    pub enabled: bool,
    #[serde(default)]
    pub telegram_bot_token: Option<String>,
    #[serde(default)]
    pub telegram_chat_id: Option<String>,
    pub queue_size: usize,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            telegram_bot_token: None,
            telegram_chat_id: None,
            queue_size: 1024,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ReconcileConfig {
    pub enabled: bool,
    pub scan_interval_secs: u64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            scan_interval_secs: 300,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct FeedConfig {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            default_limit: 50,
            max_limit: 200,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: "./logs".to_string(),
            log_file: "carpool.log".to_string(),
            use_json: false,
            rotation: "daily".to_string(),
            gateway: GatewayConfig::default(),
            storage: StorageConfig::default(),
            fees: FeeSchedule::default(),
            pricing: PricingTable::default(),
            acceptance: AcceptanceConfig::default(),
            booking: BookingConfig::default(),
            drivers: DriversConfig::default(),
            phone: PhoneConfig::default(),
            auth: AuthConfig::default(),
            notify: NotifyConfig::default(),
            reconcile: ReconcileConfig::default(),
            feed: FeedConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load `config/<env>.yaml`, then apply environment overrides
    pub fn load(env: &str) -> Result<Self> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path))?;
        let mut config = Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config yaml: {}", config_path))?;
        config.apply_env_overrides();
        config.check_secrets(env)?;
        Ok(config)
    }

    /// The placeholder JWT secret is only accepted for the in-memory dev profile
    pub fn check_secrets(&self, env: &str) -> Result<()> {
        if self.auth.jwt_secret.is_empty() {
            bail!("auth.jwt_secret is empty");
        }
        if self.auth.jwt_secret == DEV_JWT_SECRET
            && (env != "dev" || self.storage.backend == StorageBackend::Postgres)
        {
            bail!(
                "Refusing to start env '{}' with the development JWT secret, set JWT_SECRET",
                env
            );
        }
        Ok(())
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(secret) = std::env::var("JWT_SECRET")
            && !secret.is_empty()
        {
            self.auth.jwt_secret = secret;
        }
        if let Ok(url) = std::env::var("DATABASE_URL")
            && !url.is_empty()
        {
            self.storage.postgres_url = Some(url);
        }
        if let Ok(hash) = std::env::var("ADMIN_PASSWORD_HASH")
            && !hash.is_empty()
        {
            self.auth.admin_password_hash = Some(hash);
        }
        if let Ok(token) = std::env::var("TELEGRAM_BOT_TOKEN")
            && !token.is_empty()
        {
            self.notify.telegram_bot_token = Some(token);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::ServiceType;

    const MINIMAL: &str = r#"
log_level: debug
log_dir: ./logs
log_file: test.log
use_json: false
rotation: never
gateway:
  host: 127.0.0.1
  port: 9000
"#;

    #[test]
    fn test_minimal_yaml_uses_section_defaults() {
        let config = AppConfig::from_yaml(MINIMAL).unwrap();
        assert_eq!(config.gateway.port, 9000);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.acceptance.mode, AcceptMode::Transactional);
        assert!(!config.booking.refund_on_cancel);
        assert_eq!(config.fees.fee_for(ServiceType::SharedSeat), 25_000);
        assert_eq!(config.fees.fee_for(ServiceType::FullCar), 140_000);
    }

    #[test]
    fn test_sections_override_defaults() {
        let yaml = format!(
            "{}\nacceptance:\n  mode: compensating\n  require_approved_driver: false\nfees:\n  shared_seat: 30000\n  full_car: 150000\n  package: 10000\n",
            MINIMAL
        );
        let config = AppConfig::from_yaml(&yaml).unwrap();
        assert_eq!(config.acceptance.mode, AcceptMode::Compensating);
        assert!(!config.acceptance.require_approved_driver);
        assert_eq!(config.fees.fee_for(ServiceType::SharedSeat), 30_000);
        assert_eq!(config.fees.fee_for(ServiceType::Package), 10_000);
    }

    #[test]
    fn test_shipped_dev_profile_parses() {
        let config = AppConfig::from_yaml(include_str!("../config/dev.yaml")).unwrap();
        assert_eq!(config.gateway.port, 8080);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.auth.jwt_secret, DEV_JWT_SECRET);
        assert_eq!(config.phone.country_code, "98");
    }

    #[test]
    fn test_shipped_prod_profile_parses() {
        let config = AppConfig::from_yaml(include_str!("../config/prod.yaml")).unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Postgres);
        assert!(config.storage.postgres_url.is_none());
        assert!(!config.drivers.auto_approve);
        assert_eq!(config.fees.fee_for(ServiceType::Package), 15_000);
    }

    #[test]
    fn test_dev_secret_rejected_outside_dev() {
        let mut prod = AppConfig::from_yaml(include_str!("../config/prod.yaml")).unwrap();
        assert_eq!(prod.auth.jwt_secret, DEV_JWT_SECRET);
        assert!(prod.check_secrets("prod").is_err());

        prod.auth.jwt_secret = "a-real-production-secret".into();
        assert!(prod.check_secrets("prod").is_ok());

        let mut dev = AppConfig::from_yaml(include_str!("../config/dev.yaml")).unwrap();
        assert!(dev.check_secrets("dev").is_ok());
        assert!(dev.check_secrets("staging").is_err());

        dev.storage.backend = StorageBackend::Postgres;
        assert!(dev.check_secrets("dev").is_err());

        dev.auth.jwt_secret.clear();
        assert!(dev.check_secrets("dev").is_err());
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let yaml = format!("{}\nstorage:\n  backend: mongo\n  max_connections: 5\n", MINIMAL);
        assert!(AppConfig::from_yaml(&yaml).is_err());
    }
}
