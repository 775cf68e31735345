//! # Engine Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     FOLIO_SIGNING_SECRET=...                                           │
//! │     FOLIO_DATABASE_PATH=/var/lib/folio/folio.db                        │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/folio/folio.toml (Linux)                                 │
//! │     ~/Library/Application Support/com.folio.folio/folio.toml (macOS)   │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "/var/lib/folio/folio.db"
//!
//! [documents]
//! quote_validity_days = 30
//! payment_terms_days = 14
//!
//! [plans]
//! free = 5
//! starter = 50
//! # pro: omitted = unlimited
//!
//! [tokens]
//! signing_secret = "change-me"
//! public_base_url = "https://app.example.com/public"
//!
//! [reminders]
//! poll_interval_secs = 86400
//! send_timeout_secs = 30
//! ```

use folio_core::PlanTier;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{EngineError, EngineResult};

// =============================================================================
// Database
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("folio.db")
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

// =============================================================================
// Documents
// =============================================================================

/// Defaults applied to new documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSettings {
    /// Quote expiry = issue date + this many days, when not supplied.
    #[serde(default = "default_quote_validity_days")]
    pub quote_validity_days: u32,

    /// Invoice due date = issue date + this many days, when not supplied.
    #[serde(default = "default_payment_terms_days")]
    pub payment_terms_days: u32,

    /// Currency for companies that do not set one.
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_quote_validity_days() -> u32 {
    30
}

fn default_payment_terms_days() -> u32 {
    14
}

fn default_currency() -> String {
    "AUD".to_string()
}

impl Default for DocumentSettings {
    fn default() -> Self {
        DocumentSettings {
            quote_validity_days: default_quote_validity_days(),
            payment_terms_days: default_payment_terms_days(),
            currency: default_currency(),
        }
    }
}

// =============================================================================
// Plans
// =============================================================================

/// New documents per calendar month, per kind. `None` means unlimited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanLimits {
    #[serde(default = "default_free_limit")]
    pub free: Option<u32>,

    #[serde(default = "default_starter_limit")]
    pub starter: Option<u32>,

    #[serde(default)]
    pub pro: Option<u32>,
}

fn default_free_limit() -> Option<u32> {
    Some(5)
}

fn default_starter_limit() -> Option<u32> {
    Some(50)
}

impl Default for PlanLimits {
    fn default() -> Self {
        PlanLimits {
            free: default_free_limit(),
            starter: default_starter_limit(),
            pro: None,
        }
    }
}

impl PlanLimits {
    pub fn limit_for(&self, plan: PlanTier) -> Option<u32> {
        match plan {
            PlanTier::Free => self.free,
            PlanTier::Starter => self.starter,
            PlanTier::Pro => self.pro,
        }
    }
}

// =============================================================================
// Tokens
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSettings {
    /// HMAC secret for approval links. Required.
    #[serde(default)]
    pub signing_secret: String,

    #[serde(default = "default_quote_ttl_hours")]
    pub quote_ttl_hours: u64,

    #[serde(default = "default_invoice_ttl_hours")]
    pub invoice_ttl_hours: u64,

    /// Public links are `{public_base_url}/{quote|invoice}?token=...`.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

fn default_quote_ttl_hours() -> u64 {
    720
}

fn default_invoice_ttl_hours() -> u64 {
    2160
}

fn default_public_base_url() -> String {
    "http://localhost:3000/public".to_string()
}

impl Default for TokenSettings {
    fn default() -> Self {
        TokenSettings {
            signing_secret: String::new(),
            quote_ttl_hours: default_quote_ttl_hours(),
            invoice_ttl_hours: default_invoice_ttl_hours(),
            public_base_url: default_public_base_url(),
        }
    }
}

// =============================================================================
// Reminders
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderSettings {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// How long one runner holds the scheduler lease.
    #[serde(default = "default_lease_secs")]
    pub lease_secs: u64,

    /// Timeout for each render / payment-link / mail call.
    #[serde(default = "default_send_timeout")]
    pub send_timeout_secs: u64,

    #[serde(default = "default_max_concurrent_sends")]
    pub max_concurrent_sends: usize,

    /// Documents loaded per kind per tick.
    #[serde(default = "default_reminder_batch_size")]
    pub batch_size: u32,
}

fn default_poll_interval() -> u64 {
    86_400
}

fn default_lease_secs() -> u64 {
    900
}

fn default_send_timeout() -> u64 {
    30
}

fn default_max_concurrent_sends() -> usize {
    4
}

fn default_reminder_batch_size() -> u32 {
    500
}

impl Default for ReminderSettings {
    fn default() -> Self {
        ReminderSettings {
            poll_interval_secs: default_poll_interval(),
            lease_secs: default_lease_secs(),
            send_timeout_secs: default_send_timeout(),
            max_concurrent_sends: default_max_concurrent_sends(),
            batch_size: default_reminder_batch_size(),
        }
    }
}

impl ReminderSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }
}

// =============================================================================
// Payments
// =============================================================================

/// Redirect targets handed to the payment-link provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSettings {
    #[serde(default = "default_success_url")]
    pub success_url: String,

    #[serde(default = "default_cancel_url")]
    pub cancel_url: String,
}

fn default_success_url() -> String {
    "http://localhost:3000/payment/success".to_string()
}

fn default_cancel_url() -> String {
    "http://localhost:3000/payment/cancel".to_string()
}

impl Default for PaymentSettings {
    fn default() -> Self {
        PaymentSettings {
            success_url: default_success_url(),
            cancel_url: default_cancel_url(),
        }
    }
}

// =============================================================================
// Engine Configuration
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub documents: DocumentSettings,

    #[serde(default)]
    pub plans: PlanLimits,

    #[serde(default)]
    pub tokens: TokenSettings,

    #[serde(default)]
    pub reminders: ReminderSettings,

    #[serde(default)]
    pub payments: PaymentSettings,
}

impl EngineConfig {
    /// Loads configuration.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (folio.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> EngineResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading engine config from file");
                let contents = std::fs::read_to_string(&path)
                    .map_err(|e| EngineError::Config(format!("{}: {}", path.display(), e)))?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    pub fn from_toml(contents: &str) -> EngineResult<Self> {
        toml::from_str(contents).map_err(|e| EngineError::Config(e.to_string()))
    }

    /// Validates the configuration.
    pub fn validate(&self) -> EngineResult<()> {
        if self.tokens.signing_secret.trim().is_empty() {
            return Err(EngineError::Config(
                "tokens.signing_secret must be set (or FOLIO_SIGNING_SECRET)".into(),
            ));
        }

        if self.tokens.quote_ttl_hours == 0 || self.tokens.invoice_ttl_hours == 0 {
            return Err(EngineError::Config("token TTLs must be greater than 0".into()));
        }

        if self.reminders.batch_size == 0 {
            return Err(EngineError::Config("reminders.batch_size must be greater than 0".into()));
        }

        if self.reminders.max_concurrent_sends == 0 {
            return Err(EngineError::Config(
                "reminders.max_concurrent_sends must be greater than 0".into(),
            ));
        }

        if self.reminders.poll_interval_secs == 0 {
            return Err(EngineError::Config(
                "reminders.poll_interval_secs must be greater than 0".into(),
            ));
        }

        if self.reminders.lease_secs <= self.reminders.send_timeout_secs {
            return Err(EngineError::Config(
                "reminders.lease_secs must exceed reminders.send_timeout_secs".into(),
            ));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("FOLIO_DATABASE_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Ok(secret) = std::env::var("FOLIO_SIGNING_SECRET") {
            debug!("Overriding signing secret from environment");
            self.tokens.signing_secret = secret;
        }

        if let Ok(url) = std::env::var("FOLIO_PUBLIC_BASE_URL") {
            self.tokens.public_base_url = url;
        }

        if let Ok(currency) = std::env::var("FOLIO_CURRENCY") {
            self.documents.currency = currency;
        }

        if let Ok(secs) = std::env::var("FOLIO_REMINDER_POLL_SECS") {
            match secs.parse::<u64>() {
                Ok(s) => self.reminders.poll_interval_secs = s,
                Err(_) => warn!(value = %secs, "Ignoring non-numeric FOLIO_REMINDER_POLL_SECS"),
            }
        }

        if let Ok(secs) = std::env::var("FOLIO_SEND_TIMEOUT_SECS") {
            match secs.parse::<u64>() {
                Ok(s) => self.reminders.send_timeout_secs = s,
                Err(_) => warn!(value = %secs, "Ignoring non-numeric FOLIO_SEND_TIMEOUT_SECS"),
            }
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "folio", "folio")
            .map(|dirs| dirs.config_dir().join("folio.toml"))
    }

    /// A valid configuration for tests and local tools.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        let mut config = Self::default();
        config.tokens.signing_secret = secret.into();
        config
    }
}
