//! Configuration file support for as3mgrd
//!
//! Loads and validates as3mgrd configuration from TOML files.
//! Default location: /etc/as3mgrd/as3mgrd.toml

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use as3_common::{As3Error, As3Result};

use crate::bigip::BigIpParams;
use crate::dispatcher::DispatcherSettings;
use crate::retry::RetryPolicy;
use crate::schema::SchemaValidator;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/as3mgrd/as3mgrd.toml";

/// BIG-IP connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BigIpConfig {
    /// Management URL
    #[serde(default = "default_url")]
    pub url: String,

    /// Management user
    #[serde(default = "default_username")]
    pub username: String,

    /// Management password
    #[serde(default)]
    pub password: String,

    /// PEM bundle of additional trusted CA certificates
    #[serde(default)]
    pub trusted_certs: Option<PathBuf>,

    /// Skip server certificate verification
    #[serde(default)]
    pub ssl_insecure: bool,

    /// Log AS3 response bodies
    #[serde(default)]
    pub log_response: bool,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// User-Agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Retry timeout tiers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Wait after validation-class failures, in seconds
    #[serde(default = "default_small_secs")]
    pub small_secs: u64,

    /// Wait after transient failures, in seconds
    #[serde(default = "default_medium_secs")]
    pub medium_secs: u64,

    /// Wait after unprocessable-entity failures, in seconds
    #[serde(default = "default_large_secs")]
    pub large_secs: u64,
}

/// Dispatch loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Seconds to wait before every post except the first
    #[serde(default)]
    pub post_delay_secs: u64,

    /// Validate declarations against the AS3 schema before posting
    #[serde(default)]
    pub validation: bool,

    /// Local copy of the AS3 schema
    #[serde(default)]
    pub schema_path: Option<PathBuf>,

    /// Capacity of the post notification channel
    #[serde(default = "default_notification_capacity")]
    pub notification_capacity: usize,

    /// Retry timeouts
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Declaration source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// File holding the desired declaration
    #[serde(default = "default_declaration_path")]
    pub declaration_path: PathBuf,

    /// How often to check the file for changes, in seconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Tenants to scope posts to (empty posts the whole declaration)
    #[serde(default)]
    pub tenants: Vec<String>,
}

/// Complete as3mgrd configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct As3MgrConfig {
    /// BIG-IP connection
    #[serde(default)]
    pub bigip: BigIpConfig,

    /// Dispatch loop
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Declaration source
    #[serde(default)]
    pub source: SourceConfig,
}

// Default functions
fn default_url() -> String {
    "https://127.0.0.1".to_string()
}

fn default_username() -> String {
    "admin".to_string()
}

fn default_request_timeout() -> u64 {
    60
}

fn default_user_agent() -> String {
    format!("as3mgrd-{}", env!("CARGO_PKG_VERSION"))
}

fn default_small_secs() -> u64 {
    3
}

fn default_medium_secs() -> u64 {
    30
}

fn default_large_secs() -> u64 {
    60
}

fn default_notification_capacity() -> usize {
    16
}

fn default_declaration_path() -> PathBuf {
    PathBuf::from("/etc/as3mgrd/declaration.json")
}

fn default_poll_interval() -> u64 {
    5
}

// Default implementations
impl Default for BigIpConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            username: default_username(),
            password: String::new(),
            trusted_certs: None,
            ssl_insecure: false,
            log_response: false,
            request_timeout_secs: default_request_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            small_secs: default_small_secs(),
            medium_secs: default_medium_secs(),
            large_secs: default_large_secs(),
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            post_delay_secs: 0,
            validation: false,
            schema_path: None,
            notification_capacity: default_notification_capacity(),
            retry: RetryConfig::default(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            declaration_path: default_declaration_path(),
            poll_interval_secs: default_poll_interval(),
            tenants: Vec::new(),
        }
    }
}

impl As3MgrConfig {
    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> As3Result<Self> {
        toml::from_str(content).map_err(|e| As3Error::invalid_config("toml", e.to_string()))
    }

    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> As3Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            As3Error::invalid_config(
                path.display().to_string(),
                format!("failed to parse config file: {}", e),
            )
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> As3Result<()> {
        if !(self.bigip.url.starts_with("https://") || self.bigip.url.starts_with("http://")) {
            return Err(As3Error::invalid_config(
                "bigip.url",
                "must start with http:// or https://",
            ));
        }

        if self.bigip.username.is_empty() {
            return Err(As3Error::invalid_config("bigip.username", "must not be empty"));
        }

        if self.bigip.request_timeout_secs == 0 {
            return Err(As3Error::invalid_config(
                "bigip.request_timeout_secs",
                "must be > 0",
            ));
        }

        let retry = &self.dispatch.retry;
        for (field, secs) in [
            ("dispatch.retry.small_secs", retry.small_secs),
            ("dispatch.retry.medium_secs", retry.medium_secs),
            ("dispatch.retry.large_secs", retry.large_secs),
        ] {
            if secs == 0 {
                return Err(As3Error::invalid_config(field, "must be > 0"));
            }
        }

        if self.dispatch.validation && self.dispatch.schema_path.is_none() {
            return Err(As3Error::invalid_config(
                "dispatch.schema_path",
                "required when validation is enabled",
            ));
        }

        if self.dispatch.notification_capacity == 0 {
            return Err(As3Error::invalid_config(
                "dispatch.notification_capacity",
                "must be > 0",
            ));
        }

        if self.source.poll_interval_secs == 0 {
            return Err(As3Error::invalid_config(
                "source.poll_interval_secs",
                "must be > 0",
            ));
        }

        Ok(())
    }

    /// Get poll interval as Duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.source.poll_interval_secs)
    }

    /// Dispatcher tunables derived from the `[dispatch]` table
    pub fn dispatcher_settings(&self) -> DispatcherSettings {
        let retry = &self.dispatch.retry;
        DispatcherSettings {
            post_delay: Duration::from_secs(self.dispatch.post_delay_secs),
            retry: RetryPolicy::new(
                Duration::from_secs(retry.small_secs),
                Duration::from_secs(retry.medium_secs),
                Duration::from_secs(retry.large_secs),
            ),
        }
    }

    /// Client parameters derived from the `[bigip]` table
    pub fn bigip_params(&self) -> BigIpParams {
        BigIpParams {
            url: self.bigip.url.clone(),
            username: self.bigip.username.clone(),
            password: self.bigip.password.clone(),
            trusted_certs: self.bigip.trusted_certs.clone(),
            ssl_insecure: self.bigip.ssl_insecure,
            request_timeout: Duration::from_secs(self.bigip.request_timeout_secs),
            log_response: self.bigip.log_response,
            user_agent: self.bigip.user_agent.clone(),
        }
    }

    /// Loads the schema gate if validation is enabled
    pub fn schema_validator(&self) -> As3Result<Option<SchemaValidator>> {
        match (&self.dispatch.schema_path, self.dispatch.validation) {
            (Some(path), true) => SchemaValidator::from_file(path).map(Some),
            (None, true) => Err(As3Error::invalid_config(
                "dispatch.schema_path",
                "required when validation is enabled",
            )),
            (_, false) => Ok(None),
        }
    }
}
