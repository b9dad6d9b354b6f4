//! Configuration management for the Jira webhook receiver.

use std::{net::SocketAddr, str::FromStr, time::Duration};

use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use jira_webhook_core::DispatchPolicy;
use serde::{Deserialize, Serialize};

const CONFIG_FILE: &str = "jira-webhook.toml";
const ENV_PREFIX: &str = "JIRA_WEBHOOK_";
const RESERVED_PATHS: &[&str] = &["/", "/health"];

/// Service configuration with defaults, file, and environment overrides.
///
/// Configuration is loaded in priority order:
/// 1. Environment variables prefixed with `JIRA_WEBHOOK_` (highest priority)
/// 2. Configuration file (`jira-webhook.toml`)
/// 3. Built-in defaults (lowest priority)
///
/// # Example
///
/// ```no_run
/// use jira_webhook_api::Config;
///
/// let config = Config::load().expect("Failed to load configuration");
///
/// println!("Receiving webhooks on {}:{}{}", config.host, config.port, config.webhook_path);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    // Server
    /// Server bind address.
    ///
    /// Environment variable: `JIRA_WEBHOOK_HOST`
    #[serde(default = "default_host")]
    pub host: String,
    /// Server bind port.
    ///
    /// Environment variable: `JIRA_WEBHOOK_PORT`
    #[serde(default = "default_port")]
    pub port: u16,
    /// HTTP request timeout in seconds, covering handler execution.
    ///
    /// Environment variable: `JIRA_WEBHOOK_REQUEST_TIMEOUT`
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    /// Largest accepted request body in bytes.
    ///
    /// Environment variable: `JIRA_WEBHOOK_MAX_BODY_BYTES`
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    // Receiver
    /// Path the receiver accepts POST requests on.
    ///
    /// Environment variable: `JIRA_WEBHOOK_WEBHOOK_PATH`
    #[serde(default = "default_webhook_path")]
    pub webhook_path: String,
    /// What happens when a handler fails: `isolate` or `fail_fast`.
    ///
    /// Environment variable: `JIRA_WEBHOOK_DISPATCH_POLICY`
    #[serde(default)]
    pub dispatch_policy: DispatchPolicy,

    // Logging
    /// Log filter used when `RUST_LOG` is not set.
    ///
    /// Environment variable: `JIRA_WEBHOOK_LOG_LEVEL`
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Config {
    /// Load configuration from defaults, config file, and environment variable
    /// overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(Figment::new().merge(Toml::file(CONFIG_FILE)))
    }

    /// Load configuration layering `overrides` between the defaults and the
    /// environment.
    pub fn load_from(overrides: Figment) -> Result<Self> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(overrides)
            .merge(Env::prefixed(ENV_PREFIX));

        let config: Self = figment.extract().context("Failed to load configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Parse server socket address from host and port configuration.
    pub fn parse_server_addr(&self) -> Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.host, self.port);
        SocketAddr::from_str(&addr_str).context("Invalid server address")
    }

    /// Request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("port must be greater than 0");
        }

        if self.request_timeout == 0 {
            anyhow::bail!("request_timeout must be greater than 0");
        }

        if self.max_body_bytes == 0 {
            anyhow::bail!("max_body_bytes must be greater than 0");
        }

        if !self.webhook_path.starts_with('/') {
            anyhow::bail!("webhook_path must start with '/'");
        }

        if RESERVED_PATHS.contains(&self.webhook_path.as_str()) {
            anyhow::bail!("webhook_path cannot be '{}', it is already routed", self.webhook_path);
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout: default_request_timeout(),
            max_body_bytes: default_max_body_bytes(),
            webhook_path: default_webhook_path(),
            dispatch_policy: DispatchPolicy::default(),
            log_level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_webhook_path() -> String {
    "/jira".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, env, sync::Mutex};

    use super::*;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    struct TestEnvGuard {
        _lock: std::sync::MutexGuard<'static, ()>,
        vars: Vec<String>,
        originals: HashMap<String, Option<String>>,
    }

    impl TestEnvGuard {
        fn new() -> Self {
            let lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            Self { _lock: lock, vars: Vec::new(), originals: HashMap::new() }
        }

        fn set_var(&mut self, key: &str, value: &str) {
            if !self.vars.contains(&key.to_string()) {
                self.originals.insert(key.to_string(), env::var(key).ok());
                self.vars.push(key.to_string());
            }
            env::set_var(key, value);
        }
    }

    impl Drop for TestEnvGuard {
        fn drop(&mut self) {
            for var in &self.vars {
                match self.originals.get(var) {
                    Some(Some(value)) => env::set_var(var, value),
                    Some(None) => env::remove_var(var),
                    None => {},
                }
            }
        }
    }

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.webhook_path, "/jira");
        assert_eq!(config.dispatch_policy, DispatchPolicy::Isolate);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn env_overrides_defaults() {
        let mut guard = TestEnvGuard::new();
        guard.set_var("JIRA_WEBHOOK_PORT", "9090");
        guard.set_var("JIRA_WEBHOOK_WEBHOOK_PATH", "/hooks/jira");
        guard.set_var("JIRA_WEBHOOK_DISPATCH_POLICY", "fail_fast");
        guard.set_var("JIRA_WEBHOOK_MAX_BODY_BYTES", "2048");

        let config =
            Config::load_from(Figment::new()).expect("Config should load with env overrides");

        assert_eq!(config.port, 9090);
        assert_eq!(config.webhook_path, "/hooks/jira");
        assert_eq!(config.dispatch_policy, DispatchPolicy::FailFast);
        assert_eq!(config.max_body_bytes, 2048);
        assert_eq!(config.host, "127.0.0.1");
    }

    #[test]
    fn file_values_sit_between_defaults_and_env() {
        let mut guard = TestEnvGuard::new();
        guard.set_var("JIRA_WEBHOOK_PORT", "7070");

        let file = Figment::new().merge(Toml::string(
            r#"
            host = "0.0.0.0"
            port = 6060
            log_level = "debug"
            "#,
        ));
        let config = Config::load_from(file).expect("Config should load from toml");

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 7070);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn invalid_values_fail_to_load() {
        let _guard = TestEnvGuard::new();
        let file = Figment::new().merge(Toml::string(r#"dispatch_policy = "retry""#));
        assert!(Config::load_from(file).is_err());

        let file = Figment::new().merge(Toml::string(r#"webhook_path = "jira""#));
        assert!(Config::load_from(file).is_err());
    }

    #[test]
    fn invalid_config_validation_fails() {
        let mut config = Config::default();

        config.port = 0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.request_timeout = 0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.max_body_bytes = 0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.webhook_path = "jira".to_string();
        assert!(config.validate().is_err());

        config = Config::default();
        config.webhook_path = "/".to_string();
        assert!(config.validate().is_err());

        config = Config::default();
        config.webhook_path = "/health".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn socket_address_parsing() {
        let mut config = Config::default();
        config.host = "127.0.0.1".to_string();
        config.port = 9000;

        let addr = config.parse_server_addr().expect("Should parse socket address");

        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 9000);
    }
}
