//! Configuration for the autoarm agent.
//!
//! All settings come from environment variables, validated once at startup.
//! The resulting [`Config`] is constructed in `main` and handed to the cycle
//! driver and clients; nothing reads the environment after startup.

use std::time::Duration;

/// Default router diagnostic report endpoint.
const DEFAULT_ROUTER_REPORT_URL: &str = "http://onhub.here/api/v1/diagnostic-report";

/// Default delay between reconciliation cycles.
const DEFAULT_CYCLE_INTERVAL_SECS: u64 = 30;

/// Default deadline for transmitting a status report.
const DEFAULT_REPORT_TIMEOUT_SECS: u64 = 30;

/// Main configuration for the agent.
#[derive(Debug, Clone)]
pub struct Config {
    /// Monitoring endpoint connection settings
    pub messaging: MessagingConfig,
    /// Camera system username
    pub camera_user: String,
    /// Camera system credential
    pub camera_pass: String,
    /// Camera system network identifier
    pub camera_network: String,
    /// Addresses whose presence controls the arming decision, sorted
    pub controlling_ips: Vec<String>,
    /// Router diagnostic report URL
    pub router_report_url: String,
    /// Delay between cycles
    pub cycle_interval: Duration,
    /// Deadline for the per-cycle status report
    pub report_timeout: Duration,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Tests use this to supply variables without touching the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let messaging = MessagingConfig::parse(&require(&lookup, "MESSAGING_CONNECTION_STRING")?)?;

        let controlling_raw = require(&lookup, "CONTROLLING_IPS")?;
        let mut controlling_ips: Vec<String> = controlling_raw
            .split(',')
            .map(|ip| ip.trim().to_string())
            .filter(|ip| !ip.is_empty())
            .collect();
        controlling_ips.sort();
        if controlling_ips.is_empty() {
            return Err(ConfigError::Invalid {
                var: "CONTROLLING_IPS",
                reason: "no addresses in list".to_string(),
            });
        }

        Ok(Self {
            messaging,
            camera_user: require(&lookup, "CAMERA_USER")?,
            camera_pass: require(&lookup, "CAMERA_PASS")?,
            camera_network: require(&lookup, "CAMERA_NETWORK")?,
            controlling_ips,
            router_report_url: lookup("ROUTER_REPORT_URL")
                .unwrap_or_else(|| DEFAULT_ROUTER_REPORT_URL.to_string()),
            cycle_interval: duration_var(
                &lookup,
                "CYCLE_INTERVAL_SECS",
                DEFAULT_CYCLE_INTERVAL_SECS,
            )?,
            report_timeout: duration_var(
                &lookup,
                "REPORT_TIMEOUT_SECS",
                DEFAULT_REPORT_TIMEOUT_SECS,
            )?,
        })
    }

    /// Configuration as displayable JSON with credentials redacted.
    pub fn redacted(&self) -> serde_json::Value {
        serde_json::json!({
            "messaging_endpoint": self.messaging.endpoint,
            "messaging_token": "********",
            "camera_user": self.camera_user,
            "camera_pass": "********",
            "camera_network": self.camera_network,
            "controlling_ips": self.controlling_ips,
            "router_report_url": self.router_report_url,
            "cycle_interval_secs": self.cycle_interval.as_secs(),
            "report_timeout_secs": self.report_timeout.as_secs(),
        })
    }
}

/// Connection settings for the monitoring endpoint.
#[derive(Debug, Clone)]
pub struct MessagingConfig {
    /// Base URL of the monitoring endpoint
    pub endpoint: String,
    /// Bearer authentication token
    pub token: String,
}

impl MessagingConfig {
    /// Parse a compound connection string of `Key=Value` pairs separated by
    /// semicolons, e.g. `Endpoint=https://hub.example.net;Token=abc123`.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let mut endpoint = None;
        let mut token = None;

        for part in raw.split(';') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let Some((key, value)) = part.split_once('=') else {
                return Err(ConfigError::Invalid {
                    var: "MESSAGING_CONNECTION_STRING",
                    reason: format!("segment without '=': {part}"),
                });
            };
            match key.trim() {
                "Endpoint" => endpoint = Some(value.trim().trim_end_matches('/').to_string()),
                "Token" => token = Some(value.trim().to_string()),
                // Unknown segments are tolerated for forward compatibility.
                _ => {}
            }
        }

        match (endpoint, token) {
            (Some(endpoint), Some(token)) if !endpoint.is_empty() && !token.is_empty() => {
                Ok(Self { endpoint, token })
            }
            _ => Err(ConfigError::Invalid {
                var: "MESSAGING_CONNECTION_STRING",
                reason: "must contain non-empty Endpoint and Token segments".to_string(),
            }),
        }
    }
}

fn require(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<String, ConfigError> {
    match lookup(var) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(var)),
    }
}

fn duration_var(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default_secs: u64,
) -> Result<Duration, ConfigError> {
    match lookup(var) {
        Some(value) => {
            let secs: u64 = value.parse().map_err(|_| ConfigError::Invalid {
                var,
                reason: format!("not a number of seconds: {value}"),
            })?;
            Ok(Duration::from_secs(secs))
        }
        None => Ok(Duration::from_secs(default_secs)),
    }
}

/// Configuration errors. All are fatal at startup.
#[derive(Debug)]
pub enum ConfigError {
    /// A required environment variable is missing or empty
    Missing(&'static str),
    /// A variable is present but cannot be parsed
    Invalid { var: &'static str, reason: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Missing(var) => {
                write!(f, "Please set the environment variable {var}")
            }
            ConfigError::Invalid { var, reason } => {
                write!(f, "Invalid value for {var}: {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
