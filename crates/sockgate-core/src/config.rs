//! Gateway configuration with a validated builder.

use std::time::Duration;

/// Interval used when the configured ping interval is zero or unset.
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(30);
/// Bound on a single control-frame send.
pub const DEFAULT_CONTROL_DEADLINE: Duration = Duration::from_secs(3);
/// Overall deadline for draining sessions at shutdown.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Runtime configuration for the gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Prefix applied to every registered endpoint path.
    pub base_path: String,
    /// Additional prefix segment appended to the base path.
    pub context_path: String,
    /// Interval between keepalive pings on an idle session.
    pub ping_interval: Duration,
    /// Deadline for a single control-frame send (pings, close frames).
    pub control_deadline: Duration,
    /// How long shutdown waits for sessions to drain before force-releasing.
    pub shutdown_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_path: String::new(),
            context_path: String::new(),
            ping_interval: DEFAULT_PING_INTERVAL,
            control_deadline: DEFAULT_CONTROL_DEADLINE,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl GatewayConfig {
    /// Create a builder for constructing a validated `GatewayConfig`.
    pub fn builder() -> GatewayConfigBuilder {
        GatewayConfigBuilder::new()
    }

    /// The full route prefix (`base_path` + `context_path`).
    pub fn route_prefix(&self) -> String {
        format!("{}{}", self.base_path, self.context_path)
    }
}

/// Errors that can occur when building a `GatewayConfig`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Invalid interval or deadline value.
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    /// Invalid path prefix value.
    #[error("invalid path: {0}")]
    InvalidPath(String),
}

/// Validated builder for [`GatewayConfig`].
#[derive(Debug, Clone, Default)]
pub struct GatewayConfigBuilder {
    base_path: Option<String>,
    context_path: Option<String>,
    ping_interval: Option<Duration>,
    control_deadline: Option<Duration>,
    shutdown_timeout: Option<Duration>,
}

impl GatewayConfigBuilder {
    /// Create a new builder with all fields unset (defaults apply on build).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base path prefix. Must be empty or start with `/` and not end
    /// with `/`.
    pub fn base_path(mut self, path: impl Into<String>) -> Result<Self, ConfigError> {
        self.base_path = Some(validate_prefix("base_path", path.into())?);
        Ok(self)
    }

    /// Set the context path segment. Same shape rules as the base path.
    pub fn context_path(mut self, path: impl Into<String>) -> Result<Self, ConfigError> {
        self.context_path = Some(validate_prefix("context_path", path.into())?);
        Ok(self)
    }

    /// Set the keepalive ping interval in seconds. Zero means "use the
    /// default"; values above one hour are rejected.
    pub fn ping_interval_secs(mut self, secs: u64) -> Result<Self, ConfigError> {
        if secs > 3600 {
            return Err(ConfigError::InvalidTimeout(
                "ping interval cannot exceed 3600 seconds".to_string(),
            ));
        }
        self.ping_interval = if secs == 0 {
            Some(DEFAULT_PING_INTERVAL)
        } else {
            Some(Duration::from_secs(secs))
        };
        Ok(self)
    }

    /// Set the control-frame send deadline (must be between 1s and 60s).
    pub fn control_deadline(mut self, deadline: Duration) -> Result<Self, ConfigError> {
        if deadline.as_secs() == 0 {
            return Err(ConfigError::InvalidTimeout(
                "control deadline must be at least 1 second".to_string(),
            ));
        }
        if deadline.as_secs() > 60 {
            return Err(ConfigError::InvalidTimeout(
                "control deadline cannot exceed 60 seconds".to_string(),
            ));
        }
        self.control_deadline = Some(deadline);
        Ok(self)
    }

    /// Set the shutdown drain deadline (must be between 1s and 300s).
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Result<Self, ConfigError> {
        if timeout.as_secs() == 0 {
            return Err(ConfigError::InvalidTimeout(
                "shutdown timeout must be at least 1 second".to_string(),
            ));
        }
        if timeout.as_secs() > 300 {
            return Err(ConfigError::InvalidTimeout(
                "shutdown timeout cannot exceed 300 seconds".to_string(),
            ));
        }
        self.shutdown_timeout = Some(timeout);
        Ok(self)
    }

    /// Build the `GatewayConfig` (uses defaults for unset fields).
    pub fn build(self) -> GatewayConfig {
        let defaults = GatewayConfig::default();
        GatewayConfig {
            base_path: self.base_path.unwrap_or(defaults.base_path),
            context_path: self.context_path.unwrap_or(defaults.context_path),
            ping_interval: self.ping_interval.unwrap_or(defaults.ping_interval),
            control_deadline: self.control_deadline.unwrap_or(defaults.control_deadline),
            shutdown_timeout: self.shutdown_timeout.unwrap_or(defaults.shutdown_timeout),
        }
    }
}

fn validate_prefix(field: &str, path: String) -> Result<String, ConfigError> {
    if path.is_empty() {
        return Ok(path);
    }
    if !path.starts_with('/') {
        return Err(ConfigError::InvalidPath(format!(
            "{field} must start with '/'"
        )));
    }
    if path.ends_with('/') {
        return Err(ConfigError::InvalidPath(format!(
            "{field} must not end with '/'"
        )));
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = GatewayConfig::default();
        assert_eq!(config.ping_interval, Duration::from_secs(30));
        assert_eq!(config.control_deadline, Duration::from_secs(3));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(10));
        assert_eq!(config.route_prefix(), "");
    }

    #[test]
    fn zero_ping_interval_means_default() {
        let config = GatewayConfig::builder()
            .ping_interval_secs(0)
            .unwrap()
            .build();
        assert_eq!(config.ping_interval, DEFAULT_PING_INTERVAL);
    }

    #[test]
    fn oversized_ping_interval_is_rejected() {
        let result = GatewayConfig::builder().ping_interval_secs(3601);
        assert!(matches!(result, Err(ConfigError::InvalidTimeout(_))));
    }

    #[test]
    fn prefixes_compose() {
        let config = GatewayConfig::builder()
            .base_path("/api")
            .unwrap()
            .context_path("/v1")
            .unwrap()
            .build();
        assert_eq!(config.route_prefix(), "/api/v1");
    }

    #[test]
    fn malformed_prefixes_are_rejected() {
        assert!(GatewayConfig::builder().base_path("api").is_err());
        assert!(GatewayConfig::builder().base_path("/api/").is_err());
        assert!(GatewayConfig::builder().base_path("").is_ok());
    }

    #[test]
    fn control_deadline_bounds() {
        assert!(
            GatewayConfig::builder()
                .control_deadline(Duration::from_secs(0))
                .is_err()
        );
        assert!(
            GatewayConfig::builder()
                .control_deadline(Duration::from_secs(61))
                .is_err()
        );
        let config = GatewayConfig::builder()
            .control_deadline(Duration::from_secs(5))
            .unwrap()
            .build();
        assert_eq!(config.control_deadline, Duration::from_secs(5));
    }
}
