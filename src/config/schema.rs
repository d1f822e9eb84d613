//! Configuration schema definitions.
//!
//! This module defines the settings the sync subsystem consumes from the
//! gateway's own configuration. All types derive Serde traits for
//! deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for a gateway node's control-plane sync.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Management plane connection and node credentials.
    pub management: ManagementConfig,

    /// Startup registration retry policy.
    pub registration: RegistrationConfig,

    /// Reload coalescing and reconciliation.
    pub reload: ReloadConfig,

    /// Change notification channel.
    pub notifications: NotificationConfig,

    /// Client certificates loaded into the certificate store at startup.
    pub certificates: Vec<CertificateFileConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub admin: AdminConfig,
}

/// Management plane connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ManagementConfig {
    /// Source API configurations from the management plane at all.
    pub use_management_plane: bool,

    /// Base URL of the management plane (e.g., "https://dashboard:3000").
    pub connection_string: String,

    /// Shared secret presented on every call.
    pub node_secret: String,

    /// Certificate store ID of the client certificate for mutual TLS.
    /// Empty means no client certificate is presented.
    pub certificate_id: String,

    /// Skip server certificate verification (test/insecure mode).
    pub ssl_insecure_skip_verify: bool,

    /// Permit plaintext or unverified connections at all.
    pub allow_insecure_configs: bool,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Hostname reported on registration.
    pub hostname: String,
}

impl Default for ManagementConfig {
    fn default() -> Self {
        Self {
            use_management_plane: false,
            connection_string: String::new(),
            node_secret: String::new(),
            certificate_id: String::new(),
            ssl_insecure_skip_verify: false,
            allow_insecure_configs: false,
            request_timeout_secs: 30,
            hostname: std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string()),
        }
    }
}

/// Retry policy for node registration at startup.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistrationConfig {
    /// Maximum registration attempts (0 = retry forever).
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            base_delay_ms: 500,
            max_delay_ms: 5000,
        }
    }
}

/// Reload scheduling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReloadConfig {
    /// Quiet period after a wake-up before a pending reload starts.
    pub debounce_ms: u64,

    /// Interval of the periodic reconciliation trigger (0 = disabled).
    pub reconcile_interval_secs: u64,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 250,
            reconcile_interval_secs: 0,
        }
    }
}

/// Pub/sub change channel configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Enable the notification listener.
    pub enabled: bool,

    /// WebSocket URL of the change channel.
    pub url: String,

    /// Logical channel name.
    pub channel: String,

    /// Base delay before resubscribing after a disconnect, in milliseconds.
    pub reconnect_base_delay_ms: u64,

    /// Maximum resubscribe delay in milliseconds.
    pub reconnect_max_delay_ms: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: String::new(),
            channel: "gateway.cluster.notifications".to_string(),
            reconnect_base_delay_ms: 200,
            reconnect_max_delay_ms: 10_000,
        }
    }
}

/// A combined PEM file (certificate chain + private key).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CertificateFileConfig {
    /// Path to the PEM file.
    pub path: String,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_toml() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [management]
            use_management_plane = true
            connection_string = "https://dashboard:3000"
            node_secret = "s3cret"
            "#,
        )
        .unwrap();

        assert!(config.management.use_management_plane);
        assert_eq!(config.management.request_timeout_secs, 30);
        assert_eq!(config.reload.debounce_ms, 250);
        assert_eq!(config.notifications.channel, "gateway.cluster.notifications");
        assert!(config.certificates.is_empty());
    }

    #[test]
    fn test_log_format_lowercase() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }
}
