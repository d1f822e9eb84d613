//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Enforce the insecure-connection policy
//! - Validate value ranges (backoff bounds, URL schemes)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;
use url::Url;

use crate::config::schema::{GatewayConfig, ManagementConfig};

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("management.connection_string is invalid: {0}")]
    InvalidConnectionString(String),

    #[error("insecure management connection ({0}) requires management.allow_insecure_configs")]
    InsecureNotAllowed(&'static str),

    #[error("management.node_secret must not be empty")]
    MissingNodeSecret,

    #[error("{section}: max delay {max_ms}ms is below base delay {base_ms}ms")]
    InvalidBackoff {
        section: &'static str,
        base_ms: u64,
        max_ms: u64,
    },

    #[error("notifications.url is invalid: {0}")]
    InvalidNotificationUrl(String),

    #[error("admin.api_key must not be empty when admin is enabled")]
    MissingAdminKey,
}

/// Validate the whole configuration, collecting every error.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.management.use_management_plane {
        if let Err(e) = validate_management(&config.management) {
            errors.push(e);
        }
        if config.management.node_secret.is_empty() {
            errors.push(ValidationError::MissingNodeSecret);
        }
    }

    let reg = &config.registration;
    if reg.max_delay_ms < reg.base_delay_ms {
        errors.push(ValidationError::InvalidBackoff {
            section: "registration",
            base_ms: reg.base_delay_ms,
            max_ms: reg.max_delay_ms,
        });
    }

    let notif = &config.notifications;
    if notif.reconnect_max_delay_ms < notif.reconnect_base_delay_ms {
        errors.push(ValidationError::InvalidBackoff {
            section: "notifications",
            base_ms: notif.reconnect_base_delay_ms,
            max_ms: notif.reconnect_max_delay_ms,
        });
    }
    if notif.enabled {
        match Url::parse(&notif.url) {
            Ok(url) if matches!(url.scheme(), "ws" | "wss") => {}
            Ok(url) => errors.push(ValidationError::InvalidNotificationUrl(format!(
                "unsupported scheme '{}'",
                url.scheme()
            ))),
            Err(e) => errors.push(ValidationError::InvalidNotificationUrl(e.to_string())),
        }
    }

    if config.admin.enabled && config.admin.api_key.is_empty() {
        errors.push(ValidationError::MissingAdminKey);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Check the management connection string and the insecure policy.
///
/// Plain `http://` and relaxed certificate verification are only accepted
/// when `allow_insecure_configs` is set.
pub fn validate_management(config: &ManagementConfig) -> Result<Url, ValidationError> {
    let url = Url::parse(&config.connection_string)
        .map_err(|e| ValidationError::InvalidConnectionString(e.to_string()))?;

    match url.scheme() {
        "https" => {}
        "http" => {
            if !config.allow_insecure_configs {
                return Err(ValidationError::InsecureNotAllowed("plaintext http"));
            }
        }
        other => {
            return Err(ValidationError::InvalidConnectionString(format!(
                "unsupported scheme '{other}'"
            )))
        }
    }

    if config.ssl_insecure_skip_verify && !config.allow_insecure_configs {
        return Err(ValidationError::InsecureNotAllowed("certificate verification disabled"));
    }

    Ok(url)
}
