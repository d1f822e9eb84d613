//! Management plane HTTP(S) client.
//!
//! # Responsibilities
//! - Build requests for registration, deregistration and config fetches
//! - Present the configured client certificate for mutual TLS
//! - Decode the response envelope and classify every failure
//!
//! # Design Decisions
//! - Stateless: node identity is passed in by the caller
//! - Never retries; callers own the retry policy
//! - The client identity is resolved from the certificate store per call

use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use std::time::Duration;

use crate::certs::CertificateStore;
use crate::config::validation::validate_management;
use crate::config::{ConfigError, ManagementConfig};
use crate::error::{SyncError, SyncResult};
use crate::management::envelope::{Registration, ResponseEnvelope};
use crate::net::tls::{find_tls_error, install_crypto_provider};
use crate::reload::ConfigSource;
use crate::specs::ConfigEntry;

pub const REGISTER_PATH: &str = "/register/node";
pub const NODE_PATH: &str = "/system/node";
pub const CONFIGS_PATH: &str = "/system/apis";

pub const HEADER_AUTHORIZATION: &str = "authorization";
pub const HEADER_NODE_ID: &str = "x-gateway-node-id";
pub const HEADER_NONCE: &str = "x-gateway-nonce";
pub const HEADER_HOSTNAME: &str = "x-gateway-hostname";

/// Request/response wrapper around the management plane API.
#[derive(Clone)]
pub struct ManagementClient {
    base_url: String,
    node_secret: String,
    hostname: String,
    certificate_id: String,
    insecure_skip_verify: bool,
    timeout: Duration,
    certs: CertificateStore,
}

impl ManagementClient {
    /// Create a client for the configured management plane.
    ///
    /// Fails if the connection string is invalid or violates the insecure
    /// connection policy.
    pub fn new(config: &ManagementConfig, certs: CertificateStore) -> Result<Self, ConfigError> {
        let url = validate_management(config).map_err(|e| ConfigError::Validation(vec![e]))?;
        install_crypto_provider();

        Ok(Self {
            base_url: url.as_str().trim_end_matches('/').to_string(),
            node_secret: config.node_secret.clone(),
            hostname: config.hostname.clone(),
            certificate_id: config.certificate_id.clone(),
            insecure_skip_verify: config.ssl_insecure_skip_verify,
            timeout: Duration::from_secs(config.request_timeout_secs),
            certs,
        })
    }

    /// Register this node. Returns the assigned node ID and nonce.
    pub async fn register(&self) -> SyncResult<Registration> {
        let request = self
            .http_client()?
            .get(self.endpoint(REGISTER_PATH))
            .header(HEADER_AUTHORIZATION, &self.node_secret)
            .header(HEADER_HOSTNAME, &self.hostname);

        self.execute("register", request).await?.into_registration()
    }

    /// Deregister a node. Any `Message` shape counts as an acknowledgement.
    pub async fn deregister(&self, node_id: &str, nonce: &str) -> SyncResult<()> {
        let request = self
            .http_client()?
            .delete(self.endpoint(NODE_PATH))
            .header(HEADER_AUTHORIZATION, &self.node_secret)
            .header(HEADER_NODE_ID, node_id)
            .header(HEADER_NONCE, nonce);

        self.execute("deregister", request).await?;
        Ok(())
    }

    /// Fetch the complete configuration list.
    pub async fn fetch_configs(&self) -> SyncResult<Vec<ConfigEntry>> {
        let request = self
            .http_client()?
            .get(self.endpoint(CONFIGS_PATH))
            .header(HEADER_AUTHORIZATION, &self.node_secret);

        self.execute("fetch_configs", request).await?.into_entries()
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn http_client(&self) -> SyncResult<reqwest::Client> {
        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(self.timeout)
            .no_proxy();

        if self.insecure_skip_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        if !self.certificate_id.is_empty() {
            let record = self.certs.get(&self.certificate_id).ok_or_else(|| {
                SyncError::Auth(format!(
                    "client certificate '{}' not found in certificate store",
                    self.certificate_id
                ))
            })?;
            let identity = reqwest::Identity::from_pem(record.pem()).map_err(|e| {
                SyncError::Auth(format!("client certificate '{}' unusable: {e}", self.certificate_id))
            })?;
            builder = builder.identity(identity);
        }

        builder
            .build()
            .map_err(|e| SyncError::Connection(format!("failed to build HTTP client: {e}")))
    }

    async fn execute(&self, call: &'static str, request: RequestBuilder) -> SyncResult<ResponseEnvelope> {
        let response = request.send().await.map_err(|e| classify_transport(call, &e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(SyncError::Auth(format!("{call}: management plane rejected credentials ({status})")));
        }
        if !status.is_success() {
            return Err(SyncError::Connection(format!("{call}: unexpected HTTP status {status}")));
        }

        let body = response.bytes().await.map_err(|e| classify_transport(call, &e))?;
        let envelope = ResponseEnvelope::parse_ok(&body)?;

        tracing::debug!(call, nonce = %envelope.nonce, "Management plane call succeeded");
        Ok(envelope)
    }
}

/// Map a transport failure to the error taxonomy.
fn classify_transport(call: &str, err: &reqwest::Error) -> SyncError {
    if let Some(tls) = find_tls_error(err) {
        return SyncError::Auth(format!("{call}: TLS handshake failed: {tls}"));
    }
    if err.is_timeout() {
        return SyncError::Connection(format!("{call}: request timed out"));
    }
    if err.is_decode() {
        return SyncError::Decode(format!("{call}: {err}"));
    }
    SyncError::Connection(format!("{call}: {err}"))
}

#[async_trait]
impl ConfigSource for ManagementClient {
    async fn fetch_configs(&self) -> SyncResult<Vec<ConfigEntry>> {
        ManagementClient::fetch_configs(self).await
    }
}

impl std::fmt::Debug for ManagementClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagementClient")
            .field("base_url", &self.base_url)
            .field("certificate_id", &self.certificate_id)
            .field("insecure_skip_verify", &self.insecure_skip_verify)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(url: &str) -> ManagementConfig {
        ManagementConfig {
            use_management_plane: true,
            connection_string: url.to_string(),
            node_secret: "somesecret".to_string(),
            allow_insecure_configs: true,
            request_timeout_secs: 2,
            ..ManagementConfig::default()
        }
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let client = ManagementClient::new(&test_config("http://dashboard:3000/"), CertificateStore::new()).unwrap();
        assert_eq!(client.endpoint(REGISTER_PATH), "http://dashboard:3000/register/node");
    }

    #[test]
    fn test_insecure_policy_enforced() {
        let mut config = test_config("http://dashboard:3000");
        config.allow_insecure_configs = false;
        let err = ManagementClient::new(&config, CertificateStore::new()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_debug_hides_secret() {
        let client = ManagementClient::new(&test_config("http://dashboard:3000"), CertificateStore::new()).unwrap();
        assert!(!format!("{client:?}").contains("somesecret"));
    }

    #[tokio::test]
    async fn test_missing_certificate_is_auth_error() {
        let mut config = test_config("https://127.0.0.1:1");
        config.certificate_id = "does-not-exist".to_string();
        let client = ManagementClient::new(&config, CertificateStore::new()).unwrap();

        let err = client.register().await.unwrap_err();
        assert!(matches!(err, SyncError::Auth(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_unreachable_is_connection_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = ManagementClient::new(&test_config(&format!("http://{addr}")), CertificateStore::new()).unwrap();
        let err = client.fetch_configs().await.unwrap_err();
        assert!(matches!(err, SyncError::Connection(_)), "got {err:?}");
    }
}
