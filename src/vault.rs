//! HashiCorp Vault Client
//!
//! Talks to Vault over its HTTP API. Only two calls are needed by the check:
//! an AppRole login and a write to the AWS secrets engine.
//!
//! Configuration follows the Vault CLI conventions:
//! - `VAULT_ADDR`: server address (default `https://127.0.0.1:8200`)
//! - `VAULT_CACERT`: PEM file with an extra trusted CA
//! - `VAULT_SKIP_VERIFY`: disable TLS verification
//! - `VAULT_CLIENT_TIMEOUT`: request timeout in seconds (default 60)
//! - `VAULT_NAMESPACE`: Vault Enterprise namespace
//! - `VAULT_ROLE_ID` / `VAULT_SECRET_ID`: AppRole credentials

use crate::error::CheckError;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_VAULT_ADDR: &str = "https://127.0.0.1:8200";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const APPROLE_LOGIN_PATH: &str = "auth/approle/login";

// ============================================================
// Configuration
// ============================================================

/// AppRole login credentials
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AppRole {
    pub role_id: String,
    pub secret_id: String,
}

impl AppRole {
    pub fn new(role_id: impl Into<String>, secret_id: impl Into<String>) -> Self {
        Self {
            role_id: role_id.into(),
            secret_id: secret_id.into(),
        }
    }
}

impl fmt::Debug for AppRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppRole")
            .field("role_id", &self.role_id)
            .field("secret_id", &"<redacted>")
            .finish()
    }
}

/// Vault client configuration
#[derive(Debug, Clone)]
pub struct VaultConfig {
    pub address: String,
    pub approle: AppRole,
    pub namespace: Option<String>,
    pub timeout: Duration,
    pub skip_tls_verify: bool,
    pub ca_cert_path: Option<String>,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_VAULT_ADDR.to_string(),
            approle: AppRole::default(),
            namespace: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            skip_tls_verify: false,
            ca_cert_path: None,
        }
    }
}

impl VaultConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, CheckError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// Unset AppRole variables become empty strings; Vault rejects them at login.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CheckError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let timeout = match non_empty("VAULT_CLIENT_TIMEOUT") {
            Some(raw) => parse_timeout(&raw).ok_or_else(|| {
                CheckError::Config(format!("VAULT_CLIENT_TIMEOUT is not a duration: {}", raw))
            })?,
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        Ok(Self {
            address: non_empty("VAULT_ADDR").unwrap_or_else(|| DEFAULT_VAULT_ADDR.to_string()),
            approle: AppRole::new(
                lookup("VAULT_ROLE_ID").unwrap_or_default(),
                lookup("VAULT_SECRET_ID").unwrap_or_default(),
            ),
            namespace: non_empty("VAULT_NAMESPACE"),
            timeout,
            skip_tls_verify: non_empty("VAULT_SKIP_VERIFY")
                .map(|v| parse_bool(&v))
                .unwrap_or(false),
            ca_cert_path: non_empty("VAULT_CACERT"),
        })
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    pub fn with_approle(mut self, role_id: impl Into<String>, secret_id: impl Into<String>) -> Self {
        self.approle = AppRole::new(role_id, secret_id);
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Accepts `60` or `60s`
fn parse_timeout(raw: &str) -> Option<Duration> {
    raw.trim()
        .trim_end_matches('s')
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn parse_bool(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "1" | "t" | "true")
}

// ============================================================
// Broker capability
// ============================================================

/// Short-lived Vault token, consumed by a single secret write
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

/// What the check needs from a secrets broker
#[async_trait]
pub trait SecretsBroker: Send + Sync {
    /// AppRole login; yields a client token
    async fn login(&self, approle: &AppRole) -> Result<SessionToken, CheckError>;

    /// Write `payload` to `path` with `token`, returning the response `data`
    async fn write(
        &self,
        token: SessionToken,
        path: &str,
        payload: Value,
    ) -> Result<Map<String, Value>, CheckError>;
}

// ============================================================
// HTTP implementation
// ============================================================

#[derive(Debug, Default, Deserialize)]
struct VaultResponse {
    #[serde(default)]
    data: Option<Map<String, Value>>,
    #[serde(default)]
    auth: Option<VaultAuth>,
}

#[derive(Debug, Deserialize)]
struct VaultAuth {
    client_token: String,
}

#[derive(Debug, Deserialize)]
struct VaultErrors {
    #[serde(default)]
    errors: Vec<String>,
}

/// Vault HTTP API client
pub struct VaultClient {
    client: Client,
    config: VaultConfig,
}

impl VaultClient {
    pub fn new(config: VaultConfig) -> Result<Self, CheckError> {
        let mut builder = Client::builder()
            .user_agent(concat!("check-cloudwatch/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout);

        if config.skip_tls_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let Some(path) = &config.ca_cert_path {
            let pem = std::fs::read(path)
                .map_err(|e| CheckError::Config(format!("failed to read CA file {}: {}", path, e)))?;
            let cert = reqwest::Certificate::from_pem(&pem)
                .map_err(|e| CheckError::Config(format!("invalid CA file {}: {}", path, e)))?;
            builder = builder.add_root_certificate(cert);
        }

        let client = builder
            .build()
            .map_err(|e| CheckError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/v1/{}",
            self.config.address.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Vault's logical write: POST with a JSON body, returning the 2xx body
    async fn post(
        &self,
        path: &str,
        token: Option<&SessionToken>,
        payload: &Value,
    ) -> Result<String> {
        let url = self.url(path);
        debug!("POST {}", url);

        let mut request = self.client.post(&url).json(payload);
        if let Some(namespace) = &self.config.namespace {
            request = request.header("X-Vault-Namespace", namespace);
        }
        if let Some(token) = token {
            request = request.header("X-Vault-Token", token.expose());
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to reach Vault at {}", self.config.address))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Vault returned {} for {}: {}", status, path, error_detail(&body));
        }

        response
            .text()
            .await
            .with_context(|| format!("Failed to read Vault response for {}", path))
    }
}

/// An empty 2xx body (e.g. 204 No Content) carries neither data nor auth
fn parse_response(body: &str) -> serde_json::Result<VaultResponse> {
    if body.trim().is_empty() {
        return Ok(VaultResponse::default());
    }
    serde_json::from_str(body)
}

/// Joins Vault's `errors` array, falling back to the raw body
fn error_detail(body: &str) -> String {
    match serde_json::from_str::<VaultErrors>(body) {
        Ok(parsed) if !parsed.errors.is_empty() => parsed.errors.join(", "),
        _ => body.trim().to_string(),
    }
}

#[async_trait]
impl SecretsBroker for VaultClient {
    async fn login(&self, approle: &AppRole) -> Result<SessionToken, CheckError> {
        debug!(role_id = %approle.role_id, "Authenticating to Vault with AppRole");

        let payload = json!({
            "role_id": approle.role_id,
            "secret_id": approle.secret_id,
        });

        let body = self
            .post(APPROLE_LOGIN_PATH, None, &payload)
            .await
            .map_err(|e| CheckError::AuthenticationFailed(format!("{:#}", e)))?;
        let response = parse_response(&body).map_err(|e| {
            CheckError::AuthenticationFailed(format!("Failed to parse Vault login response: {}", e))
        })?;

        let auth = response.auth.ok_or_else(|| {
            CheckError::AuthenticationFailed("Vault login response has no auth block".to_string())
        })?;

        info!("Authenticated to Vault");
        Ok(SessionToken::new(auth.client_token))
    }

    async fn write(
        &self,
        token: SessionToken,
        path: &str,
        payload: Value,
    ) -> Result<Map<String, Value>, CheckError> {
        let body = self
            .post(path, Some(&token), &payload)
            .await
            .map_err(|e| CheckError::AuthenticationFailed(format!("{:#}", e)))?;
        let response = parse_response(&body).map_err(|e| {
            CheckError::InvalidSecretResponse(format!("{} did not return JSON: {}", path, e))
        })?;

        Ok(response.data.unwrap_or_default())
    }
}
