//! AWS Credential Exchange
//!
//! Trades an AppRole login for temporary AWS credentials issued by Vault's
//! AWS secrets engine (`aws/sts/<role>`).

use crate::error::CheckError;
use crate::vault::{AppRole, SecretsBroker};
use serde_json::{json, Map, Value};
use std::fmt;
use tracing::{debug, info, warn};

/// Vault path the original deployment issues Nagios credentials from
pub const DEFAULT_STS_PATH: &str = "aws/sts/nagios";

/// Temporary AWS credentials for a single run
///
/// `security_token` is optional: Vault's `iam_user` credential type issues
/// long-lived keys without one, and the AWS client accepts that. STS-backed
/// roles always carry it.
#[derive(Clone, PartialEq, Eq)]
pub struct TemporaryCredentials {
    pub access_key: String,
    pub secret_key: String,
    pub security_token: Option<String>,
}

impl TemporaryCredentials {
    /// Validate the `data` block of a secrets engine response
    pub fn from_secret_data(data: &Map<String, Value>) -> Result<Self, CheckError> {
        let access_key = required_string(data, "access_key")?;
        let secret_key = required_string(data, "secret_key")?;

        let security_token = match data.get("security_token") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.is_empty() => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => {
                return Err(CheckError::InvalidSecretResponse(format!(
                    "security_token is not a string (got {})",
                    json_type(other)
                )))
            }
        };

        Ok(Self {
            access_key,
            secret_key,
            security_token,
        })
    }
}

impl fmt::Debug for TemporaryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemporaryCredentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field(
                "security_token",
                &self.security_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

fn required_string(data: &Map<String, Value>, field: &str) -> Result<String, CheckError> {
    match data.get(field) {
        None | Some(Value::Null) => Err(CheckError::InvalidSecretResponse(format!(
            "{} is missing",
            field
        ))),
        Some(Value::String(s)) if s.is_empty() => Err(CheckError::InvalidSecretResponse(format!(
            "{} is empty",
            field
        ))),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(CheckError::InvalidSecretResponse(format!(
            "{} is not a string (got {})",
            field,
            json_type(other)
        ))),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Logs in to the broker and requests role-scoped AWS credentials
pub struct CredentialExchanger<'a> {
    broker: &'a dyn SecretsBroker,
    approle: AppRole,
    sts_path: String,
    ttl: Option<String>,
}

impl<'a> CredentialExchanger<'a> {
    pub fn new(broker: &'a dyn SecretsBroker, approle: AppRole) -> Self {
        Self {
            broker,
            approle,
            sts_path: DEFAULT_STS_PATH.to_string(),
            ttl: None,
        }
    }

    /// Override the secrets engine path
    pub fn with_sts_path(mut self, path: impl Into<String>) -> Self {
        self.sts_path = path.into();
        self
    }

    /// Request a specific credential lifetime, e.g. `15m`
    pub fn with_ttl(mut self, ttl: impl Into<String>) -> Self {
        self.ttl = Some(ttl.into());
        self
    }

    /// Exchange the AppRole login for credentials scoped to `role_arn`
    pub async fn exchange(&self, role_arn: &str) -> Result<TemporaryCredentials, CheckError> {
        let token = self.broker.login(&self.approle).await?;

        let mut payload = json!({ "role_arn": role_arn });
        if let Some(ttl) = &self.ttl {
            payload["ttl"] = json!(ttl);
        }

        debug!(path = %self.sts_path, role_arn, "Requesting AWS credentials");
        let data = self.broker.write(token, &self.sts_path, payload).await?;
        let credentials = TemporaryCredentials::from_secret_data(&data)?;

        if credentials.security_token.is_none() {
            warn!(
                path = %self.sts_path,
                "Secrets engine returned no security_token; using static keys"
            );
        }

        info!(role_arn, "AWS credentials obtained from Vault");
        Ok(credentials)
    }
}
