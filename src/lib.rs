//! CloudWatch Alarm Check Library
//!
//! Monitoring-plugin core: logs in to Vault with AppRole, exchanges the
//! token for temporary AWS credentials, and reports the state of a single
//! CloudWatch alarm as an OK / CRITICAL / UNKNOWN plugin result.

pub mod alarm;
pub mod check;
pub mod credentials;
pub mod error;
pub mod status;
pub mod vault;

#[cfg(test)]
mod testing;

pub use alarm::{AlarmQuery, AlarmSource, AlarmStateEvaluator, AlarmType, CloudWatchSource};
pub use check::CheckRequest;
pub use credentials::{CredentialExchanger, TemporaryCredentials};
pub use error::CheckError;
pub use status::{StatusLevel, StatusResult};
pub use vault::{SecretsBroker, VaultClient, VaultConfig};
