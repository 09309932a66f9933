//! Error taxonomy for a check run
//!
//! Every variant ends up as an UNKNOWN plugin result; see
//! `impl From<CheckError> for StatusResult` in the status module.

use thiserror::Error;

/// Message reported when any of the required flags is absent
pub const REQUIRED_OPTIONS_MESSAGE: &str = "Required options not specified: [rolearn region alarm]";

/// Errors that can occur while running the check
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckError {
    /// One of --rolearn, --region or --alarm was not given
    #[error("{}", REQUIRED_OPTIONS_MESSAGE)]
    InputMissing,

    /// Broker client configuration is unusable
    #[error("Invalid Vault configuration: {0}")]
    Config(String),

    /// Vault rejected the login or refused to issue credentials
    #[error("Unable to get AWS credentials from secrets engine: {0}")]
    AuthenticationFailed(String),

    /// Vault answered, but not with usable AWS credentials
    #[error("Invalid secrets engine response: {0}")]
    InvalidSecretResponse(String),

    /// No alarm of the requested type matched the name
    #[error("alarm not found - check region and alarm name")]
    AlarmNotFound,

    /// More than one alarm matched a single-name filter
    #[error("expected exactly one alarm, found {0}")]
    AmbiguousAlarm(usize),

    /// --alarmtype was neither metricalarm nor compositealarm
    #[error("Invalid --alarmtype specified: {0}")]
    InvalidAlarmType(String),

    /// DescribeAlarms failed
    #[error("error retrieving alarm data: {0}")]
    QueryFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            CheckError::InputMissing.to_string(),
            "Required options not specified: [rolearn region alarm]"
        );
        assert_eq!(
            CheckError::AlarmNotFound.to_string(),
            "alarm not found - check region and alarm name"
        );
        assert_eq!(
            CheckError::QueryFailed("throttled".into()).to_string(),
            "error retrieving alarm data: throttled"
        );
        assert_eq!(
            CheckError::AmbiguousAlarm(2).to_string(),
            "expected exactly one alarm, found 2"
        );
    }
}
