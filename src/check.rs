//! Check Pipeline
//!
//! Input validation, credential exchange, alarm lookup and classification in
//! one Result-returning pass. Every failure becomes a [`StatusResult`]; the
//! caller decides how to exit.

use crate::alarm::{AlarmQuery, AlarmSource, AlarmStateEvaluator, AlarmType};
use crate::credentials::CredentialExchanger;
use crate::error::CheckError;
use crate::status::StatusResult;
use tracing::warn;

/// A validated check invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckRequest {
    pub role_arn: String,
    pub query: AlarmQuery,
}

impl CheckRequest {
    /// Build a request from raw flag values; empty strings count as missing
    pub fn new(
        role_arn: Option<String>,
        region: Option<String>,
        alarm: Option<String>,
        alarm_type: &str,
    ) -> Result<Self, CheckError> {
        let present = |v: Option<String>| v.filter(|s| !s.is_empty());

        let (Some(role_arn), Some(region), Some(alarm_name)) =
            (present(role_arn), present(region), present(alarm))
        else {
            return Err(CheckError::InputMissing);
        };

        let alarm_type: AlarmType = alarm_type.parse()?;

        Ok(Self {
            role_arn,
            query: AlarmQuery {
                alarm_name,
                alarm_type,
                region,
            },
        })
    }
}

/// Run one check: credentials first, then the alarm query
pub async fn run(
    exchanger: &CredentialExchanger<'_>,
    source: &dyn AlarmSource,
    request: &CheckRequest,
) -> StatusResult {
    match evaluate(exchanger, source, request).await {
        Ok(status) => status,
        Err(err) => {
            warn!(alarm = %request.query.alarm_name, "Check failed: {}", err);
            err.into()
        }
    }
}

async fn evaluate(
    exchanger: &CredentialExchanger<'_>,
    source: &dyn AlarmSource,
    request: &CheckRequest,
) -> Result<StatusResult, CheckError> {
    let credentials = exchanger.exchange(&request.role_arn).await?;
    AlarmStateEvaluator::new(source)
        .evaluate(&credentials, &request.query)
        .await
}
