//! CloudWatch Alarm Evaluation
//!
//! Describes a single named alarm and classifies its state into a plugin
//! status. The monitoring service sits behind [`AlarmSource`] so the
//! evaluator can run against a test double.

use crate::credentials::TemporaryCredentials;
use crate::error::CheckError;
use crate::status::StatusResult;
use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::BehaviorVersion;
use aws_sdk_cloudwatch::config::{Credentials, Region};
use aws_sdk_cloudwatch::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_cloudwatch::types::AlarmType as CloudWatchAlarmType;
use std::error::Error as StdError;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// Longest error detail placed on the status line
const MAX_ERROR_DETAIL: usize = 256;

/// Which alarm family the check reports on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlarmType {
    #[default]
    Metric,
    Composite,
}

impl FromStr for AlarmType {
    type Err = CheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "metricalarm" => Ok(AlarmType::Metric),
            "compositealarm" => Ok(AlarmType::Composite),
            other => Err(CheckError::InvalidAlarmType(other.to_string())),
        }
    }
}

impl fmt::Display for AlarmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlarmType::Metric => write!(f, "metricalarm"),
            AlarmType::Composite => write!(f, "compositealarm"),
        }
    }
}

/// The alarm to look up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmQuery {
    pub alarm_name: String,
    pub alarm_type: AlarmType,
    pub region: String,
}

/// Current state of one alarm
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmObservation {
    pub state_value: String,
    pub state_reason: String,
}

impl AlarmObservation {
    pub fn new(state_value: impl Into<String>, state_reason: impl Into<String>) -> Self {
        Self {
            state_value: state_value.into(),
            state_reason: state_reason.into(),
        }
    }
}

/// DescribeAlarms result, split by family
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescribedAlarms {
    pub metric_alarms: Vec<AlarmObservation>,
    pub composite_alarms: Vec<AlarmObservation>,
}

impl DescribedAlarms {
    pub fn into_family(self, alarm_type: AlarmType) -> Vec<AlarmObservation> {
        match alarm_type {
            AlarmType::Metric => self.metric_alarms,
            AlarmType::Composite => self.composite_alarms,
        }
    }
}

/// Anything that can describe alarms by name
#[async_trait]
pub trait AlarmSource: Send + Sync {
    /// Describe alarms named `alarm_name` in `region`, both families
    async fn describe_alarms(
        &self,
        credentials: &TemporaryCredentials,
        region: &str,
        alarm_name: &str,
    ) -> Result<DescribedAlarms, CheckError>;
}

// ============================================================
// CloudWatch implementation
// ============================================================

/// AWS CloudWatch backed alarm source
#[derive(Debug, Clone, Default)]
pub struct CloudWatchSource {
    endpoint_url: Option<String>,
}

impl CloudWatchSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send requests to a custom endpoint (e.g. LocalStack)
    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }

    async fn client(
        &self,
        credentials: &TemporaryCredentials,
        region: &str,
    ) -> aws_sdk_cloudwatch::Client {
        let static_credentials = Credentials::new(
            credentials.access_key.clone(),
            credentials.secret_key.clone(),
            credentials.security_token.clone(),
            None,
            "vault",
        );

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(static_credentials)
            .retry_config(RetryConfig::disabled());
        if let Some(endpoint) = self.endpoint_url.as_deref() {
            loader = loader.endpoint_url(endpoint);
        }

        aws_sdk_cloudwatch::Client::new(&loader.load().await)
    }
}

#[async_trait]
impl AlarmSource for CloudWatchSource {
    async fn describe_alarms(
        &self,
        credentials: &TemporaryCredentials,
        region: &str,
        alarm_name: &str,
    ) -> Result<DescribedAlarms, CheckError> {
        let client = self.client(credentials, region).await;

        debug!(region, alarm_name, "Calling DescribeAlarms");
        let output = client
            .describe_alarms()
            .alarm_names(alarm_name)
            .alarm_types(CloudWatchAlarmType::CompositeAlarm)
            .alarm_types(CloudWatchAlarmType::MetricAlarm)
            .send()
            .await
            .map_err(|e| {
                debug!("DescribeAlarms failed: {}", DisplayErrorContext(&e));
                CheckError::QueryFailed(error_detail(e.code(), e.message(), &e))
            })?;

        let metric_alarms = output
            .metric_alarms
            .unwrap_or_default()
            .into_iter()
            .map(|alarm| {
                observation(
                    alarm.state_value.as_ref().map(|v| v.as_str()),
                    alarm.state_reason,
                )
            })
            .collect();

        let composite_alarms = output
            .composite_alarms
            .unwrap_or_default()
            .into_iter()
            .map(|alarm| {
                observation(
                    alarm.state_value.as_ref().map(|v| v.as_str()),
                    alarm.state_reason,
                )
            })
            .collect();

        Ok(DescribedAlarms {
            metric_alarms,
            composite_alarms,
        })
    }
}

/// `Code: message` when the service says so, otherwise the Display chain
fn error_detail(
    code: Option<&str>,
    message: Option<&str>,
    err: &(dyn StdError + 'static),
) -> String {
    let detail = match (code, message) {
        (Some(code), Some(message)) => format!("{}: {}", code, message),
        (Some(code), None) => code.to_string(),
        (None, Some(message)) => message.to_string(),
        (None, None) => {
            let mut parts = vec![err.to_string()];
            let mut source = err.source();
            while let Some(cause) = source {
                parts.push(cause.to_string());
                source = cause.source();
            }
            parts.join(": ")
        }
    };

    truncate(&detail, MAX_ERROR_DETAIL)
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max - 3;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

fn observation(state_value: Option<&str>, state_reason: Option<String>) -> AlarmObservation {
    AlarmObservation {
        state_value: state_value.unwrap_or_default().to_string(),
        state_reason: state_reason.unwrap_or_default(),
    }
}

// ============================================================
// Evaluation
// ============================================================

/// Looks up one alarm and turns its state into a plugin status
pub struct AlarmStateEvaluator<'a> {
    source: &'a dyn AlarmSource,
}

impl<'a> AlarmStateEvaluator<'a> {
    pub fn new(source: &'a dyn AlarmSource) -> Self {
        Self { source }
    }

    pub async fn evaluate(
        &self,
        credentials: &TemporaryCredentials,
        query: &AlarmQuery,
    ) -> Result<StatusResult, CheckError> {
        let described = self
            .source
            .describe_alarms(credentials, &query.region, &query.alarm_name)
            .await?;

        let observation = single_match(described.into_family(query.alarm_type))?;
        info!(
            alarm = %query.alarm_name,
            alarm_type = %query.alarm_type,
            state = %observation.state_value,
            "Alarm state retrieved"
        );

        Ok(classify(observation))
    }
}

/// A name filter must match exactly one alarm
fn single_match(mut alarms: Vec<AlarmObservation>) -> Result<AlarmObservation, CheckError> {
    match alarms.len() {
        0 => Err(CheckError::AlarmNotFound),
        1 => Ok(alarms.remove(0)),
        n => Err(CheckError::AmbiguousAlarm(n)),
    }
}

/// OK and ALARM are definite; every other state is UNKNOWN
pub fn classify(observation: AlarmObservation) -> StatusResult {
    match observation.state_value.as_str() {
        "OK" => StatusResult::ok(observation.state_reason),
        "ALARM" => StatusResult::critical(observation.state_reason),
        _ => StatusResult::unknown(observation.state_reason),
    }
}
