//! Test doubles for the broker and monitoring seams

use crate::alarm::{AlarmSource, DescribedAlarms};
use crate::credentials::TemporaryCredentials;
use crate::error::CheckError;
use crate::vault::{AppRole, SecretsBroker, SessionToken};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Mutex;

pub fn credentials() -> TemporaryCredentials {
    TemporaryCredentials {
        access_key: "ASIAEXAMPLE".into(),
        secret_key: "secret".into(),
        security_token: Some("session".into()),
    }
}

/// Broker that records calls and replays canned answers
pub struct FakeBroker {
    login: Result<String, CheckError>,
    secret: Result<Map<String, Value>, CheckError>,
    calls: Mutex<Vec<&'static str>>,
    writes: Mutex<Vec<(String, Value, String)>>,
}

impl FakeBroker {
    pub fn issuing(data: Value) -> Self {
        Self {
            login: Ok("s.fake".into()),
            secret: Ok(data.as_object().cloned().unwrap_or_default()),
            calls: Mutex::new(Vec::new()),
            writes: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_login(reason: &str) -> Self {
        Self {
            login: Err(CheckError::AuthenticationFailed(reason.to_string())),
            ..Self::issuing(Value::Null)
        }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    /// Path, payload and token of the most recent write
    pub fn last_write(&self) -> Option<(String, Value, String)> {
        self.writes.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl SecretsBroker for FakeBroker {
    async fn login(&self, _approle: &AppRole) -> Result<SessionToken, CheckError> {
        self.calls.lock().unwrap().push("login");
        self.login.clone().map(SessionToken::new)
    }

    async fn write(
        &self,
        token: SessionToken,
        path: &str,
        payload: Value,
    ) -> Result<Map<String, Value>, CheckError> {
        self.calls.lock().unwrap().push("write");
        self.writes
            .lock()
            .unwrap()
            .push((path.to_string(), payload, token.expose().to_string()));
        self.secret.clone()
    }
}

/// Alarm source that records (region, alarm name) per request
pub struct FakeAlarms {
    result: Result<DescribedAlarms, CheckError>,
    requests: Mutex<Vec<(String, String)>>,
}

impl FakeAlarms {
    pub fn returning(alarms: DescribedAlarms) -> Self {
        Self {
            result: Ok(alarms),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(detail: &str) -> Self {
        Self {
            result: Err(CheckError::QueryFailed(detail.to_string())),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlarmSource for FakeAlarms {
    async fn describe_alarms(
        &self,
        _credentials: &TemporaryCredentials,
        region: &str,
        alarm_name: &str,
    ) -> Result<DescribedAlarms, CheckError> {
        self.requests
            .lock()
            .unwrap()
            .push((region.to_string(), alarm_name.to_string()));
        self.result.clone()
    }
}
