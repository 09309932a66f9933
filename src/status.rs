//! Plugin Status Protocol
//!
//! The four-level result consumed by the monitoring host: a single line
//! `<LEVEL> <message>` on stdout and a matching process exit code.

use crate::error::CheckError;
use std::fmt;
use std::io::{self, Write};

/// Plugin status level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Ok,
    /// Reserved; this check never reports it
    Warning,
    Critical,
    Unknown,
}

impl StatusLevel {
    /// Process exit code for this level
    pub fn exit_code(self) -> i32 {
        match self {
            StatusLevel::Ok => 0,
            StatusLevel::Warning => 1,
            StatusLevel::Critical => 2,
            StatusLevel::Unknown => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StatusLevel::Ok => "OK",
            StatusLevel::Warning => "WARNING",
            StatusLevel::Critical => "CRITICAL",
            StatusLevel::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for StatusLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal result of a check run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusResult {
    pub level: StatusLevel,
    pub message: String,
}

impl StatusResult {
    pub fn new(level: StatusLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    pub fn ok(message: impl Into<String>) -> Self {
        Self::new(StatusLevel::Ok, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(StatusLevel::Warning, message)
    }

    pub fn critical(message: impl Into<String>) -> Self {
        Self::new(StatusLevel::Critical, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(StatusLevel::Unknown, message)
    }

    pub fn exit_code(&self) -> i32 {
        self.level.exit_code()
    }

    /// Print the status line, flush stdout and terminate the process.
    ///
    /// This is the only place the check exits.
    pub fn exit(self) -> ! {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        // Nothing useful can be done if stdout is gone; the exit code still carries the level.
        let _ = writeln!(out, "{}", self);
        let _ = out.flush();
        std::process::exit(self.exit_code())
    }
}

impl fmt::Display for StatusResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.level)
        } else {
            write!(f, "{} {}", self.level, self.message)
        }
    }
}

impl From<CheckError> for StatusResult {
    fn from(err: CheckError) -> Self {
        StatusResult::unknown(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(StatusLevel::Ok.exit_code(), 0);
        assert_eq!(StatusLevel::Warning.exit_code(), 1);
        assert_eq!(StatusLevel::Critical.exit_code(), 2);
        assert_eq!(StatusLevel::Unknown.exit_code(), 3);
    }

    #[test]
    fn test_status_line_format() {
        assert_eq!(StatusResult::ok("within bounds").to_string(), "OK within bounds");
        assert_eq!(
            StatusResult::critical("threshold breached").to_string(),
            "CRITICAL threshold breached"
        );
        assert_eq!(StatusResult::warning("").to_string(), "WARNING");
    }

    #[test]
    fn test_errors_map_to_unknown() {
        let status: StatusResult = CheckError::InputMissing.into();
        assert_eq!(status.level, StatusLevel::Unknown);
        assert_eq!(status.exit_code(), 3);
        assert_eq!(
            status.to_string(),
            "UNKNOWN Required options not specified: [rolearn region alarm]"
        );

        let status: StatusResult = CheckError::AuthenticationFailed("denied".into()).into();
        assert_eq!(status.level, StatusLevel::Unknown);
        assert!(status.message.contains("denied"));
    }
}
