//! Process exit codes of `snap`
//!
//! Scripts driving snapshot jobs branch on these values, so existing codes
//! never change meaning; new ones are only appended.

use snap_core::Error;

/// Exit status of a `snap` invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    /// Bad arguments, malformed `alias/bucket/key` path, invalid alias settings
    UsageError = 2,
    /// Transport fault or expired upload session, after local retries
    NetworkError = 3,
    AuthError = 4,
    /// Alias, bucket or blob absent
    NotFound = 5,
    /// A listing reported the same blob name twice
    Conflict = 6,
    UnsupportedFeature = 7,
    Interrupted = 130,
}

const TABLE: [(ExitCode, &str); 9] = [
    (ExitCode::Success, "Operation completed successfully"),
    (ExitCode::GeneralError, "General error"),
    (ExitCode::UsageError, "Invalid arguments or path format"),
    (ExitCode::NetworkError, "Network error (retryable)"),
    (ExitCode::AuthError, "Authentication or permission failure"),
    (ExitCode::NotFound, "Resource not found"),
    (ExitCode::Conflict, "Conflicting blob names"),
    (ExitCode::UnsupportedFeature, "Operation not supported by the bucket service"),
    (ExitCode::Interrupted, "Operation interrupted"),
];

impl ExitCode {
    #[inline]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// Look up a raw status; `None` for values outside the table
    pub fn from_i32(code: i32) -> Option<Self> {
        TABLE
            .iter()
            .map(|(exit, _)| *exit)
            .find(|exit| exit.as_i32() == code)
    }

    pub fn description(self) -> &'static str {
        TABLE
            .iter()
            .find(|(exit, _)| *exit == self)
            .map_or("Unknown exit code", |(_, text)| *text)
    }

    /// True when re-running the same command may succeed
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::NetworkError | Self::Interrupted)
    }
}

impl From<&Error> for ExitCode {
    fn from(error: &Error) -> Self {
        Self::from_i32(error.exit_code()).unwrap_or(Self::GeneralError)
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.as_i32()
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.description(), self.as_i32())
    }
}
