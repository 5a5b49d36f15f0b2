//! Error types for calendar integrations and sync.

use std::fmt;

use chrono::NaiveDate;
use thiserror::Error;

/// Category of an integration failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntegrationErrorCode {
    /// Credentials missing, invalid or expired.
    AuthenticationFailed,
    /// Connection, timeout or DNS failure.
    NetworkError,
    /// Too many requests.
    RateLimited,
    /// Response could not be parsed.
    InvalidResponse,
    /// Calendar does not exist.
    NotFound,
    /// Source is misconfigured (bad path, missing file).
    ConfigurationError,
    /// Source is deliberately unavailable.
    Unavailable,
}

impl IntegrationErrorCode {
    /// Returns true if a later attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError | Self::RateLimited | Self::Unavailable
        )
    }

    /// Snake-case name of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "authentication_failed",
            Self::NetworkError => "network_error",
            Self::RateLimited => "rate_limited",
            Self::InvalidResponse => "invalid_response",
            Self::NotFound => "not_found",
            Self::ConfigurationError => "configuration_error",
            Self::Unavailable => "unavailable",
        }
    }
}

impl fmt::Display for IntegrationErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reported by a [`CalendarSource`](crate::CalendarSource).
#[derive(Debug, Error)]
pub struct IntegrationError {
    code: IntegrationErrorCode,
    message: String,
    source_name: Option<String>,
    #[source]
    cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl IntegrationError {
    /// Creates an error with the given code and message.
    pub fn new(code: IntegrationErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source_name: None,
            cause: None,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(IntegrationErrorCode::NetworkError, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(IntegrationErrorCode::InvalidResponse, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(IntegrationErrorCode::NotFound, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(IntegrationErrorCode::ConfigurationError, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(IntegrationErrorCode::Unavailable, message)
    }

    /// Tags the error with the name of the source that raised it.
    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = Some(name.into());
        self
    }

    /// Attaches the underlying cause.
    pub fn with_cause<E>(mut self, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn code(&self) -> IntegrationErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn source_name(&self) -> Option<&str> {
        self.source_name.as_deref()
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl fmt::Display for IntegrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref name) = self.source_name {
            write!(f, "[{name}] ")?;
        }
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Result type for calendar source calls.
pub type IntegrationResult<T> = Result<T, IntegrationError>;

/// Failure of a busy-interval fetch.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The calendar list could not be retrieved.
    #[error("listing calendars failed: {0}")]
    ListCalendars(#[source] IntegrationError),

    /// Events of one calendar could not be retrieved.
    #[error("listing events of calendar {calendar_id:?} failed: {source}")]
    ListEvents {
        calendar_id: String,
        #[source]
        source: IntegrationError,
    },

    /// Range end precedes its start.
    #[error("invalid range: end {end} is before start {start}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
}

impl SyncError {
    /// Returns the integration failure behind this error, if any.
    pub fn integration(&self) -> Option<&IntegrationError> {
        match self {
            SyncError::ListCalendars(err) | SyncError::ListEvents { source: err, .. } => Some(err),
            SyncError::InvalidRange { .. } => None,
        }
    }

    /// Returns true if repeating the same fetch later may succeed.
    pub fn is_retryable(&self) -> bool {
        self.integration().is_some_and(IntegrationError::is_retryable)
    }
}

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;
