//! Domain error types for server operations.
//!
//! Relay failures already arrive typed; this module covers the failures the
//! server itself can produce while accepting a submission or starting up.

use std::fmt;

/// Errors while accepting a custom-widget submission.
#[derive(Debug)]
pub enum SubmitError {
    /// The request payload could not be parsed.
    InvalidPayload { reason: String },
    /// A submitted file exceeds the configured size limit.
    UploadTooLarge { limit_bytes: u64 },
    /// A file upload could not be spooled to temporary storage.
    SpoolFailed { reason: String },
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPayload { reason } => {
                write!(f, "invalid submission payload: {reason}")
            }
            Self::UploadTooLarge { limit_bytes } => {
                write!(f, "uploaded file exceeds the {limit_bytes} byte limit")
            }
            Self::SpoolFailed { reason } => {
                write!(f, "failed to store uploaded file: {reason}")
            }
        }
    }
}

impl std::error::Error for SubmitError {}

/// Errors while bringing the database up.
#[derive(Debug)]
pub enum DbInitError {
    /// Could not connect to the database.
    ConnectFailed { details: String },
    /// Migrations failed to apply.
    MigrationFailed { details: String },
}

impl fmt::Display for DbInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectFailed { details } => {
                write!(f, "database connection failed: {details}")
            }
            Self::MigrationFailed { details } => {
                write!(f, "database migration failed: {details}")
            }
        }
    }
}

impl std::error::Error for DbInitError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_error_display() {
        let err = SubmitError::UploadTooLarge {
            limit_bytes: 1024,
        };
        assert!(err.to_string().contains("1024"));
    }

    #[test]
    fn db_init_error_display() {
        let err = DbInitError::ConnectFailed {
            details: "connection refused".to_string(),
        };
        assert!(err.to_string().contains("connection refused"));
    }
}
