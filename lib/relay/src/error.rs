//! Error types for the relay crate.
//!
//! Each pipeline layer has its own error type:
//! - `NetworkError`: transport failures from the HTTP client adapter
//! - `NormalizeError`: response-shape failures from the normalizer
//! - `StoreError`: failures crossing the widget store boundary
//! - `RelayError`: the typed failure surface callers match on
//!
//! Failures never cross the relay boundary as strings; callers map the
//! variants to wire codes or UI states without message matching.

use dashwire_core::WidgetId;
use std::fmt;

/// Transport-level failures from the HTTP client adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// The call did not complete within the configured bound.
    Timeout { url: String },
    /// A connection to the target could not be established.
    ConnectionFailed { url: String, reason: String },
    /// The target URL was rejected by the transport.
    InvalidUrl { url: String, reason: String },
    /// The request could not be built or sent.
    RequestFailed { reason: String },
    /// A file attachment could not be read from temporary storage.
    AttachmentUnreadable { path: String, reason: String },
}

impl NetworkError {
    /// Returns true for the timeout subtype.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout { url } => write!(f, "call to '{url}' timed out"),
            Self::ConnectionFailed { url, reason } => {
                write!(f, "failed to connect to '{url}': {reason}")
            }
            Self::InvalidUrl { url, reason } => {
                write!(f, "invalid webhook url '{url}': {reason}")
            }
            Self::RequestFailed { reason } => write!(f, "request failed: {reason}"),
            Self::AttachmentUnreadable { path, reason } => {
                write!(f, "attachment '{path}' could not be read: {reason}")
            }
        }
    }
}

impl std::error::Error for NetworkError {}

/// Response-shape failures from the normalizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    /// The body declared `application/json` but did not parse.
    InvalidJson { reason: String },
}

impl fmt::Display for NormalizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidJson { reason } => write!(f, "invalid json response: {reason}"),
        }
    }
}

impl std::error::Error for NormalizeError {}

/// Failures crossing the widget store boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached or the query failed.
    Unavailable { reason: String },
    /// The store rejected access to the widget.
    PermissionDenied { widget_id: WidgetId },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable { reason } => write!(f, "widget store unavailable: {reason}"),
            Self::PermissionDenied { widget_id } => {
                write!(f, "access denied to widget {widget_id}")
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// Typed failure surface of a refresh or submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    /// No widget with this id.
    NotFound { widget_id: WidgetId },
    /// The widget exists but has no webhook configured.
    NotConfigured { widget_id: WidgetId },
    /// The outbound call failed at the transport layer.
    NetworkFailure(NetworkError),
    /// The webhook answered outside the 2xx range.
    UpstreamStatus { status: u16 },
    /// The response could not be shaped for the widget type.
    BadResponseShape(NormalizeError),
    /// The widget store is unreachable.
    StoreUnavailable { reason: String },
    /// The caller is not allowed to touch this widget.
    PermissionDenied { widget_id: WidgetId },
}

impl RelayError {
    /// Stable machine-readable code for the wire contract.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::NotConfigured { .. } => "not_configured",
            Self::NetworkFailure(_) => "network_failure",
            Self::UpstreamStatus { .. } => "upstream_status",
            Self::BadResponseShape(_) => "bad_response_shape",
            Self::StoreUnavailable { .. } => "store_unavailable",
            Self::PermissionDenied { .. } => "permission_denied",
        }
    }
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { widget_id } => write!(f, "widget {widget_id} not found"),
            Self::NotConfigured { widget_id } => {
                write!(f, "widget {widget_id} has no webhook configured")
            }
            Self::NetworkFailure(e) => write!(f, "webhook call failed: {e}"),
            Self::UpstreamStatus { status } => {
                write!(f, "webhook answered with status {status}")
            }
            Self::BadResponseShape(e) => write!(f, "webhook response unusable: {e}"),
            Self::StoreUnavailable { reason } => write!(f, "widget store unavailable: {reason}"),
            Self::PermissionDenied { widget_id } => {
                write!(f, "access denied to widget {widget_id}")
            }
        }
    }
}

impl std::error::Error for RelayError {}

impl From<NetworkError> for RelayError {
    fn from(e: NetworkError) -> Self {
        Self::NetworkFailure(e)
    }
}

impl From<NormalizeError> for RelayError {
    fn from(e: NormalizeError) -> Self {
        Self::BadResponseShape(e)
    }
}

impl From<StoreError> for RelayError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Unavailable { reason } => Self::StoreUnavailable { reason },
            StoreError::PermissionDenied { widget_id } => Self::PermissionDenied { widget_id },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_error_display() {
        let err = NetworkError::Timeout {
            url: "https://hooks.example.net/run".to_string(),
        };
        assert!(err.is_timeout());
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn relay_error_codes_are_stable() {
        let widget_id = WidgetId::new(3).expect("positive id");
        assert_eq!(RelayError::NotFound { widget_id }.code(), "not_found");
        assert_eq!(
            RelayError::NotConfigured { widget_id }.code(),
            "not_configured"
        );
        assert_eq!(RelayError::UpstreamStatus { status: 500 }.code(), "upstream_status");
        assert_eq!(
            RelayError::PermissionDenied { widget_id }.code(),
            "permission_denied"
        );
    }

    #[test]
    fn store_error_maps_to_distinct_relay_variants() {
        let widget_id = WidgetId::new(9).expect("positive id");

        let unavailable: RelayError = StoreError::Unavailable {
            reason: "pool exhausted".to_string(),
        }
        .into();
        assert_eq!(unavailable.code(), "store_unavailable");

        let denied: RelayError = StoreError::PermissionDenied { widget_id }.into();
        assert_eq!(denied.code(), "permission_denied");
    }

    #[test]
    fn normalize_error_display() {
        let err = NormalizeError::InvalidJson {
            reason: "expected value at line 1".to_string(),
        };
        assert!(err.to_string().contains("invalid json"));
    }
}
