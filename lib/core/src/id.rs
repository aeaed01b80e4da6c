//! Strongly-typed ID types for domain entities.
//!
//! Dashboard and widget identifiers are positive 64-bit integers assigned by
//! the store. The newtypes keep the two from being mixed up at call sites and
//! reject zero or negative values at every parsing boundary.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error returned when parsing an ID from a string or raw integer fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of ID that failed to parse.
    pub id_type: &'static str,
    /// The reason for the parse failure.
    pub reason: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {}: {}", self.id_type, self.reason)
    }
}

impl std::error::Error for ParseIdError {}

/// Macro to generate a strongly-typed ID wrapper around a positive i64.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "i64", into = "i64")]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw identifier.
            ///
            /// # Errors
            ///
            /// Returns an error if the value is zero or negative.
            pub fn new(raw: i64) -> Result<Self, ParseIdError> {
                if raw > 0 {
                    Ok(Self(raw))
                } else {
                    Err(ParseIdError {
                        id_type: stringify!($name),
                        reason: format!("{raw} is not a positive integer"),
                    })
                }
            }

            /// Returns the raw integer value.
            #[must_use]
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw: i64 = s.parse().map_err(|_| ParseIdError {
                    id_type: stringify!($name),
                    reason: format!("'{s}' is not an integer"),
                })?;
                Self::new(raw)
            }
        }

        impl TryFrom<i64> for $name {
            type Error = ParseIdError;

            fn try_from(raw: i64) -> Result<Self, Self::Error> {
                Self::new(raw)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(
    /// Unique identifier for a dashboard.
    DashboardId
);

define_id!(
    /// Unique identifier for a widget on a dashboard.
    WidgetId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widget_id_display_is_bare_integer() {
        let id = WidgetId::new(42).expect("positive id");
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn parse_roundtrip() {
        let id = DashboardId::new(7).expect("positive id");
        let parsed: DashboardId = id.to_string().parse().expect("should parse");
        assert_eq!(id, parsed);
    }

    #[test]
    fn zero_is_rejected() {
        let result = WidgetId::new(0);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.id_type, "WidgetId");
    }

    #[test]
    fn negative_is_rejected() {
        assert!(WidgetId::new(-3).is_err());
        assert!("-3".parse::<WidgetId>().is_err());
    }

    #[test]
    fn parse_non_numeric_fails() {
        let result: Result<WidgetId, _> = "abc".parse();
        assert!(result.is_err());
    }

    #[test]
    fn serde_rejects_non_positive() {
        let ok: WidgetId = serde_json::from_str("5").expect("positive deserializes");
        assert_eq!(ok.as_i64(), 5);
        let err: Result<WidgetId, _> = serde_json::from_str("0");
        assert!(err.is_err());
    }

    #[test]
    fn serde_roundtrip() {
        let id = WidgetId::new(99).expect("positive id");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "99");
        let parsed: WidgetId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(id, parsed);
    }

    #[test]
    fn ids_are_distinct_types() {
        use std::collections::HashSet;

        let a = WidgetId::new(1).expect("positive id");
        let b = WidgetId::new(2).expect("positive id");

        let mut set = HashSet::new();
        set.insert(a);
        set.insert(b);
        set.insert(a);

        assert_eq!(set.len(), 2);
    }
}
