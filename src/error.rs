//! Unified error handling for the route-pacer library.
//!
//! Matching and split operations signal missing data with `Option` and never
//! fail. Errors only surface on the route store boundary: validating routes,
//! persisting them, and recording new personal records.

use std::fmt;

/// Unified error type for route-pacer operations.
#[derive(Debug, Clone)]
pub enum RoutePacerError {
    /// A saved route violates its invariants
    InvalidRoute { route_id: String, message: String },
    /// No route with the given id exists in the store
    RouteNotFound { route_id: String },
    /// Persistence/storage error
    Persistence { message: String },
    /// Encoding or decoding of stored data failed
    Serialization { message: String },
    /// Generic internal error
    Internal { message: String },
}

impl fmt::Display for RoutePacerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutePacerError::InvalidRoute { route_id, message } => {
                write!(f, "Route '{}' is invalid: {}", route_id, message)
            }
            RoutePacerError::RouteNotFound { route_id } => {
                write!(f, "Route '{}' not found", route_id)
            }
            RoutePacerError::Persistence { message } => {
                write!(f, "Persistence error: {}", message)
            }
            RoutePacerError::Serialization { message } => {
                write!(f, "Serialization error: {}", message)
            }
            RoutePacerError::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for RoutePacerError {}

#[cfg(feature = "persistence")]
impl From<rusqlite::Error> for RoutePacerError {
    fn from(err: rusqlite::Error) -> Self {
        RoutePacerError::Persistence {
            message: err.to_string(),
        }
    }
}

#[cfg(feature = "persistence")]
impl From<rmp_serde::encode::Error> for RoutePacerError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        RoutePacerError::Serialization {
            message: err.to_string(),
        }
    }
}

#[cfg(feature = "persistence")]
impl From<rmp_serde::decode::Error> for RoutePacerError {
    fn from(err: rmp_serde::decode::Error) -> Self {
        RoutePacerError::Serialization {
            message: err.to_string(),
        }
    }
}

/// Result type alias for route-pacer operations.
pub type Result<T> = std::result::Result<T, RoutePacerError>;

/// Extension trait for converting Option to RoutePacerError.
pub trait OptionExt<T> {
    /// Convert Option to Result with a route-not-found error.
    fn ok_or_route_not_found(self, route_id: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_route_not_found(self, route_id: &str) -> Result<T> {
        self.ok_or_else(|| RoutePacerError::RouteNotFound {
            route_id: route_id.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RoutePacerError::InvalidRoute {
            route_id: "loop-1".to_string(),
            message: "no coordinates".to_string(),
        };
        assert!(err.to_string().contains("loop-1"));
        assert!(err.to_string().contains("no coordinates"));

        let err = RoutePacerError::RouteNotFound {
            route_id: "missing".to_string(),
        };
        assert_eq!(err.to_string(), "Route 'missing' not found");
    }

    #[test]
    fn test_option_ext() {
        let none: Option<i32> = None;
        let result = none.ok_or_route_not_found("missing");
        assert!(matches!(
            result,
            Err(RoutePacerError::RouteNotFound { .. })
        ));

        let some = Some(3).ok_or_route_not_found("present");
        assert_eq!(some.unwrap(), 3);
    }
}
