//! Error types for repotable
//!
//! All failures surfaced by the library are represented by the [`Error`] enum.
//! Errors are:
//! - **Structured**: each variant carries typed fields
//! - **Serializable**: can be converted to/from JSON
//! - **Comparable**: `PartialEq`, so tests can match exact outcomes
//!
//! # Categories
//!
//! | Category | Variants | Raised by |
//! |----------|----------|-----------|
//! | Resolving | `InvalidLocation`, `Unauthenticated` | Locally, before any network access |
//! | Substrate | `NotFound`, `Conflict`, `Transport` | The storage substrate, mapped from its status |
//! | Content | `UnreadableContent`, `Serialization` | The content codec |
//! | Input | `InvalidInput`, `Config` | Caller-supplied values |
//! | System | `Internal` | Bugs or invariant violations |

use serde::{Deserialize, Serialize};

/// Result type alias for repotable operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by repotable operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum Error {
    // ==================== Resolving ====================
    /// Required location fields are missing or malformed
    #[error("invalid location: {reason}")]
    InvalidLocation { reason: String },

    /// A write-class operation was attempted without credentials
    #[error("unauthenticated: {operation} requires a token")]
    Unauthenticated { operation: String },

    // ==================== Substrate ====================
    /// The file does not exist
    #[error("not found: {location}")]
    NotFound { location: String },

    /// The revision token no longer matches the remote state
    #[error("conflict ({status}): {reason}")]
    Conflict { status: u16, reason: String },

    /// Network or transport failure; `status` is absent when no response arrived
    #[error("transport error{}: {reason}", .status.map(|s| format!(" ({})", s)).unwrap_or_default())]
    Transport { status: Option<u16>, reason: String },

    // ==================== Content ====================
    /// Payload is neither structured nor tabular notation
    #[error("unreadable content: {reason}")]
    UnreadableContent { reason: String },

    /// Encoding a record set failed
    #[error("serialization error: {reason}")]
    Serialization { reason: String },

    // ==================== Input ====================
    /// Invalid caller input
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    /// Invalid or unreadable configuration
    #[error("configuration error: {reason}")]
    Config { reason: String },

    // ==================== System ====================
    /// Internal error (bug or invariant violation)
    #[error("internal error: {reason}")]
    Internal { reason: String },
}

impl Error {
    /// Map a substrate status code to the nearest error kind.
    ///
    /// | Status | Kind |
    /// |--------|------|
    /// | 401, 403 | `Unauthenticated` |
    /// | 404 | `NotFound` |
    /// | 409, 412, 422 | `Conflict` |
    /// | anything else | `Transport` |
    pub fn from_status(status: u16, context: impl Into<String>) -> Self {
        let context = context.into();
        match status {
            401 | 403 => Error::Unauthenticated { operation: context },
            404 => Error::NotFound { location: context },
            409 | 412 | 422 => Error::Conflict {
                status,
                reason: context,
            },
            _ => Error::Transport {
                status: Some(status),
                reason: context,
            },
        }
    }

    /// Shorthand for [`Error::InvalidLocation`]
    pub fn invalid_location(reason: impl Into<String>) -> Self {
        Error::InvalidLocation {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`Error::InvalidInput`]
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Error::InvalidInput {
            reason: reason.into(),
        }
    }

    /// True if this is a compare-and-swap rejection
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict { .. })
    }

    /// True if the file does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// True if the error was raised locally before any network access
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Error::InvalidLocation { .. }
                | Error::Unauthenticated { .. }
                | Error::InvalidInput { .. }
                | Error::Config { .. }
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization {
            reason: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            Error::from_status(401, "push"),
            Error::Unauthenticated { .. }
        ));
        assert!(matches!(
            Error::from_status(403, "push"),
            Error::Unauthenticated { .. }
        ));
        assert!(Error::from_status(404, "a/b").is_not_found());
        assert!(Error::from_status(409, "sha mismatch").is_conflict());
        assert!(Error::from_status(412, "precondition").is_conflict());
        assert!(Error::from_status(422, "sha missing").is_conflict());
        assert_eq!(
            Error::from_status(500, "boom"),
            Error::Transport {
                status: Some(500),
                reason: "boom".to_string()
            }
        );
    }

    #[test]
    fn test_error_display_transport() {
        let err = Error::Transport {
            status: Some(502),
            reason: "bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "transport error (502): bad gateway");

        let err = Error::Transport {
            status: None,
            reason: "connection refused".to_string(),
        };
        assert_eq!(err.to_string(), "transport error: connection refused");
    }

    #[test]
    fn test_error_display_conflict() {
        let err = Error::Conflict {
            status: 409,
            reason: "stale sha".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("conflict"));
        assert!(msg.contains("409"));
        assert!(msg.contains("stale sha"));
    }

    #[test]
    fn test_local_errors() {
        assert!(Error::invalid_location("no owner").is_local());
        assert!(Error::Unauthenticated {
            operation: "append".into()
        }
        .is_local());
        assert!(!Error::from_status(404, "x").is_local());
    }

    #[test]
    fn test_error_serialization_round_trip() {
        let err = Error::Conflict {
            status: 409,
            reason: "stale".to_string(),
        };
        let json = serde_json::to_string(&err).unwrap();
        let back: Error = serde_json::from_str(&json).unwrap();
        assert_eq!(err, back);
    }

    #[test]
    fn test_from_serde_json() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: Error = parse.unwrap_err().into();
        assert!(matches!(err, Error::Serialization { .. }));
    }
}
