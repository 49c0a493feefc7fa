//! View errors

use core_types::RefError;
use log::error;
use policy::Right;
use services_storage::StorageError;
use thiserror::Error;

use crate::path::PathError;

/// Errors surfaced by the wiki view
///
/// Each request ends in at most one of these; the protocol layer maps it to
/// a status code with [`ViewError::status_code`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ViewError {
    /// The path or request cannot be honoured
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The access policy refused a right
    #[error("Forbidden: no {right} right on {target}")]
    Forbidden { right: Right, target: String },

    /// The operation is never allowed on this target
    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    /// Storage failure or broken internal invariant
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ViewError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            ViewError::BadRequest(_) => 400,
            ViewError::Forbidden { .. } => 403,
            ViewError::MethodNotAllowed(_) => 405,
            ViewError::Internal(_) => 500,
        }
    }

    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        ViewError::BadRequest(message.into())
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        ViewError::Internal(message.into())
    }
}

impl From<StorageError> for ViewError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidReference(inner) => inner.into(),
            other => {
                error!("storage failure: {}", other);
                ViewError::Internal(other.to_string())
            }
        }
    }
}

impl From<RefError> for ViewError {
    fn from(err: RefError) -> Self {
        ViewError::BadRequest(err.to_string())
    }
}

impl From<PathError> for ViewError {
    fn from(err: PathError) -> Self {
        ViewError::BadRequest(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ViewError::bad_request("x").status_code(), 400);
        assert_eq!(
            ViewError::Forbidden {
                right: Right::Edit,
                target: "page Main.A".to_string()
            }
            .status_code(),
            403
        );
        assert_eq!(ViewError::MethodNotAllowed("x".into()).status_code(), 405);
        assert_eq!(ViewError::internal("x").status_code(), 500);
    }

    #[test]
    fn test_storage_errors_become_internal() {
        let err: ViewError = StorageError::Backend("disk full".to_string()).into();
        assert!(matches!(err, ViewError::Internal(ref m) if m.contains("disk full")));
    }

    #[test]
    fn test_reference_errors_become_bad_request() {
        let err: ViewError = StorageError::InvalidReference(RefError::Malformed("a..b".into())).into();
        assert_eq!(err.status_code(), 400);

        let err: ViewError = PathError::InvalidPath("//".into()).into();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_forbidden_message() {
        let err = ViewError::Forbidden {
            right: Right::Delete,
            target: "page Main.A".to_string(),
        };
        assert_eq!(err.to_string(), "Forbidden: no delete right on page Main.A");
    }
}
