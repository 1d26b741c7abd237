//! # Error Types Module
//!
//! This module defines the error taxonomy shared by the catalog, inventory,
//! recommendation and ledger services.
//!
//! Ownership failures are always reported as [`GroceryError::NotFound`] so a
//! caller can never learn whether a row exists for another user.

use thiserror::Error;

use crate::model::UserId;

/// Errors surfaced by the grocery services
#[derive(Error, Debug)]
pub enum GroceryError {
    /// Malformed or out-of-range input, safe to show to the user verbatim
    #[error("Validation error: {0}")]
    Validation(String),

    /// A name that normalizes to nothing
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Row or recipe does not exist, or is not owned by the caller
    #[error("Not found: {0}")]
    NotFound(String),

    /// No authenticated user on the request
    #[error("Unauthorized")]
    Unauthorized,

    /// Persistence layer failure
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl GroceryError {
    /// Whether the calling layer may retry the operation unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(self, GroceryError::Storage(_))
    }
}

pub type Result<T> = std::result::Result<T, GroceryError>;

/// Turn the session's optional user id into an authenticated one
pub fn authenticated(user_id: Option<UserId>) -> Result<UserId> {
    user_id.ok_or(GroceryError::Unauthorized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = GroceryError::Validation("quantity must not be negative".to_string());
        assert_eq!(
            err.to_string(),
            "Validation error: quantity must not be negative"
        );
    }

    #[test]
    fn test_not_found_error_display() {
        let err = GroceryError::NotFound("grocery 7".to_string());
        assert_eq!(err.to_string(), "Not found: grocery 7");
    }

    #[test]
    fn test_only_storage_errors_are_retryable() {
        assert!(GroceryError::Storage(sqlx::Error::PoolTimedOut).is_retryable());
        assert!(!GroceryError::Unauthorized.is_retryable());
        assert!(!GroceryError::Validation("x".into()).is_retryable());
    }

    #[test]
    fn test_authenticated() {
        assert_eq!(authenticated(Some(4)).unwrap(), 4);
        assert!(matches!(
            authenticated(None),
            Err(GroceryError::Unauthorized)
        ));
    }
}
