//! Domain-level error types.

use thiserror::Error;

use crate::validation::{FieldErrors, SLUG_TAKEN};

/// Domain errors - business logic failures.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: &'static str, id: i64 },

    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("Storage failure: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Repository-level errors.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Database connection failed: {0}")]
    Connection(String),

    #[error("Query execution failed: {0}")]
    Query(String),

    #[error("Entity not found")]
    NotFound,

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

impl From<RepoError> for DomainError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => DomainError::Internal("Entity vanished during write".to_string()),
            // posts.slug is the only unique column the post write path can hit
            RepoError::Constraint(detail) => {
                tracing::warn!(%detail, "Unique constraint rejected a post write");
                let mut errors = FieldErrors::new();
                errors.add("slug", SLUG_TAKEN);
                DomainError::Validation(errors)
            }
            other => DomainError::Internal(other.to_string()),
        }
    }
}

impl From<crate::ports::StorageError> for DomainError {
    fn from(err: crate::ports::StorageError) -> Self {
        DomainError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_becomes_slug_error() {
        let err: DomainError = RepoError::Constraint(
            r#"duplicate key value violates unique constraint "posts_slug_key""#.to_string(),
        )
        .into();

        match err {
            DomainError::Validation(errors) => assert_eq!(errors.get("slug"), [SLUG_TAKEN]),
            other => panic!("expected a slug validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_query_failure_stays_internal() {
        let err: DomainError = RepoError::Query("syntax error".to_string()).into();
        assert!(matches!(err, DomainError::Internal(_)));
    }
}
