use domain::UidError;
use storage::RepositoryError;
use thiserror::Error;

/// Closed set of failure categories that callers branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Infrastructure,
}

#[derive(Debug, Error)]
pub enum OrderServiceError {
    #[error(transparent)]
    InvalidId(#[from] UidError),

    #[error("Order not found: {0}")]
    NotFound(String),

    #[error("Order already exists: {0}")]
    AlreadyExists(String),

    #[error("Infrastructure error: {0}")]
    Infrastructure(RepositoryError),
}

impl OrderServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderServiceError::InvalidId(_) => ErrorKind::Validation,
            OrderServiceError::NotFound(_) => ErrorKind::NotFound,
            OrderServiceError::AlreadyExists(_) => ErrorKind::Conflict,
            OrderServiceError::Infrastructure(_) => ErrorKind::Infrastructure,
        }
    }
}

impl From<RepositoryError> for OrderServiceError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::NotFound(uid) => OrderServiceError::NotFound(uid),
            RepositoryError::AlreadyExists(uid) => OrderServiceError::AlreadyExists(uid),
            other => OrderServiceError::Infrastructure(other),
        }
    }
}

/// Result of a successful create call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    /// The identifier was already stored; nothing was written
    Duplicate,
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::SqlxError;

    #[test]
    fn test_repository_errors_map_to_kinds() {
        let not_found: OrderServiceError = RepositoryError::NotFound("a".into()).into();
        let conflict: OrderServiceError = RepositoryError::AlreadyExists("a".into()).into();
        let infra: OrderServiceError = RepositoryError::Database(SqlxError::PoolTimedOut).into();

        assert_eq!(not_found.kind(), ErrorKind::NotFound);
        assert_eq!(conflict.kind(), ErrorKind::Conflict);
        assert_eq!(infra.kind(), ErrorKind::Infrastructure);
    }

    #[test]
    fn test_invalid_id_message_is_the_uid_error_text() {
        let error = OrderServiceError::from(UidError::InvalidLength);
        assert_eq!(error.kind(), ErrorKind::Validation);
        assert_eq!(error.to_string(), "order UID must be 20 characters long");
    }
}
