use thiserror::Error;

/// Reasons an order identifier is rejected.
///
/// Checks run as length, suffix, then character class; only the first
/// failing check is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UidError {
    #[error("order UID must be 20 characters long")]
    InvalidLength,

    #[error("order UID must end with 'test'")]
    InvalidSuffix,

    #[error("order UID can only contain lowercase letters and digits")]
    InvalidChars,
}
