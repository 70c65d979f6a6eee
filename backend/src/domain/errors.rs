use thiserror::Error;

/// Failure taxonomy surfaced by the domain services.
///
/// Storage internals propagate `anyhow::Error`; services translate at their
/// boundary. A missing symptom entry is empty-state rather than `NotFound`,
/// and a denied exact-alarm capability degrades `add_alarm` instead of
/// failing it; `PermissionDenied` covers the paths where the capability is
/// a hard requirement.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("storage operation failed: {0}")]
    Persistence(#[from] anyhow::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("exact alarm permission not granted")]
    PermissionDenied,

    #[error("{0} not found")]
    NotFound(String),
}

pub type DomainResult<T> = Result<T, DomainError>;
