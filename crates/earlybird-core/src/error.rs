//! Domain error types.

use thiserror::Error;

/// Top-level domain error type.
///
/// Expected outcomes (a duplicate same-day registration) are not errors;
/// they are ordinary variants of
/// [`RegistrationOutcome`](crate::store::RegistrationOutcome).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    /// No arrival record exists for the given id — a stale or invalid id
    /// passed by the caller, not a user-facing condition.
    #[error("arrival not found: {0}")]
    ArrivalNotFound(i64),

    /// No aggregate exists for the user; they have never checked in.
    #[error("user not found: {0}")]
    UserNotFound(String),

    /// Achievements were already recorded for this arrival; the caller
    /// retried an evaluation that has already run.
    #[error("achievements already registered for arrival {0}")]
    AchievementAlreadyRegistered(i64),

    /// A badge rule produced an id the catalog does not contain.
    #[error("unknown badge id: {0}")]
    UnknownBadge(i64),

    /// The badge catalog could not be assembled.
    #[error("invalid badge catalog: {0}")]
    InvalidCatalog(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}
