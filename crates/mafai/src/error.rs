//! Service-level errors.

use derive_more::{Display, Error, From};
use mafai_game::{ErrorKind, GameError, SessionId};

/// Error returned by the session store and game service.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error, From)]
pub enum ServiceError {
    /// The session rejected the operation.
    #[display("{}", _0)]
    #[from]
    Game(GameError),

    /// No session with this code.
    #[display("Session {} not found", _0)]
    SessionNotFound(#[error(not(source))] SessionId),

    /// A session lock was poisoned by a panicking holder.
    #[display("Session lock poisoned")]
    LockPoisoned,
}

impl ServiceError {
    /// Returns true if the caller can fix the request and retry.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ServiceError::LockPoisoned)
    }

    /// Coarse error class, when the session produced the error.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ServiceError::Game(err) => Some(err.kind()),
            ServiceError::SessionNotFound(_) => Some(ErrorKind::NotFound),
            ServiceError::LockPoisoned => None,
        }
    }
}
