//! Errors returned by session operations.
//!
//! Every error is recoverable: a failed operation leaves the session
//! exactly as it was before the call.

use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};

use crate::action::ActionKind;
use crate::types::{Phase, PlayerId, Role};

/// Coarse error taxonomy exposed to transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Operation invalid in the current phase.
    #[display("wrong_phase")]
    WrongPhase,
    /// Non-host attempted a host-only operation.
    #[display("unauthorized")]
    Unauthorized,
    /// Unknown session, player, or target.
    #[display("not_found")]
    NotFound,
    /// Malformed settings or action payload.
    #[display("invalid_input")]
    InvalidInput,
    /// Resolution already happened.
    #[display("already_resolved")]
    AlreadyResolved,
}

/// Error that can occur when operating on a session.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum GameError {
    /// Operation attempted out of order.
    #[display("Cannot {operation} during {phase}")]
    WrongPhase {
        /// What was attempted.
        operation: &'static str,
        /// Phase the session was in.
        phase: Phase,
    },

    /// Roster is closed once the game has started.
    #[display("Game already started")]
    GameAlreadyStarted,

    /// Host-only operation attempted by someone else.
    #[display("Only the host may {}", _0)]
    Unauthorized(#[error(not(source))] &'static str),

    /// Identity is not in the roster.
    #[display("Unknown player {}", _0)]
    PlayerNotFound(#[error(not(source))] PlayerId),

    /// Identity belongs to an eliminated player.
    #[display("Player {} has been eliminated", _0)]
    DeadPlayer(#[error(not(source))] PlayerId),

    /// Target does not reference a valid player.
    #[display("Invalid target {}", _0)]
    InvalidTarget(#[error(not(source))] PlayerId),

    /// Declared action does not match the submitter's role.
    #[display("A {role} cannot {attempted}")]
    RoleMismatch {
        /// Submitter's role.
        role: Role,
        /// Declared action.
        attempted: ActionKind,
    },

    /// Roster too small to deal the configured roles.
    #[display("Need at least {required} players, have {actual}")]
    NotEnoughPlayers {
        /// Minimum roster size.
        required: usize,
        /// Current roster size.
        actual: usize,
    },

    /// Settings patch rejected.
    #[display("Invalid setting: {}", _0)]
    InvalidSetting(#[error(not(source))] String),

    /// Malformed payload.
    #[display("Invalid input: {}", _0)]
    InvalidInput(#[error(not(source))] String),

    /// Resolution for this phase already ran.
    #[display("Already resolved; session is in {}", _0)]
    AlreadyResolved(#[error(not(source))] Phase),
}

impl GameError {
    /// Maps the error onto the coarse taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            GameError::WrongPhase { .. } | GameError::GameAlreadyStarted => ErrorKind::WrongPhase,
            GameError::Unauthorized(_) => ErrorKind::Unauthorized,
            GameError::PlayerNotFound(_)
            | GameError::DeadPlayer(_)
            | GameError::InvalidTarget(_) => ErrorKind::NotFound,
            GameError::RoleMismatch { .. }
            | GameError::NotEnoughPlayers { .. }
            | GameError::InvalidSetting(_)
            | GameError::InvalidInput(_) => ErrorKind::InvalidInput,
            GameError::AlreadyResolved(_) => ErrorKind::AlreadyResolved,
        }
    }
}

/// Result alias for session operations.
pub type GameResult<T> = Result<T, GameError>;
