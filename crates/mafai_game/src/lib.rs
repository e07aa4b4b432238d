//! Mafai game core - the Mafia session state machine
//!
//! Pure and synchronous: no I/O, no clocks, no global state. Every random
//! draw comes from the session's own `StdRng`, so a seeded session replays
//! exactly.
//!
//! # Architecture
//!
//! - **Session**: the phase controller, LOBBY → NIGHT → DAY → DISCUSSION → END
//! - **Roster / Settings**: players in join order, validated host settings
//! - **Night / Vote**: fixed-order night resolution and majority voting
//! - **Event log**: append-only, role-free record shared with clients
//!
//! # Example
//!
//! ```
//! use mafai_game::{Phase, Session, SessionId};
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//!
//! let (mut session, host) =
//!     Session::new(SessionId::from("ABC234"), "Ada", None, StdRng::seed_from_u64(7))?;
//! for name in ["Bo", "Cy", "Di"] {
//!     session.join(name)?;
//! }
//! session.start_game(&host)?;
//! assert_eq!(*session.phase(), Phase::Night);
//! # Ok::<(), mafai_game::GameError>(())
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod action;
mod assignment;
mod error;
mod event_log;
pub mod invariants;
mod narration;
mod night;
mod roster;
pub mod rules;
mod session;
mod settings;
mod snapshot;
mod types;
mod vote;

pub use action::{ActionKind, NightAction, SKIP, VoteTarget};
pub use assignment::{MIN_PLAYERS, RoleCounts, assign_roles, build_deck};
pub use error::{ErrorKind, GameError, GameResult};
pub use event_log::{
    EliminationCause, EventLog, GameEvent, LogEntry, NarrationKind, VoteVerdict,
};
pub use narration::{IntroSummary, NightSummary, VoteSummary};
pub use night::{Investigation, NightActivity, NightLedger, NightOutcome, resolve_night};
pub use roster::{MAX_NAME_LEN, Roster};
pub use session::{Disconnected, DisconnectPolicy, Resolution, Session};
pub use settings::{Settings, SettingsPatch};
pub use snapshot::{Ballot, DetectiveRecord, PendingAction, SessionSnapshot};
pub use types::{Faction, Phase, Player, PlayerId, Role, SESSION_CODE_LEN, SessionId};
pub use vote::{VoteLedger, VoteOutcome, majority_threshold, resolve_votes};
