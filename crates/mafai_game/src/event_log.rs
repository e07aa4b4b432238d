//! Append-only, strictly ordered record of what happened in a session.
//!
//! The log is shared with every client, so it never names a player's
//! role while the game is running. Detective findings live elsewhere.

use serde::{Deserialize, Serialize};

use crate::assignment::RoleCounts;
use crate::types::{Faction, Phase, PlayerId};

/// Which narration request produced a piece of flavor text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NarrationKind {
    /// Background story at game start.
    Intro,
    /// Summary of a resolved night.
    Night,
    /// Summary of a resolved vote.
    Votes,
}

/// How a player left the living.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EliminationCause {
    /// Killed by the mafia.
    Night,
    /// Voted out.
    Vote,
    /// Disconnected under the eliminate policy.
    Forfeit,
}

/// Why a vote round ended without an elimination, or with one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteVerdict {
    /// A player was voted out.
    Eliminated,
    /// Skip reached a majority.
    SkipMajority,
    /// Skip led the tally, or won the tie-break, without a majority.
    NoConsensus,
    /// Nobody voted.
    NoVotesCast,
}

/// A single factual event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    /// Session created by its host.
    SessionCreated {
        /// The host.
        host: PlayerId,
        /// Host's name.
        name: String,
        /// Free-text theme.
        theme: Option<String>,
    },
    /// A player joined the lobby.
    PlayerJoined {
        /// Who joined.
        player: PlayerId,
        /// Their name.
        name: String,
    },
    /// A player left the lobby.
    PlayerLeft {
        /// Who left.
        player: PlayerId,
        /// Their name.
        name: String,
    },
    /// Lobby readiness changed.
    PlayerReady {
        /// Whose flag changed.
        player: PlayerId,
        /// New value.
        ready: bool,
    },
    /// Host role moved to another player.
    HostTransferred {
        /// New host.
        to: PlayerId,
        /// New host's name.
        name: String,
    },
    /// The host changed the settings.
    SettingsUpdated,
    /// Roles were dealt; counts only.
    RolesAssigned {
        /// Tokens dealt.
        counts: RoleCounts,
    },
    /// A night started; the entry's round is the new round.
    NightBegan,
    /// The mafia's target was protected.
    TargetSaved {
        /// Who survived.
        player: PlayerId,
        /// Their name.
        name: String,
    },
    /// The night passed without a death.
    QuietNight,
    /// A player died.
    PlayerEliminated {
        /// Who died.
        player: PlayerId,
        /// Their name.
        name: String,
        /// How.
        cause: EliminationCause,
    },
    /// Day began.
    DayBegan,
    /// Voting opened.
    DiscussionBegan,
    /// A vote round was tallied.
    VotesResolved {
        /// Outcome class.
        verdict: VoteVerdict,
        /// Number of ballots cast.
        ballots: usize,
    },
    /// The game ended.
    GameOver {
        /// Winning side.
        winner: Faction,
    },
    /// Flavor text from the narration collaborator, stored verbatim.
    Narration {
        /// Which request produced it.
        kind: NarrationKind,
        /// The text.
        text: String,
    },
}

/// A log entry with its position and context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Zero-based, gap-free sequence number.
    pub seq: u64,
    /// Round in which the event happened.
    pub round: u32,
    /// Phase at the moment of logging.
    pub phase: Phase,
    /// What happened.
    #[serde(flatten)]
    pub event: GameEvent,
}

/// The session's event log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    entries: Vec<LogEntry>,
}

impl EventLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event, returning its sequence number.
    pub fn append(&mut self, round: u32, phase: Phase, event: GameEvent) -> u64 {
        let seq = self.entries.len() as u64;
        self.entries.push(LogEntry {
            seq,
            round,
            phase,
            event,
        });
        seq
    }

    /// All entries in order.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been logged.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
