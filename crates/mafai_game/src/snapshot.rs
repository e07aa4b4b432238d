//! Full-truth, serializable view of a session.
//!
//! Snapshots include every role and every pending submission. The
//! transport boundary redacts them per viewer before they leave the
//! process.

use serde::{Deserialize, Serialize};

use crate::action::{NightAction, VoteTarget};
use crate::event_log::LogEntry;
use crate::night::Investigation;
use crate::settings::Settings;
use crate::types::{Faction, Phase, Player, PlayerId, SessionId};

/// A pending night action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAction {
    /// Who submitted.
    pub player: PlayerId,
    /// What they submitted.
    pub action: NightAction,
}

/// A pending ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    /// Who voted.
    pub voter: PlayerId,
    /// For whom.
    pub target: VoteTarget,
}

/// One detective's accumulated findings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectiveRecord {
    /// The detective.
    pub detective: PlayerId,
    /// Findings in the order they were made.
    pub findings: Vec<Investigation>,
}

/// Everything the session knows, at one version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Join code.
    pub id: SessionId,
    /// Bumped on every successful mutation.
    pub version: u64,
    /// Current phase.
    pub phase: Phase,
    /// Current round; 0 in the lobby.
    pub round: u32,
    /// Current host.
    pub host: Option<PlayerId>,
    /// Free-text theme.
    pub theme: Option<String>,
    /// Active settings.
    pub settings: Settings,
    /// Roster in join order, with roles.
    pub players: Vec<Player>,
    /// Pending night actions.
    pub night_actions: Vec<PendingAction>,
    /// Pending ballots.
    pub votes: Vec<Ballot>,
    /// Players who have acknowledged the day.
    pub day_acks: Vec<PlayerId>,
    /// Detective findings so far.
    pub detective_results: Vec<DetectiveRecord>,
    /// Winning side once the game is over.
    pub winner: Option<Faction>,
    /// The shared event log.
    pub log: Vec<LogEntry>,
}

impl SessionSnapshot {
    /// Looks up a player in the snapshot.
    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id() == id)
    }
}
