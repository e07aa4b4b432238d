//! Core domain types for a Mafia session.

use derive_getters::Getters;
use derive_more::{Display, From};
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use strum::EnumIter;

use crate::action::ActionKind;

/// Alphabet for session join codes (no I, L, O, U, 0, 1).
const CODE_ALPHABET: &[u8] = b"23456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Length of a session join code.
pub const SESSION_CODE_LEN: usize = 6;

/// Short join code identifying a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Draws a fresh join code from the given random source.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut code = String::with_capacity(SESSION_CODE_LEN);
        for _ in 0..SESSION_CODE_LEN {
            if let Some(&b) = CODE_ALPHABET.choose(&mut *rng) {
                code.push(b as char);
            }
        }
        Self(code)
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(code: &str) -> Self {
        Self(code.to_string())
    }
}

/// Opaque player identity, unique within the process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    /// Generates a new random identity.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Hidden role held by a player.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumIter,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Kills one player each night (by majority of the mafia).
    #[display("mafia")]
    Mafia,
    /// Protects one player each night.
    #[display("doctor")]
    Doctor,
    /// Learns one player's role each night.
    #[display("detective")]
    Detective,
    /// No night action.
    #[display("villager")]
    Villager,
    /// Role not dealt yet.
    #[default]
    #[display("unassigned")]
    Unassigned,
}

impl Role {
    /// The single night action this role may submit, if any.
    pub fn night_action(self) -> Option<ActionKind> {
        match self {
            Role::Mafia => Some(ActionKind::Kill),
            Role::Doctor => Some(ActionKind::Save),
            Role::Detective => Some(ActionKind::Investigate),
            Role::Villager | Role::Unassigned => None,
        }
    }

    /// Returns true for roles with an active night action.
    pub fn is_specialist(self) -> bool {
        self.night_action().is_some()
    }

    /// The faction this role plays for.
    pub fn faction(self) -> Faction {
        match self {
            Role::Mafia => Faction::Mafia,
            _ => Faction::Town,
        }
    }
}

/// Side of the table, used for win evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum Faction {
    /// Everyone who is not mafia.
    #[display("town")]
    Town,
    /// The mafia.
    #[display("mafia")]
    Mafia,
}

/// Phase of the session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    /// Players join and the host edits settings.
    #[default]
    #[display("LOBBY")]
    Lobby,
    /// Roles have been dealt; transient.
    #[display("ROLE_ASSIGNMENT")]
    RoleAssignment,
    /// Specialists submit their night actions.
    #[display("NIGHT")]
    Night,
    /// The night's outcome is narrated.
    #[display("DAY")]
    Day,
    /// Living players vote.
    #[display("DISCUSSION")]
    Discussion,
    /// Terminal.
    #[display("END")]
    End,
}

/// A player in a session.
///
/// Plain value record owned by the session's roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct Player {
    /// Player's unique identity.
    id: PlayerId,
    /// Display name.
    name: String,
    /// Hidden role.
    role: Role,
    /// False once eliminated, forever.
    alive: bool,
    /// Lobby readiness.
    ready: bool,
}

impl Player {
    /// Creates a fresh lobby player.
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            role: Role::Unassigned,
            alive: true,
            ready: false,
        }
    }

    /// Returns true if the player is alive.
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub(crate) fn assign_role(&mut self, role: Role) {
        self.role = role;
    }

    pub(crate) fn eliminate(&mut self) {
        self.alive = false;
    }

    pub(crate) fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }
}
