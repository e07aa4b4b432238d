//! Player intents submitted during NIGHT and DISCUSSION.
//!
//! Actions are domain values: they are validated against the session
//! before being recorded and carry no behavior of their own.

use derive_getters::Getters;
use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::types::PlayerId;

/// Wire sentinel for an abstaining vote.
pub const SKIP: &str = "skip";

/// The kind of night action a specialist submits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    /// Mafia: vote to kill the target.
    #[display("kill")]
    Kill,
    /// Doctor: protect the target.
    #[display("save")]
    Save,
    /// Detective: learn the target's role.
    #[display("investigate")]
    Investigate,
}

/// A night action: kind, target, and optional flavor text for the narrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct NightAction {
    /// Declared action type; must match the submitter's role.
    kind: ActionKind,
    /// Targeted player (dead or alive).
    target: PlayerId,
    /// What the player says they did tonight; narration only.
    #[serde(default)]
    activity: Option<String>,
}

impl NightAction {
    /// Creates an action without flavor text.
    pub fn new(kind: ActionKind, target: PlayerId) -> Self {
        Self {
            kind,
            target,
            activity: None,
        }
    }

    /// Attaches the player's description of their night.
    pub fn with_activity(mut self, activity: impl Into<String>) -> Self {
        let activity = activity.into();
        let trimmed = activity.trim();
        self.activity = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }
}

/// A day vote: a rostered player or the "skip" sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VoteTarget {
    /// Vote to eliminate this player.
    Player(PlayerId),
    /// Abstain.
    Skip,
}

impl VoteTarget {
    /// Returns the targeted player, or `None` for skip.
    pub fn player(&self) -> Option<&PlayerId> {
        match self {
            VoteTarget::Player(id) => Some(id),
            VoteTarget::Skip => None,
        }
    }

    /// Returns true for the skip bucket.
    pub fn is_skip(&self) -> bool {
        matches!(self, VoteTarget::Skip)
    }
}

impl From<String> for VoteTarget {
    fn from(raw: String) -> Self {
        if raw.eq_ignore_ascii_case(SKIP) {
            VoteTarget::Skip
        } else {
            VoteTarget::Player(PlayerId::from(raw))
        }
    }
}

impl From<VoteTarget> for String {
    fn from(target: VoteTarget) -> Self {
        match target {
            VoteTarget::Player(id) => id.to_string(),
            VoteTarget::Skip => SKIP.to_string(),
        }
    }
}

impl From<PlayerId> for VoteTarget {
    fn from(id: PlayerId) -> Self {
        VoteTarget::Player(id)
    }
}

impl std::fmt::Display for VoteTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VoteTarget::Player(id) => write!(f, "{}", id),
            VoteTarget::Skip => write!(f, "{}", SKIP),
        }
    }
}
