//! Night resolution.
//!
//! Collects one action per living specialist and turns the batch into a
//! deterministic outcome. The order is fixed:
//!
//! 1. Tally the mafia's kill votes; ties are broken uniformly at random.
//! 2. Check the chosen target against every doctor's save.
//! 3. Resolve every detective's investigation.
//! 4. Decide the elimination.
//!
//! Resolution is pure with respect to the roster; the session applies the
//! outcome afterwards.

use std::collections::HashSet;

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::action::{ActionKind, NightAction};
use crate::roster::Roster;
use crate::types::{PlayerId, Role};

/// What a detective learned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Investigation {
    /// Night on which the investigation ran.
    pub round: u32,
    /// Investigated player.
    pub target: PlayerId,
    /// Their role.
    pub role: Role,
}

/// One player's submitted night, as handed to the narrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NightActivity {
    /// Who acted.
    pub player: PlayerId,
    /// What they declared.
    pub kind: ActionKind,
    /// Their own description, if any.
    pub activity: Option<String>,
}

/// Pending night actions, one per actor; later submissions overwrite.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NightLedger {
    actions: Vec<(PlayerId, NightAction)>,
}

impl NightLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an action, replacing any earlier one from the same actor.
    pub fn record(&mut self, actor: PlayerId, action: NightAction) {
        match self.actions.iter_mut().find(|(id, _)| *id == actor) {
            Some((_, existing)) => *existing = action,
            None => self.actions.push((actor, action)),
        }
    }

    /// The actor's current action.
    pub fn get(&self, actor: &PlayerId) -> Option<&NightAction> {
        self.actions
            .iter()
            .find(|(id, _)| id == actor)
            .map(|(_, action)| action)
    }

    /// Returns true if the actor has submitted tonight.
    pub fn has_acted(&self, actor: &PlayerId) -> bool {
        self.get(actor).is_some()
    }

    /// Drops the actor's action, if any.
    pub fn remove(&mut self, actor: &PlayerId) -> Option<NightAction> {
        let index = self.actions.iter().position(|(id, _)| id == actor)?;
        Some(self.actions.remove(index).1)
    }

    /// All recorded actions in first-submission order.
    pub fn entries(&self) -> impl Iterator<Item = (&PlayerId, &NightAction)> {
        self.actions.iter().map(|(id, action)| (id, action))
    }

    /// Number of actors who have submitted.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Returns true if nobody has submitted.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Forgets every action.
    pub fn clear(&mut self) {
        self.actions.clear();
    }
}

/// Result of resolving a night.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NightOutcome {
    /// Night that was resolved.
    pub round: u32,
    /// Kill votes per target, in roster order.
    pub kill_tally: Vec<(PlayerId, usize)>,
    /// The mafia's chosen target, if any mafia acted.
    pub target: Option<PlayerId>,
    /// True if a living target was protected by a doctor.
    pub saved: bool,
    /// Who dies tonight.
    pub eliminated: Option<PlayerId>,
    /// Detective findings keyed by detective.
    pub investigations: Vec<(PlayerId, Investigation)>,
    /// Everything that was submitted, for narration.
    pub activities: Vec<NightActivity>,
}

/// Resolves the recorded actions against the roster.
#[instrument(skip(ledger, roster, rng), fields(actions = ledger.len()))]
pub fn resolve_night<R: Rng + ?Sized>(
    ledger: &NightLedger,
    roster: &Roster,
    round: u32,
    rng: &mut R,
) -> NightOutcome {
    // 1. Mafia tally.
    let kill_tally = tally_kills(ledger, roster);
    let top = kill_tally.iter().map(|(_, n)| *n).max().unwrap_or(0);
    let candidates: Vec<&PlayerId> = kill_tally
        .iter()
        .filter(|(_, n)| top > 0 && *n == top)
        .map(|(id, _)| id)
        .collect();
    let target = candidates.choose(&mut *rng).map(|id| (*id).clone());
    debug!(?kill_tally, ?target, "Mafia target chosen");

    // 2. Doctor check against the already-chosen target.
    let saves: HashSet<&PlayerId> = ledger
        .entries()
        .filter(|(_, action)| *action.kind() == ActionKind::Save)
        .map(|(_, action)| action.target())
        .collect();
    let target_alive = target
        .as_ref()
        .and_then(|id| roster.get(id))
        .is_some_and(|p| p.is_alive());
    let saved = target_alive && target.as_ref().is_some_and(|id| saves.contains(id));

    // 3. Detective reveals, regardless of the kill.
    let investigations = ledger
        .entries()
        .filter(|(_, action)| *action.kind() == ActionKind::Investigate)
        .filter_map(|(detective, action)| {
            roster.get(action.target()).map(|target| {
                (
                    detective.clone(),
                    Investigation {
                        round,
                        target: action.target().clone(),
                        role: *target.role(),
                    },
                )
            })
        })
        .collect();

    // 4. Elimination.
    let eliminated = if target_alive && !saved {
        target.clone()
    } else {
        None
    };

    let activities = ledger
        .entries()
        .map(|(player, action)| NightActivity {
            player: player.clone(),
            kind: *action.kind(),
            activity: action.activity().clone(),
        })
        .collect();

    NightOutcome {
        round,
        kill_tally,
        target,
        saved,
        eliminated,
        investigations,
        activities,
    }
}

/// Counts kill votes per target. One vote per mafia actor, since the
/// ledger keeps a single entry per actor.
fn tally_kills(ledger: &NightLedger, roster: &Roster) -> Vec<(PlayerId, usize)> {
    roster
        .iter()
        .map(|candidate| {
            let votes = ledger
                .entries()
                .filter(|(_, action)| {
                    *action.kind() == ActionKind::Kill && action.target() == candidate.id()
                })
                .count();
            (candidate.id().clone(), votes)
        })
        .filter(|(_, votes)| *votes > 0)
        .collect()
}
