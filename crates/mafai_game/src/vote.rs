//! Day vote resolution.

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::action::VoteTarget;
use crate::event_log::VoteVerdict;
use crate::roster::Roster;
use crate::types::PlayerId;

/// Pending ballots, one per voter; later ballots overwrite.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteLedger {
    ballots: Vec<(PlayerId, VoteTarget)>,
}

impl VoteLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a ballot, replacing any earlier one from the same voter.
    pub fn record(&mut self, voter: PlayerId, target: VoteTarget) {
        match self.ballots.iter_mut().find(|(id, _)| *id == voter) {
            Some((_, existing)) => *existing = target,
            None => self.ballots.push((voter, target)),
        }
    }

    /// The voter's current ballot.
    pub fn get(&self, voter: &PlayerId) -> Option<&VoteTarget> {
        self.ballots
            .iter()
            .find(|(id, _)| id == voter)
            .map(|(_, target)| target)
    }

    /// Returns true if the voter has a ballot in.
    pub fn has_voted(&self, voter: &PlayerId) -> bool {
        self.get(voter).is_some()
    }

    /// Drops the voter's ballot, if any.
    pub fn remove(&mut self, voter: &PlayerId) -> Option<VoteTarget> {
        let index = self.ballots.iter().position(|(id, _)| id == voter)?;
        Some(self.ballots.remove(index).1)
    }

    /// Ballots in first-cast order.
    pub fn entries(&self) -> impl Iterator<Item = (&PlayerId, &VoteTarget)> {
        self.ballots.iter().map(|(voter, target)| (voter, target))
    }

    /// Number of ballots.
    pub fn len(&self) -> usize {
        self.ballots.len()
    }

    /// Returns true if nobody voted.
    pub fn is_empty(&self) -> bool {
        self.ballots.is_empty()
    }

    /// Forgets every ballot.
    pub fn clear(&mut self) {
        self.ballots.clear();
    }
}

/// Result of tallying a vote round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteOutcome {
    /// Round whose discussion was resolved.
    pub round: u32,
    /// Ballots per bucket: players in roster order, then skip.
    pub tally: Vec<(VoteTarget, usize)>,
    /// Votes needed for a majority.
    pub threshold: usize,
    /// Outcome class.
    pub verdict: VoteVerdict,
    /// Who was voted out.
    pub eliminated: Option<PlayerId>,
}

impl VoteOutcome {
    /// Total ballots cast.
    pub fn ballots(&self) -> usize {
        self.tally.iter().map(|(_, n)| *n).sum()
    }
}

/// Majority threshold for a table of `alive` players.
pub fn majority_threshold(alive: usize) -> usize {
    alive / 2 + 1
}

/// Tallies the ballots and decides the elimination.
///
/// A skip majority eliminates nobody. Otherwise the top-voted buckets,
/// skip included, are candidates and a uniform random choice picks one;
/// only a player pick eliminates. Zero ballots is a
/// valid input and yields [`VoteVerdict::NoVotesCast`].
#[instrument(skip(ledger, roster, rng), fields(ballots = ledger.len()))]
pub fn resolve_votes<R: Rng + ?Sized>(
    ledger: &VoteLedger,
    roster: &Roster,
    round: u32,
    rng: &mut R,
) -> VoteOutcome {
    let threshold = majority_threshold(roster.alive_count());
    let tally = tally(ledger, roster);

    let outcome = |verdict, eliminated| VoteOutcome {
        round,
        tally: tally.clone(),
        threshold,
        verdict,
        eliminated,
    };

    if ledger.is_empty() {
        debug!("No votes cast");
        return outcome(VoteVerdict::NoVotesCast, None);
    }

    let skips = tally
        .iter()
        .find(|(target, _)| target.is_skip())
        .map_or(0, |(_, n)| *n);
    if skips >= threshold {
        debug!(skips, threshold, "Skip reached majority");
        return outcome(VoteVerdict::SkipMajority, None);
    }

    let top = tally.iter().map(|(_, n)| *n).max().unwrap_or(0);
    let candidates: Vec<&VoteTarget> = tally
        .iter()
        .filter(|(_, n)| *n == top)
        .map(|(target, _)| target)
        .collect();

    match candidates.choose(&mut *rng) {
        Some(VoteTarget::Player(chosen)) => {
            debug!(player_id = %chosen, votes = top, "Player voted out");
            outcome(VoteVerdict::Eliminated, Some(chosen.clone()))
        }
        _ => {
            debug!(skips, threshold, candidates = candidates.len(), "Skip led without majority");
            outcome(VoteVerdict::NoConsensus, None)
        }
    }
}

fn tally(ledger: &VoteLedger, roster: &Roster) -> Vec<(VoteTarget, usize)> {
    let mut buckets: Vec<(VoteTarget, usize)> = roster
        .iter()
        .map(|p| {
            let target = VoteTarget::Player(p.id().clone());
            let n = ledger.entries().filter(|(_, t)| **t == target).count();
            (target, n)
        })
        .filter(|(_, n)| *n > 0)
        .collect();

    let skips = ledger.entries().filter(|(_, t)| t.is_skip()).count();
    if skips > 0 {
        buckets.push((VoteTarget::Skip, skips));
    }
    buckets
}
