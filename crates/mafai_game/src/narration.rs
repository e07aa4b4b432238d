//! Factual summaries handed to the narration collaborator.
//!
//! Summaries name players by display name and never carry roles, so any
//! text produced from them is safe to store in the shared log. Night
//! activities are anonymous because only specialists submit them.

use serde::{Deserialize, Serialize};

use crate::action::VoteTarget;
use crate::event_log::VoteVerdict;
use crate::night::NightOutcome;
use crate::roster::Roster;
use crate::vote::VoteOutcome;

/// Request for the opening story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntroSummary {
    /// Session theme.
    pub theme: Option<String>,
    /// Everyone at the table, in join order.
    pub players: Vec<String>,
}

/// What happened during a night.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NightSummary {
    /// Night number.
    pub round: u32,
    /// Session theme.
    pub theme: Option<String>,
    /// Submitted activity texts, sorted, without authors.
    pub activities: Vec<String>,
    /// Who died.
    pub deaths: Vec<String>,
    /// Who was attacked and survived.
    pub saved: Option<String>,
}

/// What happened during a vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteSummary {
    /// Round number.
    pub round: u32,
    /// Session theme.
    pub theme: Option<String>,
    /// Votes per bucket, by name; skip is listed as `"skip"`.
    pub tally: Vec<(String, usize)>,
    /// Outcome class.
    pub verdict: VoteVerdict,
    /// Who was voted out.
    pub eliminated: Option<String>,
    /// Survivors after the vote.
    pub survivors: Vec<String>,
}

fn name(roster: &Roster, id: &crate::types::PlayerId) -> String {
    roster
        .name_of(id)
        .map_or_else(|| id.to_string(), str::to_string)
}

impl IntroSummary {
    /// Builds the intro request from the current roster.
    pub fn new(roster: &Roster, theme: Option<String>) -> Self {
        Self {
            theme,
            players: roster.iter().map(|p| p.name().clone()).collect(),
        }
    }
}

impl NightSummary {
    /// Describes a resolved night.
    pub fn new(outcome: &NightOutcome, roster: &Roster, theme: Option<String>) -> Self {
        let mut activities: Vec<String> = outcome
            .activities
            .iter()
            .filter_map(|a| a.activity.clone())
            .collect();
        activities.sort();
        Self {
            round: outcome.round,
            theme,
            activities,
            deaths: outcome.eliminated.iter().map(|id| name(roster, id)).collect(),
            saved: outcome
                .target
                .as_ref()
                .filter(|_| outcome.saved)
                .map(|id| name(roster, id)),
        }
    }
}

impl VoteSummary {
    /// Describes a resolved vote. Call after the elimination is applied so
    /// the survivor list is current.
    pub fn new(outcome: &VoteOutcome, roster: &Roster, theme: Option<String>) -> Self {
        Self {
            round: outcome.round,
            theme,
            tally: outcome
                .tally
                .iter()
                .map(|(target, n)| {
                    let label = match target {
                        VoteTarget::Player(id) => name(roster, id),
                        VoteTarget::Skip => target.to_string(),
                    };
                    (label, *n)
                })
                .collect(),
            verdict: outcome.verdict,
            eliminated: outcome.eliminated.as_ref().map(|id| name(roster, id)),
            survivors: roster.alive().map(|p| p.name().clone()).collect(),
        }
    }
}
