//! Narration collaborator: turns factual summaries into flavor text.
//!
//! Narration never affects game state. Whatever a narrator returns is
//! stored verbatim in the session log; on failure the service substitutes
//! the [`FallbackNarrator`] sentence.

use crate::llm_client::{LlmClient, LlmError};
use async_trait::async_trait;
use mafai_game::{IntroSummary, NightSummary, VoteSummary, VoteVerdict};
use tracing::{debug, instrument};

const SYSTEM_PROMPT: &str = "You are the narrator of a Mafia party game. \
Write two to four vivid sentences in the requested theme. \
Only mention the names and facts you are given. \
Never guess or reveal anyone's secret role.";

/// Produces flavor text for game events.
#[async_trait]
pub trait Narrator: Send + Sync {
    /// Opening story for a new game.
    async fn narrate_intro(&self, summary: &IntroSummary) -> Result<String, LlmError>;

    /// Story of a resolved night.
    async fn narrate_night(&self, summary: &NightSummary) -> Result<String, LlmError>;

    /// Story of a resolved vote.
    async fn narrate_votes(&self, summary: &VoteSummary) -> Result<String, LlmError>;
}

/// Deterministic narrator with fixed sentences. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackNarrator;

impl FallbackNarrator {
    /// Fixed intro sentence.
    pub fn intro(summary: &IntroSummary) -> String {
        match &summary.theme {
            Some(theme) => format!(
                "{} gather as night falls over {}. One among them is not who they seem.",
                join_names(&summary.players),
                theme
            ),
            None => format!(
                "{} gather as night falls. One among them is not who they seem.",
                join_names(&summary.players)
            ),
        }
    }

    /// Fixed night sentence.
    pub fn night(summary: &NightSummary) -> String {
        let mut text = format!("Night {} comes to an end.", summary.round);
        if summary.deaths.is_empty() {
            text.push_str(" Everyone wakes to see the morning.");
        } else {
            text.push_str(&format!(" {} did not survive.", join_names(&summary.deaths)));
        }
        if let Some(saved) = &summary.saved {
            text.push_str(&format!(" {} was attacked but pulled through.", saved));
        }
        text
    }

    /// Fixed vote sentence.
    pub fn votes(summary: &VoteSummary) -> String {
        match (&summary.verdict, &summary.eliminated) {
            (VoteVerdict::Eliminated, Some(name)) => {
                format!("The town has spoken. {} is cast out.", name)
            }
            (VoteVerdict::SkipMajority, _) => {
                "The town chooses mercy today. Nobody is cast out.".to_string()
            }
            (VoteVerdict::NoVotesCast, _) => {
                "The town falls silent and no votes are cast.".to_string()
            }
            _ => "The town cannot agree. Nobody is cast out.".to_string(),
        }
    }
}

#[async_trait]
impl Narrator for FallbackNarrator {
    async fn narrate_intro(&self, summary: &IntroSummary) -> Result<String, LlmError> {
        Ok(Self::intro(summary))
    }

    async fn narrate_night(&self, summary: &NightSummary) -> Result<String, LlmError> {
        Ok(Self::night(summary))
    }

    async fn narrate_votes(&self, summary: &VoteSummary) -> Result<String, LlmError> {
        Ok(Self::votes(summary))
    }
}

/// Narrator backed by an LLM.
#[derive(Debug, Clone)]
pub struct LlmNarrator {
    client: LlmClient,
}

impl LlmNarrator {
    /// Creates a narrator around a configured client.
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }

    async fn tell(&self, request: &str, facts: &impl serde::Serialize) -> Result<String, LlmError> {
        let facts = serde_json::to_string_pretty(facts)
            .map_err(|e| LlmError::new(format!("Failed to encode summary: {}", e)))?;
        let message = format!("{}\n\nFacts:\n{}", request, facts);
        let text = self.client.generate(SYSTEM_PROMPT, &message).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(LlmError::new("Narrator returned empty text".to_string()));
        }
        Ok(text.to_string())
    }
}

#[async_trait]
impl Narrator for LlmNarrator {
    #[instrument(skip(self, summary), fields(players = summary.players.len()))]
    async fn narrate_intro(&self, summary: &IntroSummary) -> Result<String, LlmError> {
        debug!("Requesting intro narration");
        self.tell("Set the scene for a new game with these players.", summary)
            .await
    }

    #[instrument(skip(self, summary), fields(round = summary.round))]
    async fn narrate_night(&self, summary: &NightSummary) -> Result<String, LlmError> {
        debug!("Requesting night narration");
        self.tell(
            "Tell the town what happened overnight. Weave in the activities without saying who did them.",
            summary,
        )
        .await
    }

    #[instrument(skip(self, summary), fields(round = summary.round))]
    async fn narrate_votes(&self, summary: &VoteSummary) -> Result<String, LlmError> {
        debug!("Requesting vote narration");
        self.tell("Describe the outcome of the town vote.", summary)
            .await
    }
}

fn join_names(names: &[String]) -> String {
    match names {
        [] => "The players".to_string(),
        [one] => one.clone(),
        [rest @ .., last] => format!("{} and {}", rest.join(", "), last),
    }
}
