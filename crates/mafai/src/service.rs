//! Game service: sequences session operations with narration.
//!
//! Each operation runs atomically under the session lock. Resolutions are
//! summarised inside that lock, narrated outside it, and the narration is
//! appended afterwards, so a slow narrator never blocks other players.

use crate::config::ServerConfig;
use crate::error::ServiceError;
use crate::llm_client::LlmClient;
use crate::narrator::{FallbackNarrator, LlmNarrator, Narrator};
use crate::redaction::{RedactedView, redact_for};
use crate::session::{SessionBroadcast, SessionListing, SessionManager};
use mafai_game::{
    Disconnected, DisconnectPolicy, IntroSummary, NarrationKind, NightAction, NightSummary,
    PlayerId, Resolution, Session, SessionId, Settings, SettingsPatch, VoteSummary, VoteTarget,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument, warn};

/// A resolution as reported to clients: the role-free summary plus the
/// narration that was logged for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "resolved", rename_all = "snake_case")]
pub enum ResolutionReport {
    /// A night ended.
    Night {
        /// What happened.
        summary: NightSummary,
        /// Logged narration.
        narration: String,
    },
    /// A vote ended.
    Votes {
        /// What happened.
        summary: VoteSummary,
        /// Logged narration.
        narration: String,
    },
}

/// Result of a submission that may have completed a resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    /// The submitter's view after the step.
    pub view: RedactedView,
    /// Set when this submission triggered a resolution.
    pub resolution: Option<ResolutionReport>,
}

/// Result of a disconnect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisconnectReport {
    /// `left`, `seat_kept` or `forfeited`.
    pub outcome: &'static str,
    /// Set when the forfeit completed a resolution.
    pub resolution: Option<ResolutionReport>,
    /// True if the session was emptied and evicted.
    pub evicted: bool,
}

/// Role-free summary awaiting narration.
enum Pending {
    Night(NightSummary),
    Votes(VoteSummary),
}

impl Pending {
    fn from_resolution(session: &Session, resolution: &Resolution) -> Self {
        match resolution {
            Resolution::Night(outcome) => Pending::Night(session.night_summary(outcome)),
            Resolution::Votes(outcome) => Pending::Votes(session.vote_summary(outcome)),
        }
    }
}

/// Game service shared by every transport connection.
#[derive(Clone)]
pub struct GameService {
    sessions: SessionManager,
    narrator: Arc<dyn Narrator>,
    policy: DisconnectPolicy,
}

impl std::fmt::Debug for GameService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameService")
            .field("sessions", &self.sessions)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl GameService {
    /// Creates a service over an existing store.
    pub fn new(
        sessions: SessionManager,
        narrator: Arc<dyn Narrator>,
        policy: DisconnectPolicy,
    ) -> Self {
        Self {
            sessions,
            narrator,
            policy,
        }
    }

    /// Builds the service described by a config.
    ///
    /// An enabled narrator without an API key falls back to the fixed
    /// sentences rather than failing startup.
    #[instrument(skip(config))]
    pub fn from_config(config: &ServerConfig) -> Self {
        let narrator: Arc<dyn Narrator> = if config.narrator().enabled() {
            match config.narrator().create_llm_config() {
                Ok(llm) => {
                    info!(
                        provider = ?llm.provider(),
                        model = %llm.model(),
                        "Using LLM narrator"
                    );
                    Arc::new(LlmNarrator::new(LlmClient::new(llm)))
                }
                Err(e) => {
                    warn!(error = %e, "LLM narrator unavailable, using fixed narration");
                    Arc::new(FallbackNarrator)
                }
            }
        } else {
            info!("Narrator disabled, using fixed narration");
            Arc::new(FallbackNarrator)
        };

        Self::new(
            SessionManager::new(*config.rng_seed()),
            narrator,
            *config.disconnect_policy(),
        )
    }

    /// The underlying store.
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Creates a session and seats its host.
    #[instrument(skip(self))]
    pub fn create_game(
        &self,
        host_name: &str,
        theme: Option<String>,
    ) -> Result<(SessionId, PlayerId, RedactedView), ServiceError> {
        let (id, host, snapshot) = self.sessions.create(host_name, theme)?;
        Ok((id, host.clone(), redact_for(&snapshot, Some(&host))))
    }

    /// Seats a new player in a lobby.
    #[instrument(skip(self), fields(session_id = %id))]
    pub fn join_game(
        &self,
        id: &SessionId,
        name: &str,
    ) -> Result<(PlayerId, RedactedView), ServiceError> {
        let (player, snapshot) = self.sessions.with_session(id, |s| {
            let player = s.join(name)?;
            Ok((player, s.snapshot()))
        })?;
        info!(player_id = %player, "Player joined");
        Ok((player.clone(), redact_for(&snapshot, Some(&player))))
    }

    /// Leaves a lobby; evicts the session once nobody is left.
    #[instrument(skip(self), fields(session_id = %id, player_id = %player))]
    pub fn leave_game(&self, id: &SessionId, player: &PlayerId) -> Result<bool, ServiceError> {
        let removed = self.sessions.with_session(id, |s| s.remove(player))?;
        if removed {
            self.sessions.evict_if_empty(id)?;
        }
        Ok(removed)
    }

    /// Sets a player's lobby readiness.
    #[instrument(skip(self), fields(session_id = %id, player_id = %player))]
    pub fn set_ready(
        &self,
        id: &SessionId,
        player: &PlayerId,
        ready: bool,
    ) -> Result<RedactedView, ServiceError> {
        let snapshot = self.sessions.with_session(id, |s| {
            s.set_ready(player, ready)?;
            Ok(s.snapshot())
        })?;
        Ok(redact_for(&snapshot, Some(player)))
    }

    /// Applies a host settings patch.
    #[instrument(skip(self, patch), fields(session_id = %id, requester = %requester))]
    pub fn update_settings(
        &self,
        id: &SessionId,
        requester: &PlayerId,
        patch: &SettingsPatch,
    ) -> Result<Settings, ServiceError> {
        self.sessions
            .with_session(id, |s| s.update_settings(requester, patch))
    }

    /// Deals roles, opens the first night and narrates the intro.
    #[instrument(skip(self), fields(session_id = %id, requester = %requester))]
    pub async fn start_game(
        &self,
        id: &SessionId,
        requester: &PlayerId,
    ) -> Result<RedactedView, ServiceError> {
        let intro = self.sessions.with_session(id, |s| {
            let counts = s.start_game(requester)?;
            debug!(?counts, "Roles dealt");
            Ok(s.intro_summary())
        })?;

        let text = self.intro_text(&intro).await;
        self.sessions.with_session(id, |s| {
            s.record_narration(NarrationKind::Intro, text);
            Ok(())
        })?;
        self.view(id, Some(requester))
    }

    /// Records a night action; may complete the night.
    #[instrument(skip(self, action), fields(session_id = %id, player_id = %player, kind = %action.kind()))]
    pub async fn night_action(
        &self,
        id: &SessionId,
        player: &PlayerId,
        action: NightAction,
    ) -> Result<StepReport, ServiceError> {
        let pending = self.sessions.with_session(id, |s| {
            let outcome = s.record_night_action(player, action)?;
            Ok(outcome.map(|o| Pending::Night(s.night_summary(&o))))
        })?;
        self.step(id, Some(player), pending).await
    }

    /// Marks the day as read by a player; may open discussion.
    #[instrument(skip(self), fields(session_id = %id, player_id = %player))]
    pub fn acknowledge_day(
        &self,
        id: &SessionId,
        player: &PlayerId,
    ) -> Result<RedactedView, ServiceError> {
        let opened = self
            .sessions
            .with_session(id, |s| s.acknowledge_day(player))?;
        if opened {
            info!("Every living player acknowledged the day");
        }
        self.view(id, Some(player))
    }

    /// Opens discussion without waiting for acknowledgements.
    #[instrument(skip(self), fields(session_id = %id))]
    pub fn begin_discussion(&self, id: &SessionId) -> Result<RedactedView, ServiceError> {
        self.sessions.with_session(id, |s| s.begin_discussion())?;
        self.view(id, None)
    }

    /// Records a ballot; may complete the vote.
    #[instrument(skip(self), fields(session_id = %id, player_id = %voter))]
    pub async fn cast_vote(
        &self,
        id: &SessionId,
        voter: &PlayerId,
        target: VoteTarget,
    ) -> Result<StepReport, ServiceError> {
        let pending = self.sessions.with_session(id, |s| {
            let outcome = s.record_vote(voter, target)?;
            Ok(outcome.map(|o| Pending::Votes(s.vote_summary(&o))))
        })?;
        self.step(id, Some(voter), pending).await
    }

    /// Resolves the night with whatever has been submitted.
    #[instrument(skip(self), fields(session_id = %id))]
    pub async fn force_resolve_night(
        &self,
        id: &SessionId,
    ) -> Result<ResolutionReport, ServiceError> {
        let summary = self.sessions.with_session(id, |s| {
            let outcome = s.force_resolve_night()?;
            Ok(s.night_summary(&outcome))
        })?;
        self.narrate(id, Pending::Night(summary)).await
    }

    /// Resolves the vote with whatever has been cast.
    #[instrument(skip(self), fields(session_id = %id))]
    pub async fn force_resolve_votes(
        &self,
        id: &SessionId,
    ) -> Result<ResolutionReport, ServiceError> {
        let summary = self.sessions.with_session(id, |s| {
            let outcome = s.force_resolve_votes()?;
            Ok(s.vote_summary(&outcome))
        })?;
        self.narrate(id, Pending::Votes(summary)).await
    }

    /// Handles a dropped player under the configured policy.
    #[instrument(skip(self), fields(session_id = %id, player_id = %player, policy = ?self.policy))]
    pub async fn disconnect(
        &self,
        id: &SessionId,
        player: &PlayerId,
    ) -> Result<DisconnectReport, ServiceError> {
        let policy = self.policy;
        let (outcome, pending) = self.sessions.with_session(id, |s| {
            Ok(match s.disconnect(player, policy)? {
                Disconnected::Left => ("left", None),
                Disconnected::SeatKept => ("seat_kept", None),
                Disconnected::Forfeited(resolution) => (
                    "forfeited",
                    resolution.map(|r| Pending::from_resolution(s, &r)),
                ),
            })
        })?;

        let resolution = match pending {
            Some(pending) => Some(self.narrate(id, pending).await?),
            None => None,
        };
        let evicted = self.sessions.evict_if_empty(id)?;
        info!(outcome, evicted, "Disconnect handled");
        Ok(DisconnectReport {
            outcome,
            resolution,
            evicted,
        })
    }

    /// The session as one viewer may see it.
    #[instrument(skip(self), fields(session_id = %id))]
    pub fn get_state(
        &self,
        id: &SessionId,
        viewer: Option<&PlayerId>,
    ) -> Result<RedactedView, ServiceError> {
        self.view(id, viewer)
    }

    /// Lists live sessions.
    pub fn list_games(&self) -> Result<Vec<SessionListing>, ServiceError> {
        self.sessions.list()
    }

    /// Subscribes to change notifications for a session.
    pub fn subscribe(
        &self,
        id: &SessionId,
    ) -> Result<broadcast::Receiver<SessionBroadcast>, ServiceError> {
        self.sessions.subscribe(id)
    }

    fn view(&self, id: &SessionId, viewer: Option<&PlayerId>) -> Result<RedactedView, ServiceError> {
        let snapshot = self.sessions.snapshot(id)?;
        Ok(redact_for(&snapshot, viewer))
    }

    async fn step(
        &self,
        id: &SessionId,
        viewer: Option<&PlayerId>,
        pending: Option<Pending>,
    ) -> Result<StepReport, ServiceError> {
        let resolution = match pending {
            Some(pending) => Some(self.narrate(id, pending).await?),
            None => None,
        };
        Ok(StepReport {
            view: self.view(id, viewer)?,
            resolution,
        })
    }

    async fn narrate(
        &self,
        id: &SessionId,
        pending: Pending,
    ) -> Result<ResolutionReport, ServiceError> {
        let (kind, narration, report) = match pending {
            Pending::Night(summary) => {
                let text = match self.narrator.narrate_night(&summary).await {
                    Ok(text) => text,
                    Err(e) => {
                        error!(error = %e, round = summary.round, "Night narration failed");
                        FallbackNarrator::night(&summary)
                    }
                };
                (
                    NarrationKind::Night,
                    text.clone(),
                    ResolutionReport::Night {
                        summary,
                        narration: text,
                    },
                )
            }
            Pending::Votes(summary) => {
                let text = match self.narrator.narrate_votes(&summary).await {
                    Ok(text) => text,
                    Err(e) => {
                        error!(error = %e, round = summary.round, "Vote narration failed");
                        FallbackNarrator::votes(&summary)
                    }
                };
                (
                    NarrationKind::Votes,
                    text.clone(),
                    ResolutionReport::Votes {
                        summary,
                        narration: text,
                    },
                )
            }
        };

        self.sessions.with_session(id, |s| {
            s.record_narration(kind, narration);
            Ok(())
        })?;
        Ok(report)
    }

    async fn intro_text(&self, intro: &IntroSummary) -> String {
        match self.narrator.narrate_intro(intro).await {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, "Intro narration failed");
                FallbackNarrator::intro(intro)
            }
        }
    }
}
