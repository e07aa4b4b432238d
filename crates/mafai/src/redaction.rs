//! Per-viewer views of a session snapshot.
//!
//! The core hands out full truth. Everything that leaves the process goes
//! through [`redact_for`] first.

use mafai_game::{
    Faction, Investigation, LogEntry, NightAction, Phase, PlayerId, Role, SessionId,
    SessionSnapshot, Settings, VoteTarget,
};
use serde::Serialize;
use tracing::{debug, instrument};

/// A roster entry as one viewer may see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisiblePlayer {
    /// Player identity.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Alive flag.
    pub alive: bool,
    /// Lobby readiness.
    pub ready: bool,
    /// True for the current host.
    pub is_host: bool,
    /// Role, only when the viewer is entitled to it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

/// A session as seen by one viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedactedView {
    /// Join code.
    pub session_id: SessionId,
    /// Snapshot version.
    pub version: u64,
    /// Current phase.
    pub phase: Phase,
    /// Current round.
    pub round: u32,
    /// Current host.
    pub host: Option<PlayerId>,
    /// Session theme.
    pub theme: Option<String>,
    /// Active settings.
    pub settings: Settings,
    /// Who is looking; `None` for spectators.
    pub viewer: Option<PlayerId>,
    /// Roster in join order.
    pub players: Vec<VisiblePlayer>,
    /// How many night actions are in. Only specialists act, so the
    /// actors themselves stay hidden.
    pub acted_count: usize,
    /// Players who have voted today.
    pub voted: Vec<PlayerId>,
    /// Players who have acknowledged the day.
    pub day_acks: Vec<PlayerId>,
    /// The viewer's own pending night action.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub my_action: Option<NightAction>,
    /// The viewer's own pending ballot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub my_vote: Option<VoteTarget>,
    /// The viewer's own detective findings.
    pub findings: Vec<Investigation>,
    /// Winning side once the game is over.
    pub winner: Option<Faction>,
    /// Shared event log.
    pub log: Vec<LogEntry>,
}

/// Builds the view a given player (or a spectator) is allowed to see.
///
/// Roles are shown for the viewer themself, for fellow mafia when the
/// viewer is mafia, and for everyone once the game has ended. Unknown
/// viewers are treated as spectators.
#[instrument(skip(snapshot), fields(session_id = %snapshot.id, version = snapshot.version))]
pub fn redact_for(snapshot: &SessionSnapshot, viewer: Option<&PlayerId>) -> RedactedView {
    let viewer = viewer.filter(|id| snapshot.player(id).is_some());
    let viewer_role = viewer
        .and_then(|id| snapshot.player(id))
        .map(|p| *p.role());
    let game_over = snapshot.phase == Phase::End;

    let sees_role = |id: &PlayerId, role: Role| {
        game_over
            || viewer == Some(id)
            || (viewer_role == Some(Role::Mafia) && role == Role::Mafia)
    };

    let players = snapshot
        .players
        .iter()
        .map(|p| VisiblePlayer {
            id: p.id().clone(),
            name: p.name().clone(),
            alive: *p.alive(),
            ready: *p.ready(),
            is_host: snapshot.host.as_ref() == Some(p.id()),
            role: sees_role(p.id(), *p.role()).then_some(*p.role()),
        })
        .collect();

    let my_action = viewer.and_then(|id| {
        snapshot
            .night_actions
            .iter()
            .find(|a| &a.player == id)
            .map(|a| a.action.clone())
    });
    let my_vote = viewer.and_then(|id| {
        snapshot
            .votes
            .iter()
            .find(|b| &b.voter == id)
            .map(|b| b.target.clone())
    });
    let findings = viewer
        .and_then(|id| {
            snapshot
                .detective_results
                .iter()
                .find(|r| &r.detective == id)
        })
        .map(|r| r.findings.clone())
        .unwrap_or_default();

    debug!(
        viewer = ?viewer,
        visible_roles = ?viewer_role,
        "Redacted snapshot"
    );

    RedactedView {
        session_id: snapshot.id.clone(),
        version: snapshot.version,
        phase: snapshot.phase,
        round: snapshot.round,
        host: snapshot.host.clone(),
        theme: snapshot.theme.clone(),
        settings: snapshot.settings,
        viewer: viewer.cloned(),
        players,
        acted_count: snapshot.night_actions.len(),
        voted: snapshot.votes.iter().map(|b| b.voter.clone()).collect(),
        day_acks: snapshot.day_acks.clone(),
        my_action,
        my_vote,
        findings,
        winner: snapshot.winner,
        log: snapshot.log.clone(),
    }
}
