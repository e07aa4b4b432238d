//! A single game instance and its phase controller.
//!
//! Every public mutating operation validates first and applies second, so
//! a rejected call leaves the session exactly as it was. Resolution that a
//! submission completes runs inside that same call; callers holding the
//! session behind a lock therefore never observe a "complete but
//! unresolved" state.

use derive_getters::Getters;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::action::{NightAction, VoteTarget};
use crate::assignment::{self, RoleCounts};
use crate::error::{GameError, GameResult};
use crate::event_log::{EliminationCause, EventLog, GameEvent, NarrationKind};
use crate::invariants::{InvariantSet, SessionInvariants};
use crate::narration::{IntroSummary, NightSummary, VoteSummary};
use crate::night::{self, Investigation, NightLedger, NightOutcome};
use crate::roster::Roster;
use crate::rules;
use crate::settings::{Settings, SettingsPatch};
use crate::snapshot::{Ballot, DetectiveRecord, PendingAction, SessionSnapshot};
use crate::types::{Faction, Phase, PlayerId, SessionId};
use crate::vote::{self, VoteLedger, VoteOutcome};

/// What a mid-game disconnect does to the absent player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisconnectPolicy {
    /// Nothing; the seat stays and force-resolution covers the gap.
    #[default]
    KeepSeat,
    /// The player forfeits and is eliminated.
    Eliminate,
}

/// A resolution that ran as a side effect of another operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A night was resolved.
    Night(NightOutcome),
    /// A vote was resolved.
    Votes(VoteOutcome),
}

/// Result of [`Session::disconnect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disconnected {
    /// Removed from the lobby.
    Left,
    /// Still seated; nothing changed.
    SeatKept,
    /// Eliminated by forfeit, possibly completing a pending resolution.
    Forfeited(Option<Resolution>),
}

/// One game instance, keyed by a short join code.
#[derive(Debug, Getters)]
pub struct Session {
    /// Join code.
    id: SessionId,
    /// Bumped on every successful mutation.
    version: u64,
    /// Current phase.
    phase: Phase,
    /// Current host; `None` only when the roster is empty.
    host: Option<PlayerId>,
    /// Free-text theme, informational only.
    theme: Option<String>,
    /// Night counter; 0 until the game starts.
    round: u32,
    /// Players in join order.
    roster: Roster,
    /// Host-configured settings.
    settings: Settings,
    /// Tonight's pending actions.
    night: NightLedger,
    /// Findings per detective, never cleared.
    detective_results: Vec<DetectiveRecord>,
    /// Today's pending ballots.
    votes: VoteLedger,
    /// Living players who have read the day's narration.
    day_acks: Vec<PlayerId>,
    /// Shared event log.
    log: EventLog,
    /// Winning side, once decided.
    winner: Option<Faction>,
    /// Single random source for every draw in this session.
    #[getter(skip)]
    rng: StdRng,
}

impl Session {
    /// Creates a session with its host as roster member 0.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidInput`] for a bad host name.
    #[instrument(skip(rng), fields(session_id = %id))]
    pub fn new(
        id: SessionId,
        host_name: &str,
        theme: Option<String>,
        rng: StdRng,
    ) -> GameResult<(Self, PlayerId)> {
        let theme = theme
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        let mut roster = Roster::new();
        let host = roster.join(host_name)?;

        let mut session = Self {
            id,
            version: 0,
            phase: Phase::Lobby,
            host: Some(host.clone()),
            theme: theme.clone(),
            round: 0,
            roster,
            settings: Settings::default(),
            night: NightLedger::new(),
            detective_results: Vec::new(),
            votes: VoteLedger::new(),
            day_acks: Vec::new(),
            log: EventLog::new(),
            winner: None,
            rng,
        };
        let name = session.display_name(&host);
        session.record(GameEvent::SessionCreated {
            host: host.clone(),
            name,
            theme,
        });
        info!(host_id = %host, "Session created");
        session.commit();
        Ok((session, host))
    }

    /// Adds a player to the lobby.
    ///
    /// # Errors
    ///
    /// [`GameError::GameAlreadyStarted`] outside the lobby, or
    /// [`GameError::InvalidInput`] for a bad name.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn join(&mut self, name: &str) -> GameResult<PlayerId> {
        if self.phase != Phase::Lobby {
            warn!(phase = %self.phase, "Join rejected");
            return Err(GameError::GameAlreadyStarted);
        }
        let id = self.roster.join(name)?;
        let name = self.display_name(&id);
        self.record(GameEvent::PlayerJoined {
            player: id.clone(),
            name,
        });
        if self.host.is_none() {
            self.host = Some(id.clone());
        }
        info!(player_id = %id, "Player joined");
        self.commit();
        Ok(id)
    }

    /// Removes a player from the lobby, transferring host if needed.
    ///
    /// Returns `false` if the identity was not rostered.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn remove(&mut self, player: &PlayerId) -> GameResult<bool> {
        self.require_phase(Phase::Lobby, "remove a player")?;
        let Some(left) = self.roster.remove(player) else {
            debug!(player_id = %player, "Nothing to remove");
            return Ok(false);
        };
        self.record(GameEvent::PlayerLeft {
            player: left.id().clone(),
            name: left.name().clone(),
        });
        info!(player_id = %player, "Player left");
        if self.host.as_ref() == Some(player) {
            self.transfer_host();
        }
        self.commit();
        Ok(true)
    }

    /// Sets a player's lobby ready flag. Informational only.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn set_ready(&mut self, player: &PlayerId, ready: bool) -> GameResult<()> {
        self.require_phase(Phase::Lobby, "change readiness")?;
        let entry = self
            .roster
            .get_mut(player)
            .ok_or_else(|| GameError::PlayerNotFound(player.clone()))?;
        entry.set_ready(ready);
        self.record(GameEvent::PlayerReady {
            player: player.clone(),
            ready,
        });
        self.commit();
        Ok(())
    }

    /// Merges a settings patch. Host only, lobby only.
    ///
    /// # Errors
    ///
    /// [`GameError::Unauthorized`], [`GameError::WrongPhase`] or
    /// [`GameError::InvalidSetting`]; previous settings survive any error.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn update_settings(
        &mut self,
        requester: &PlayerId,
        patch: &SettingsPatch,
    ) -> GameResult<Settings> {
        self.require_host(requester, "change settings")?;
        self.require_phase(Phase::Lobby, "change settings")?;
        let next = self.settings.apply(patch)?;
        self.settings = next;
        self.record(GameEvent::SettingsUpdated);
        info!(settings = ?next, "Settings updated");
        self.commit();
        Ok(next)
    }

    /// Deals roles and opens the first night.
    ///
    /// # Errors
    ///
    /// [`GameError::Unauthorized`], [`GameError::WrongPhase`],
    /// [`GameError::NotEnoughPlayers`], or [`GameError::InvalidSetting`]
    /// when no mafia is configured.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn start_game(&mut self, requester: &PlayerId) -> GameResult<RoleCounts> {
        self.require_host(requester, "start the game")?;
        self.require_phase(Phase::Lobby, "start the game")?;
        if *self.settings.mafia() == 0 {
            return Err(GameError::InvalidSetting(
                "at least one mafia is required to start".into(),
            ));
        }

        let counts = assignment::assign_roles(&mut self.roster, &self.settings, &mut self.rng)?;
        self.phase = Phase::RoleAssignment;
        self.record(GameEvent::RolesAssigned { counts });

        self.night.clear();
        self.votes.clear();
        self.day_acks.clear();
        self.round = 1;
        if !self.finish_if_won() {
            self.phase = Phase::Night;
            self.record(GameEvent::NightBegan);
        }
        info!(players = self.roster.len(), "Game started");
        self.commit();
        Ok(counts)
    }

    /// Records a specialist's night action, resolving the night if it was
    /// the last one outstanding.
    ///
    /// # Errors
    ///
    /// [`GameError::WrongPhase`], [`GameError::PlayerNotFound`],
    /// [`GameError::DeadPlayer`], [`GameError::RoleMismatch`] or
    /// [`GameError::InvalidTarget`].
    #[instrument(skip(self, action), fields(session_id = %self.id, kind = %action.kind()))]
    pub fn record_night_action(
        &mut self,
        actor: &PlayerId,
        action: NightAction,
    ) -> GameResult<Option<NightOutcome>> {
        self.require_phase(Phase::Night, "submit a night action")?;
        let role = *self.roster.require_alive(actor)?.role();
        if role.night_action() != Some(*action.kind()) {
            warn!(%role, "Action does not match role");
            return Err(GameError::RoleMismatch {
                role,
                attempted: *action.kind(),
            });
        }
        if !self.roster.contains(action.target()) {
            return Err(GameError::InvalidTarget(action.target().clone()));
        }

        debug!(%role, target = %action.target(), "Night action recorded");
        self.night.record(actor.clone(), action);

        let outcome = self
            .all_actions_received()
            .then(|| self.resolve_night_now());
        self.commit();
        Ok(outcome)
    }

    /// True once every living specialist has acted tonight.
    pub fn all_actions_received(&self) -> bool {
        self.roster
            .active_specialists()
            .all(|p| self.night.has_acted(p.id()))
    }

    /// Resolves the night with whatever has been submitted.
    ///
    /// # Errors
    ///
    /// [`GameError::AlreadyResolved`] once the night has moved on to day or
    /// discussion; [`GameError::WrongPhase`] otherwise outside NIGHT.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn force_resolve_night(&mut self) -> GameResult<NightOutcome> {
        match self.phase {
            Phase::Night => {}
            Phase::Day | Phase::Discussion => {
                return Err(GameError::AlreadyResolved(self.phase));
            }
            phase => {
                return Err(GameError::WrongPhase {
                    operation: "resolve the night",
                    phase,
                });
            }
        }
        let missing = self
            .roster
            .active_specialists()
            .filter(|p| !self.night.has_acted(p.id()))
            .count();
        warn!(missing, "Forcing night resolution");
        let outcome = self.resolve_night_now();
        self.commit();
        Ok(outcome)
    }

    /// Marks a living player as having read the day's narration.
    ///
    /// Returns true if this acknowledgement opened the discussion.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn acknowledge_day(&mut self, player: &PlayerId) -> GameResult<bool> {
        self.require_phase(Phase::Day, "acknowledge the day")?;
        self.roster.require_alive(player)?;
        if !self.day_acks.contains(player) {
            self.day_acks.push(player.clone());
        }
        let everyone = self.all_acknowledged();
        if everyone {
            self.open_discussion();
        }
        self.commit();
        Ok(everyone)
    }

    /// Opens the discussion without waiting for acknowledgements.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn begin_discussion(&mut self) -> GameResult<()> {
        self.require_phase(Phase::Day, "begin discussion")?;
        self.open_discussion();
        self.commit();
        Ok(())
    }

    /// Records a ballot, resolving the vote if it was the last one.
    ///
    /// # Errors
    ///
    /// [`GameError::WrongPhase`], [`GameError::PlayerNotFound`],
    /// [`GameError::DeadPlayer`] for the voter, or
    /// [`GameError::InvalidTarget`] for an unknown or dead target.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn record_vote(
        &mut self,
        voter: &PlayerId,
        target: VoteTarget,
    ) -> GameResult<Option<VoteOutcome>> {
        self.require_phase(Phase::Discussion, "vote")?;
        self.roster.require_alive(voter)?;
        if let VoteTarget::Player(id) = &target {
            if !self.roster.get(id).is_some_and(|p| p.is_alive()) {
                return Err(GameError::InvalidTarget(id.clone()));
            }
        }

        debug!(%target, "Vote recorded");
        self.votes.record(voter.clone(), target);

        let outcome = self.all_votes_received().then(|| self.resolve_votes_now());
        self.commit();
        Ok(outcome)
    }

    /// True once every living player has voted.
    pub fn all_votes_received(&self) -> bool {
        self.roster.alive().all(|p| self.votes.has_voted(p.id()))
    }

    /// Tallies whatever ballots are in, including none at all.
    ///
    /// # Errors
    ///
    /// [`GameError::AlreadyResolved`] during a later night;
    /// [`GameError::WrongPhase`] otherwise outside DISCUSSION.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn force_resolve_votes(&mut self) -> GameResult<VoteOutcome> {
        match self.phase {
            Phase::Discussion => {}
            Phase::Night if self.round > 1 => {
                return Err(GameError::AlreadyResolved(self.phase));
            }
            phase => {
                return Err(GameError::WrongPhase {
                    operation: "resolve the votes",
                    phase,
                });
            }
        }
        warn!(
            ballots = self.votes.len(),
            alive = self.roster.alive_count(),
            "Forcing vote resolution"
        );
        let outcome = self.resolve_votes_now();
        self.commit();
        Ok(outcome)
    }

    /// Handles a player dropping off.
    ///
    /// In the lobby this is [`Session::remove`]. Mid-game the policy
    /// decides; a forfeit may end the game or complete a pending set.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn disconnect(
        &mut self,
        player: &PlayerId,
        policy: DisconnectPolicy,
    ) -> GameResult<Disconnected> {
        if self.phase == Phase::Lobby {
            return if self.remove(player)? {
                Ok(Disconnected::Left)
            } else {
                Err(GameError::PlayerNotFound(player.clone()))
            };
        }

        let alive = self.roster.require(player)?.is_alive();
        if self.phase == Phase::End || !alive || policy == DisconnectPolicy::KeepSeat {
            debug!(?policy, alive, "Seat kept");
            return Ok(Disconnected::SeatKept);
        }

        self.eliminate(player, EliminationCause::Forfeit);
        let resolution = if self.finish_if_won() {
            None
        } else {
            match self.phase {
                Phase::Night if self.all_actions_received() => {
                    Some(Resolution::Night(self.resolve_night_now()))
                }
                Phase::Discussion if self.all_votes_received() => {
                    Some(Resolution::Votes(self.resolve_votes_now()))
                }
                Phase::Day if self.all_acknowledged() => {
                    self.open_discussion();
                    None
                }
                _ => None,
            }
        };
        self.commit();
        Ok(Disconnected::Forfeited(resolution))
    }

    /// Appends narrator text to the log, verbatim.
    #[instrument(skip(self, text), fields(session_id = %self.id))]
    pub fn record_narration(&mut self, kind: NarrationKind, text: impl Into<String>) {
        self.record(GameEvent::Narration {
            kind,
            text: text.into(),
        });
        self.commit();
    }

    /// Evaluates the win condition without acting on it.
    pub fn check_winner(&self) -> Option<Faction> {
        rules::check_winner(&self.roster)
    }

    /// True when nobody is left; the store evicts such sessions.
    pub fn is_empty(&self) -> bool {
        self.roster.is_empty()
    }

    /// Findings made by one detective so far.
    pub fn findings_for(&self, detective: &PlayerId) -> &[Investigation] {
        self.detective_results
            .iter()
            .find(|r| &r.detective == detective)
            .map(|r| r.findings.as_slice())
            .unwrap_or_default()
    }

    /// Opening story request.
    pub fn intro_summary(&self) -> IntroSummary {
        IntroSummary::new(&self.roster, self.theme.clone())
    }

    /// Narration request for a resolved night.
    pub fn night_summary(&self, outcome: &NightOutcome) -> NightSummary {
        NightSummary::new(outcome, &self.roster, self.theme.clone())
    }

    /// Narration request for a resolved vote.
    pub fn vote_summary(&self, outcome: &VoteOutcome) -> VoteSummary {
        VoteSummary::new(outcome, &self.roster, self.theme.clone())
    }

    /// Full-truth snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id.clone(),
            version: self.version,
            phase: self.phase,
            round: self.round,
            host: self.host.clone(),
            theme: self.theme.clone(),
            settings: self.settings,
            players: self.roster.iter().cloned().collect(),
            night_actions: self
                .night
                .entries()
                .map(|(player, action)| PendingAction {
                    player: player.clone(),
                    action: action.clone(),
                })
                .collect(),
            votes: self
                .votes
                .entries()
                .map(|(voter, target)| Ballot {
                    voter: voter.clone(),
                    target: target.clone(),
                })
                .collect(),
            day_acks: self.day_acks.clone(),
            detective_results: self.detective_results.clone(),
            winner: self.winner,
            log: self.log.entries().to_vec(),
        }
    }

    fn resolve_night_now(&mut self) -> NightOutcome {
        let outcome = night::resolve_night(&self.night, &self.roster, self.round, &mut self.rng);

        for (detective, finding) in &outcome.investigations {
            self.add_finding(detective, finding.clone());
        }

        match (&outcome.eliminated, &outcome.target) {
            (Some(victim), _) => self.eliminate(victim, EliminationCause::Night),
            (None, Some(target)) if outcome.saved => {
                let name = self.display_name(target);
                self.record(GameEvent::TargetSaved {
                    player: target.clone(),
                    name,
                });
            }
            _ => {
                self.record(GameEvent::QuietNight);
            }
        }

        self.night.clear();
        if !self.finish_if_won() {
            self.phase = Phase::Day;
            self.day_acks.clear();
            self.record(GameEvent::DayBegan);
        }
        info!(
            round = self.round,
            eliminated = ?outcome.eliminated,
            saved = outcome.saved,
            "Night resolved"
        );
        outcome
    }

    fn resolve_votes_now(&mut self) -> VoteOutcome {
        let outcome = vote::resolve_votes(&self.votes, &self.roster, self.round, &mut self.rng);
        self.record(GameEvent::VotesResolved {
            verdict: outcome.verdict,
            ballots: outcome.ballots(),
        });
        if let Some(victim) = &outcome.eliminated {
            self.eliminate(victim, EliminationCause::Vote);
        }

        self.votes.clear();
        if !self.finish_if_won() {
            self.round += 1;
            self.phase = Phase::Night;
            self.night.clear();
            self.record(GameEvent::NightBegan);
        }
        info!(
            verdict = ?outcome.verdict,
            eliminated = ?outcome.eliminated,
            "Votes resolved"
        );
        outcome
    }

    fn open_discussion(&mut self) {
        self.phase = Phase::Discussion;
        self.votes.clear();
        self.day_acks.clear();
        self.record(GameEvent::DiscussionBegan);
    }

    fn all_acknowledged(&self) -> bool {
        self.roster.alive().all(|p| self.day_acks.contains(p.id()))
    }

    fn eliminate(&mut self, player: &PlayerId, cause: EliminationCause) {
        let Some(entry) = self.roster.get_mut(player) else {
            return;
        };
        entry.eliminate();
        let name = entry.name().clone();

        self.night.remove(player);
        self.votes.remove(player);
        self.day_acks.retain(|id| id != player);

        info!(player_id = %player, ?cause, "Player eliminated");
        self.record(GameEvent::PlayerEliminated {
            player: player.clone(),
            name,
            cause,
        });
        if self.host.as_ref() == Some(player) {
            self.transfer_host();
        }
    }

    fn finish_if_won(&mut self) -> bool {
        let Some(winner) = rules::check_winner(&self.roster) else {
            return false;
        };
        self.winner = Some(winner);
        self.phase = Phase::End;
        self.night.clear();
        self.votes.clear();
        self.record(GameEvent::GameOver { winner });
        info!(%winner, "Game over");
        true
    }

    fn transfer_host(&mut self) {
        let next = self
            .roster
            .alive()
            .next()
            .or_else(|| self.roster.first())
            .map(|p| (p.id().clone(), p.name().clone()));

        match next {
            Some((to, name)) => {
                info!(host_id = %to, "Host transferred");
                self.host = Some(to.clone());
                self.record(GameEvent::HostTransferred { to, name });
            }
            None => {
                debug!("Roster empty; no host");
                self.host = None;
            }
        }
    }

    fn add_finding(&mut self, detective: &PlayerId, finding: Investigation) {
        match self
            .detective_results
            .iter_mut()
            .find(|r| &r.detective == detective)
        {
            Some(record) => record.findings.push(finding),
            None => self.detective_results.push(DetectiveRecord {
                detective: detective.clone(),
                findings: vec![finding],
            }),
        }
    }

    fn require_phase(&self, phase: Phase, operation: &'static str) -> GameResult<()> {
        if self.phase == phase {
            Ok(())
        } else {
            warn!(expected = %phase, actual = %self.phase, operation, "Wrong phase");
            Err(GameError::WrongPhase {
                operation,
                phase: self.phase,
            })
        }
    }

    fn require_host(&self, requester: &PlayerId, operation: &'static str) -> GameResult<()> {
        if self.host.as_ref() == Some(requester) {
            Ok(())
        } else {
            warn!(player_id = %requester, operation, "Host-only operation rejected");
            Err(GameError::Unauthorized(operation))
        }
    }

    fn display_name(&self, id: &PlayerId) -> String {
        self.roster.name_of(id).unwrap_or_default().to_string()
    }

    fn record(&mut self, event: GameEvent) -> u64 {
        self.log.append(self.round, self.phase, event)
    }

    fn commit(&mut self) {
        self.version += 1;
        debug_assert!(
            SessionInvariants::check_all(self).is_ok(),
            "Session invariants violated: {:?}",
            SessionInvariants::check_all(self)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionKind;
    use crate::types::Role;
    use rand::SeedableRng;

    struct Table {
        session: Session,
        ids: Vec<PlayerId>,
    }

    impl Table {
        fn host(&self) -> &PlayerId {
            &self.ids[0]
        }

        fn with_role(&self, role: Role) -> PlayerId {
            self.session
                .roster()
                .iter()
                .find(|p| *p.role() == role)
                .map(|p| p.id().clone())
                .unwrap()
        }
    }

    fn lobby(n: usize, seed: u64) -> Table {
        let (mut session, host) = Session::new(
            SessionId::from("TEST22"),
            "P0",
            Some("Harbor town".into()),
            StdRng::seed_from_u64(seed),
        )
        .unwrap();
        let mut ids = vec![host];
        for i in 1..n {
            ids.push(session.join(&format!("P{i}")).unwrap());
        }
        Table { session, ids }
    }

    fn started(n: usize, seed: u64) -> Table {
        let mut table = lobby(n, seed);
        let host = table.host().clone();
        table.session.start_game(&host).unwrap();
        table
    }

    #[test]
    fn test_new_session_lobby() {
        let table = lobby(1, 0);
        assert_eq!(*table.session.phase(), Phase::Lobby);
        assert_eq!(*table.session.round(), 0);
        assert_eq!(table.session.host().as_ref(), Some(table.host()));
        assert_eq!(table.session.theme().as_deref(), Some("Harbor town"));
    }

    #[test]
    fn test_join_after_start_rejected() {
        let mut table = started(4, 1);
        let version = *table.session.version();
        assert_eq!(table.session.join("Late"), Err(GameError::GameAlreadyStarted));
        assert_eq!(*table.session.version(), version);
    }

    #[test]
    fn test_non_host_cannot_start() {
        let mut table = lobby(4, 1);
        let guest = table.ids[1].clone();
        assert_eq!(
            table.session.start_game(&guest),
            Err(GameError::Unauthorized("start the game"))
        );
        assert_eq!(*table.session.phase(), Phase::Lobby);
    }

    #[test]
    fn test_start_opens_night_one() {
        let table = started(5, 2);
        assert_eq!(*table.session.phase(), Phase::Night);
        assert_eq!(*table.session.round(), 1);
        assert_eq!(table.session.roster().count_role(Role::Villager), 2);
    }

    #[test]
    fn test_start_requires_four() {
        let mut table = lobby(3, 2);
        let host = table.host().clone();
        assert!(matches!(
            table.session.start_game(&host),
            Err(GameError::NotEnoughPlayers { required: 4, actual: 3 })
        ));
        assert_eq!(*table.session.phase(), Phase::Lobby);
    }

    #[test]
    fn test_start_requires_mafia() {
        let mut table = lobby(4, 2);
        let host = table.host().clone();
        table
            .session
            .update_settings(
                &host,
                &SettingsPatch {
                    mafia: Some(0),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(matches!(
            table.session.start_game(&host),
            Err(GameError::InvalidSetting(_))
        ));
    }

    #[test]
    fn test_rejected_settings_keep_previous() {
        let mut table = lobby(4, 0);
        let host = table.host().clone();
        let before = *table.session.settings();
        let result = table.session.update_settings(
            &host,
            &SettingsPatch {
                mafia: Some(2),
                day_duration: Some(0),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(GameError::InvalidSetting(_))));
        assert_eq!(*table.session.settings(), before);
    }

    #[test]
    fn test_settings_non_host_unauthorized() {
        let mut table = lobby(4, 0);
        let guest = table.ids[2].clone();
        let result = table.session.update_settings(&guest, &SettingsPatch::default());
        assert_eq!(result, Err(GameError::Unauthorized("change settings")));
    }

    #[test]
    fn test_vote_during_night_is_wrong_phase() {
        let mut table = started(4, 3);
        let voter = table.ids[1].clone();
        let result = table.session.record_vote(&voter, VoteTarget::Skip);
        assert!(matches!(result, Err(GameError::WrongPhase { phase: Phase::Night, .. })));
    }

    #[test]
    fn test_villager_cannot_act() {
        let mut table = started(4, 3);
        let villager = table.with_role(Role::Villager);
        let target = table.host().clone();
        let result = table
            .session
            .record_night_action(&villager, NightAction::new(ActionKind::Kill, target));
        assert!(matches!(
            result,
            Err(GameError::RoleMismatch {
                role: Role::Villager,
                attempted: ActionKind::Kill
            })
        ));
        assert!(table.session.night().is_empty());
    }

    #[test]
    fn test_unknown_night_target() {
        let mut table = started(4, 3);
        let mafia = table.with_role(Role::Mafia);
        let result = table.session.record_night_action(
            &mafia,
            NightAction::new(ActionKind::Kill, PlayerId::from("ghost")),
        );
        assert!(matches!(result, Err(GameError::InvalidTarget(_))));
    }

    #[test]
    fn test_last_action_resolves_night() {
        let mut table = started(4, 4);
        let mafia = table.with_role(Role::Mafia);
        let doctor = table.with_role(Role::Doctor);
        let detective = table.with_role(Role::Detective);
        let villager = table.with_role(Role::Villager);

        let s = &mut table.session;
        assert!(s
            .record_night_action(&mafia, NightAction::new(ActionKind::Kill, villager.clone()))
            .unwrap()
            .is_none());
        assert!(s
            .record_night_action(&doctor, NightAction::new(ActionKind::Save, doctor.clone()))
            .unwrap()
            .is_none());
        let outcome = s
            .record_night_action(
                &detective,
                NightAction::new(ActionKind::Investigate, mafia.clone()),
            )
            .unwrap()
            .unwrap();

        assert_eq!(outcome.eliminated, Some(villager.clone()));
        assert_eq!(*s.phase(), Phase::Day);
        assert!(!s.roster().get(&villager).unwrap().is_alive());
        assert_eq!(s.findings_for(&detective)[0].role, Role::Mafia);
        assert!(s.night().is_empty());
    }

    #[test]
    fn test_force_resolve_night_twice() {
        let mut table = started(5, 5);
        table.session.force_resolve_night().unwrap();
        assert_eq!(
            table.session.force_resolve_night(),
            Err(GameError::AlreadyResolved(Phase::Day))
        );
    }

    #[test]
    fn test_force_resolve_night_in_lobby() {
        let mut table = lobby(4, 5);
        assert!(matches!(
            table.session.force_resolve_night(),
            Err(GameError::WrongPhase { .. })
        ));
    }

    #[test]
    fn test_acknowledgements_open_discussion() {
        let mut table = started(5, 6);
        table.session.force_resolve_night().unwrap();
        let alive: Vec<PlayerId> = table.session.roster().alive().map(|p| p.id().clone()).collect();
        let (last, rest) = alive.split_last().unwrap();
        for id in rest {
            assert!(!table.session.acknowledge_day(id).unwrap());
        }
        assert!(table.session.acknowledge_day(last).unwrap());
        assert_eq!(*table.session.phase(), Phase::Discussion);
    }

    #[test]
    fn test_forced_empty_vote_starts_next_night() {
        let mut table = started(5, 7);
        table.session.force_resolve_night().unwrap();
        table.session.begin_discussion().unwrap();
        let outcome = table.session.force_resolve_votes().unwrap();
        assert_eq!(outcome.verdict, crate::event_log::VoteVerdict::NoVotesCast);
        assert_eq!(*table.session.phase(), Phase::Night);
        assert_eq!(*table.session.round(), 2);
        assert_eq!(
            table.session.force_resolve_votes(),
            Err(GameError::AlreadyResolved(Phase::Night))
        );
    }

    #[test]
    fn test_vote_for_dead_player_rejected() {
        let mut table = started(5, 8);
        let mafia = table.with_role(Role::Mafia);
        let victim = table
            .session
            .roster()
            .iter()
            .find(|p| *p.role() == Role::Villager)
            .map(|p| p.id().clone())
            .unwrap();
        table
            .session
            .record_night_action(&mafia, NightAction::new(ActionKind::Kill, victim.clone()))
            .unwrap();
        table.session.force_resolve_night().unwrap();
        table.session.begin_discussion().unwrap();
        let result = table.session.record_vote(&mafia, VoteTarget::Player(victim));
        assert!(matches!(result, Err(GameError::InvalidTarget(_))));
    }

    #[test]
    fn test_host_leaving_lobby_transfers() {
        let mut table = lobby(3, 0);
        let host = table.host().clone();
        assert!(table.session.remove(&host).unwrap());
        assert_eq!(table.session.host().as_ref(), Some(&table.ids[1]));
        assert!(!table.session.remove(&host).unwrap());
    }

    #[test]
    fn test_disconnect_keep_seat_is_noop() {
        let mut table = started(4, 9);
        let who = table.ids[2].clone();
        let version = *table.session.version();
        assert_eq!(
            table.session.disconnect(&who, DisconnectPolicy::KeepSeat),
            Ok(Disconnected::SeatKept)
        );
        assert_eq!(*table.session.version(), version);
    }

    #[test]
    fn test_disconnect_forfeit_can_end_game() {
        let mut table = started(4, 10);
        let mafia = table.with_role(Role::Mafia);
        let result = table
            .session
            .disconnect(&mafia, DisconnectPolicy::Eliminate)
            .unwrap();
        assert_eq!(result, Disconnected::Forfeited(None));
        assert_eq!(*table.session.phase(), Phase::End);
        assert_eq!(*table.session.winner(), Some(Faction::Town));
    }

    #[test]
    fn test_disconnect_forfeit_completes_night() {
        let mut table = started(5, 11);
        let mafia = table.with_role(Role::Mafia);
        let doctor = table.with_role(Role::Doctor);
        let detective = table.with_role(Role::Detective);
        let villager = table.with_role(Role::Villager);
        table
            .session
            .record_night_action(&mafia, NightAction::new(ActionKind::Kill, villager))
            .unwrap();
        table
            .session
            .record_night_action(&doctor, NightAction::new(ActionKind::Save, mafia.clone()))
            .unwrap();
        let result = table
            .session
            .disconnect(&detective, DisconnectPolicy::Eliminate)
            .unwrap();
        assert!(matches!(
            result,
            Disconnected::Forfeited(Some(Resolution::Night(_)))
        ));
        assert_eq!(*table.session.phase(), Phase::Day);
    }

    #[test]
    fn test_failed_operations_do_not_log() {
        let mut table = started(4, 12);
        let before = table.session.log().len();
        let _ = table.session.begin_discussion();
        let _ = table.session.force_resolve_votes();
        let _ = table.session.set_ready(&table.ids[0].clone(), true);
        assert_eq!(table.session.log().len(), before);
    }

    #[test]
    fn test_roles_never_in_log() {
        let table = started(6, 13);
        let json = serde_json::to_string(table.session.log()).unwrap();
        assert!(!json.contains("\"role\""));
        for player in table.session.roster().iter() {
            let needle = format!("{}\",\"role", player.id());
            assert!(!json.contains(&needle));
        }
    }
}
