//! Games played through the service layer with fixed narration.

use async_trait::async_trait;
use mafai::{
    FallbackNarrator, GameService, LlmError, Narrator, ResolutionReport, ServiceError,
    SessionManager,
};
use mafai_game::{
    ActionKind, DisconnectPolicy, ErrorKind, Faction, GameEvent, IntroSummary, NarrationKind,
    NightAction, NightSummary, Phase, PlayerId, Role, SessionId, VoteSummary, VoteTarget,
};
use std::sync::Arc;

/// Narrator whose every call fails.
struct BrokenNarrator;

#[async_trait]
impl Narrator for BrokenNarrator {
    async fn narrate_intro(&self, _: &IntroSummary) -> Result<String, LlmError> {
        Err(LlmError::new("offline".to_string()))
    }

    async fn narrate_night(&self, _: &NightSummary) -> Result<String, LlmError> {
        Err(LlmError::new("offline".to_string()))
    }

    async fn narrate_votes(&self, _: &VoteSummary) -> Result<String, LlmError> {
        Err(LlmError::new("offline".to_string()))
    }
}

fn service(narrator: Arc<dyn Narrator>, policy: DisconnectPolicy) -> GameService {
    GameService::new(SessionManager::new(Some(42)), narrator, policy)
}

fn table(service: &GameService, names: &[&str]) -> (SessionId, Vec<PlayerId>) {
    let (id, host, _) = service
        .create_game(names[0], Some("A snowed-in ski lodge".to_string()))
        .expect("Failed to create game");
    let mut ids = vec![host];
    for name in &names[1..] {
        let (player, _) = service.join_game(&id, name).expect("Failed to join");
        ids.push(player);
    }
    (id, ids)
}

fn holder(service: &GameService, id: &SessionId, role: Role) -> PlayerId {
    service
        .sessions()
        .snapshot(id)
        .expect("Session missing")
        .players
        .iter()
        .find(|p| *p.role() == role)
        .map(|p| p.id().clone())
        .expect("Role not dealt")
}

fn narrations(service: &GameService, id: &SessionId) -> Vec<(NarrationKind, String)> {
    service
        .sessions()
        .snapshot(id)
        .expect("Session missing")
        .log
        .into_iter()
        .filter_map(|entry| match entry.event {
            GameEvent::Narration { kind, text } => Some((kind, text)),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_full_game_with_narration() {
    let service = service(Arc::new(FallbackNarrator), DisconnectPolicy::KeepSeat);
    let (id, ids) = table(&service, &["Ada", "Bo", "Cy", "Di"]);

    let view = service
        .start_game(&id, &ids[0])
        .await
        .expect("Failed to start");
    assert_eq!(view.phase, Phase::Night);
    assert_eq!(narrations(&service, &id)[0].0, NarrationKind::Intro);

    let mafia = holder(&service, &id, Role::Mafia);
    let doctor = holder(&service, &id, Role::Doctor);
    let detective = holder(&service, &id, Role::Detective);
    let villager = holder(&service, &id, Role::Villager);

    let step = service
        .night_action(
            &id,
            &mafia,
            NightAction::new(ActionKind::Kill, villager.clone()).with_activity("Sharpening skis"),
        )
        .await
        .expect("Kill rejected");
    assert!(step.resolution.is_none());
    assert_eq!(step.view.acted_count, 1);

    service
        .night_action(&id, &doctor, NightAction::new(ActionKind::Save, doctor.clone()))
        .await
        .expect("Save rejected");
    let step = service
        .night_action(
            &id,
            &detective,
            NightAction::new(ActionKind::Investigate, mafia.clone()),
        )
        .await
        .expect("Investigation rejected");

    match step.resolution {
        Some(ResolutionReport::Night { summary, narration }) => {
            assert_eq!(summary.deaths.len(), 1);
            assert_eq!(summary.activities, vec!["Sharpening skis".to_string()]);
            assert!(narration.contains(&summary.deaths[0]));
        }
        other => panic!("Expected night resolution, got {:?}", other),
    }
    assert_eq!(step.view.phase, Phase::Day);
    assert_eq!(step.view.findings.len(), 1);
    assert_eq!(step.view.findings[0].role, Role::Mafia);

    for player in [&mafia, &doctor, &detective] {
        service
            .acknowledge_day(&id, player)
            .expect("Acknowledge rejected");
    }
    assert_eq!(
        service.get_state(&id, None).expect("State").phase,
        Phase::Discussion
    );

    service
        .cast_vote(&id, &doctor, VoteTarget::Player(mafia.clone()))
        .await
        .expect("Vote rejected");
    service
        .cast_vote(&id, &mafia, VoteTarget::Skip)
        .await
        .expect("Vote rejected");
    let step = service
        .cast_vote(&id, &detective, VoteTarget::Player(mafia.clone()))
        .await
        .expect("Vote rejected");

    assert!(matches!(
        step.resolution,
        Some(ResolutionReport::Votes { .. })
    ));
    assert_eq!(step.view.phase, Phase::End);
    assert_eq!(step.view.winner, Some(Faction::Town));
    assert!(step.view.players.iter().all(|p| p.role.is_some()));

    let kinds: Vec<NarrationKind> = narrations(&service, &id).into_iter().map(|n| n.0).collect();
    assert_eq!(
        kinds,
        vec![NarrationKind::Intro, NarrationKind::Night, NarrationKind::Votes]
    );
}

#[tokio::test]
async fn test_narrator_failure_falls_back() {
    let service = service(Arc::new(BrokenNarrator), DisconnectPolicy::KeepSeat);
    let (id, ids) = table(&service, &["Ada", "Bo", "Cy", "Di"]);
    service
        .start_game(&id, &ids[0])
        .await
        .expect("Failed to start");

    let report = service
        .force_resolve_night(&id)
        .await
        .expect("Force resolve failed");
    match report {
        ResolutionReport::Night { summary, narration } => {
            assert_eq!(narration, FallbackNarrator::night(&summary));
        }
        other => panic!("Expected night resolution, got {:?}", other),
    }

    let texts = narrations(&service, &id);
    assert_eq!(texts.len(), 2);
    assert!(texts[0].1.contains("Ada"));
}

#[tokio::test]
async fn test_forfeit_completes_the_vote() {
    let service = service(Arc::new(FallbackNarrator), DisconnectPolicy::Eliminate);
    let (id, ids) = table(&service, &["Ada", "Bo", "Cy", "Di", "Ed", "Flo"]);
    service
        .start_game(&id, &ids[0])
        .await
        .expect("Failed to start");
    service.force_resolve_night(&id).await.expect("Night failed");
    service.begin_discussion(&id).expect("Discussion failed");

    let mafia = holder(&service, &id, Role::Mafia);
    let alive: Vec<PlayerId> = service
        .get_state(&id, None)
        .expect("State")
        .players
        .into_iter()
        .filter(|p| p.alive)
        .map(|p| p.id)
        .collect();
    let (last, voters) = alive
        .iter()
        .filter(|p| **p != mafia)
        .cloned()
        .collect::<Vec<_>>()
        .split_last()
        .map(|(last, rest)| (last.clone(), rest.to_vec()))
        .expect("Town players");

    service
        .cast_vote(&id, &mafia, VoteTarget::Skip)
        .await
        .expect("Vote rejected");
    for voter in &voters {
        service
            .cast_vote(&id, voter, VoteTarget::Skip)
            .await
            .expect("Vote rejected");
    }

    let report = service.disconnect(&id, &last).await.expect("Disconnect");
    assert_eq!(report.outcome, "forfeited");
    assert!(matches!(
        report.resolution,
        Some(ResolutionReport::Votes { .. })
    ));
    assert!(!report.evicted);
}

#[tokio::test]
async fn test_keep_seat_changes_nothing() {
    let service = service(Arc::new(FallbackNarrator), DisconnectPolicy::KeepSeat);
    let (id, ids) = table(&service, &["Ada", "Bo", "Cy", "Di"]);
    service
        .start_game(&id, &ids[0])
        .await
        .expect("Failed to start");
    let before = service.sessions().snapshot(&id).expect("Snapshot");

    let report = service.disconnect(&id, &ids[2]).await.expect("Disconnect");
    assert_eq!(report.outcome, "seat_kept");
    assert_eq!(service.sessions().snapshot(&id).expect("Snapshot"), before);
}

#[tokio::test]
async fn test_empty_lobby_is_evicted() {
    let service = service(Arc::new(FallbackNarrator), DisconnectPolicy::KeepSeat);
    let (id, ids) = table(&service, &["Ada", "Bo"]);

    assert!(service.leave_game(&id, &ids[1]).expect("Leave"));
    assert_eq!(service.list_games().expect("List").len(), 1);

    let report = service.disconnect(&id, &ids[0]).await.expect("Disconnect");
    assert_eq!(report.outcome, "left");
    assert!(report.evicted);

    let err = service.get_state(&id, None).expect_err("Session should be gone");
    assert_eq!(err, ServiceError::SessionNotFound(id));
    assert_eq!(err.kind(), Some(ErrorKind::NotFound));
}

#[tokio::test]
async fn test_broadcast_on_every_change() {
    let service = service(Arc::new(FallbackNarrator), DisconnectPolicy::KeepSeat);
    let (id, ids) = table(&service, &["Ada", "Bo", "Cy", "Di"]);
    let mut rx = service.subscribe(&id).expect("Subscribe");

    service
        .set_ready(&id, &ids[1], true)
        .expect("Ready rejected");
    let note = rx.recv().await.expect("Broadcast");
    assert_eq!(note.session_id, id);
    assert_eq!(
        note.version,
        service.sessions().snapshot(&id).expect("Snapshot").version
    );

    let err = service
        .start_game(&id, &ids[1])
        .await
        .expect_err("Non-host start");
    assert_eq!(err.kind(), Some(ErrorKind::Unauthorized));
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_sessions_run_independently() {
    let service = service(Arc::new(FallbackNarrator), DisconnectPolicy::KeepSeat);
    let (first, first_ids) = table(&service, &["Ada", "Bo", "Cy", "Di"]);
    let (second, _) = table(&service, &["Eve", "Fay", "Gus", "Hal"]);
    assert_ne!(first, second);

    service
        .start_game(&first, &first_ids[0])
        .await
        .expect("Failed to start");
    assert_eq!(
        service.get_state(&second, None).expect("State").phase,
        Phase::Lobby
    );

    let err = service
        .join_game(&first, "Late")
        .expect_err("Join after start");
    assert_eq!(err.kind(), Some(ErrorKind::WrongPhase));
}
