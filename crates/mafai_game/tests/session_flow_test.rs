//! End-to-end games driven through the public session API.

use mafai_game::invariants::{InvariantSet, SessionInvariants};
use mafai_game::{
    ActionKind, ErrorKind, Faction, GameEvent, NightAction, Phase, PlayerId, Role, Session,
    SessionId, SettingsPatch, VoteTarget, VoteVerdict,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn table(names: &[&str], seed: u64) -> (Session, Vec<PlayerId>) {
    let (mut session, host) = Session::new(
        SessionId::from("FLOW22"),
        names[0],
        Some("A fog-bound fishing village".to_string()),
        StdRng::seed_from_u64(seed),
    )
    .expect("Failed to create session");
    let mut ids = vec![host];
    for name in &names[1..] {
        ids.push(session.join(name).expect("Failed to join"));
    }
    (session, ids)
}

fn holder(session: &Session, role: Role) -> PlayerId {
    session
        .roster()
        .iter()
        .find(|p| *p.role() == role)
        .map(|p| p.id().clone())
        .expect("Role not dealt")
}

fn holders(session: &Session, role: Role) -> Vec<PlayerId> {
    session
        .roster()
        .iter()
        .filter(|p| *p.role() == role)
        .map(|p| p.id().clone())
        .collect()
}

#[test]
fn test_four_player_game_to_the_end() {
    let (mut session, ids) = table(&["A", "B", "C", "D"], 21);
    session.start_game(&ids[0]).expect("Failed to start");
    assert_eq!(*session.phase(), Phase::Night);
    assert_eq!(*session.round(), 1);

    for role in [Role::Mafia, Role::Doctor, Role::Detective, Role::Villager] {
        assert_eq!(session.roster().count_role(role), 1);
    }

    let mafia = holder(&session, Role::Mafia);
    let doctor = holder(&session, Role::Doctor);
    let detective = holder(&session, Role::Detective);
    let villager = holder(&session, Role::Villager);

    session
        .record_night_action(&mafia, NightAction::new(ActionKind::Kill, villager.clone()))
        .expect("Kill rejected");
    session
        .record_night_action(&doctor, NightAction::new(ActionKind::Save, detective.clone()))
        .expect("Save rejected");
    let night = session
        .record_night_action(
            &detective,
            NightAction::new(ActionKind::Investigate, mafia.clone()),
        )
        .expect("Investigation rejected")
        .expect("Night should resolve on the last action");

    assert_eq!(night.eliminated, Some(villager.clone()));
    assert!(!night.saved);
    assert_eq!(*session.phase(), Phase::Day);

    session.begin_discussion().expect("Failed to open discussion");
    let alive: Vec<PlayerId> = session.roster().alive().map(|p| p.id().clone()).collect();
    assert_eq!(alive.len(), 3);

    let mut outcome = None;
    for voter in &alive {
        outcome = session
            .record_vote(voter, VoteTarget::Player(mafia.clone()))
            .expect("Vote rejected");
    }
    let outcome = outcome.expect("Votes should resolve on the last ballot");
    assert_eq!(outcome.eliminated, Some(mafia));
    assert_eq!(*session.phase(), Phase::End);
    assert_eq!(*session.winner(), Some(Faction::Town));
    assert!(SessionInvariants::check_all(&session).is_ok());
}

#[test]
fn test_six_player_game_returns_to_night() {
    let (mut session, ids) = table(&["A", "B", "C", "D", "E", "F"], 5);
    session.start_game(&ids[0]).expect("Failed to start");

    let mafia = holder(&session, Role::Mafia);
    let villagers = holders(&session, Role::Villager);
    session
        .record_night_action(&mafia, NightAction::new(ActionKind::Kill, villagers[0].clone()))
        .expect("Kill rejected");
    session.force_resolve_night().expect("Force failed");
    assert_eq!(*session.phase(), Phase::Day);

    session.begin_discussion().expect("Failed to open discussion");
    let alive: Vec<PlayerId> = session.roster().alive().map(|p| p.id().clone()).collect();
    for voter in &alive {
        session
            .record_vote(voter, VoteTarget::Player(villagers[1].clone()))
            .expect("Vote rejected");
    }

    assert_eq!(*session.phase(), Phase::Night);
    assert_eq!(*session.round(), 2);
    assert_eq!(session.roster().alive_count(), 4);
    assert!(session.night().is_empty());
    assert!(session.votes().is_empty());
}

#[test]
fn test_doctor_save_blocks_kill() {
    let (mut session, ids) = table(&["A", "B", "C", "D", "E"], 8);
    session.start_game(&ids[0]).expect("Failed to start");
    let mafia = holder(&session, Role::Mafia);
    let doctor = holder(&session, Role::Doctor);
    let villager = holder(&session, Role::Villager);

    session
        .record_night_action(&mafia, NightAction::new(ActionKind::Kill, villager.clone()))
        .expect("Kill rejected");
    session
        .record_night_action(&doctor, NightAction::new(ActionKind::Save, villager.clone()))
        .expect("Save rejected");
    let outcome = session.force_resolve_night().expect("Force failed");

    assert!(outcome.saved);
    assert_eq!(outcome.eliminated, None);
    assert_eq!(session.roster().alive_count(), 5);
    assert!(session.log().entries().iter().any(|e| matches!(
        &e.event,
        GameEvent::TargetSaved { player, .. } if *player == villager
    )));
}

#[test]
fn test_detective_history_accumulates() {
    let (mut session, ids) = table(&["A", "B", "C", "D", "E", "F"], 13);
    session.start_game(&ids[0]).expect("Failed to start");
    let detective = holder(&session, Role::Detective);
    let doctor = holder(&session, Role::Doctor);
    let villager = holder(&session, Role::Villager);

    session
        .record_night_action(
            &detective,
            NightAction::new(ActionKind::Investigate, doctor.clone()),
        )
        .expect("Investigation rejected");
    session.force_resolve_night().expect("Force failed");
    session.begin_discussion().expect("Failed to open discussion");
    session.force_resolve_votes().expect("Force failed");

    session
        .record_night_action(
            &detective,
            NightAction::new(ActionKind::Investigate, villager.clone()),
        )
        .expect("Investigation rejected");
    session.force_resolve_night().expect("Force failed");

    let findings = session.findings_for(&detective);
    assert_eq!(findings.len(), 2);
    assert_eq!((findings[0].round, findings[0].role), (1, Role::Doctor));
    assert_eq!((findings[1].round, findings[1].role), (2, Role::Villager));
}

#[test]
fn test_skip_majority_keeps_everyone() {
    let (mut session, ids) = table(&["A", "B", "C", "D", "E"], 2);
    session.start_game(&ids[0]).expect("Failed to start");
    session.force_resolve_night().expect("Force failed");
    session.begin_discussion().expect("Failed to open discussion");

    let alive: Vec<PlayerId> = session.roster().alive().map(|p| p.id().clone()).collect();
    let (last, rest) = alive.split_last().expect("Nobody alive");
    for voter in rest {
        session.record_vote(voter, VoteTarget::Skip).expect("Vote rejected");
    }
    let outcome = session
        .record_vote(last, VoteTarget::Player(rest[0].clone()))
        .expect("Vote rejected")
        .expect("Votes should resolve");

    assert_eq!(outcome.verdict, VoteVerdict::SkipMajority);
    assert_eq!(session.roster().alive_count(), 5);
    assert_eq!(*session.round(), 2);
}

#[test]
fn test_mafia_kill_tie_is_reproducible() {
    let kill = |seed| {
        let (mut session, ids) = table(&["A", "B", "C", "D", "E", "F", "G"], seed);
        session
            .update_settings(
                &ids[0],
                &SettingsPatch {
                    mafia: Some(2),
                    doctor: Some(0),
                    detective: Some(0),
                    ..Default::default()
                },
            )
            .expect("Settings rejected");
        session.start_game(&ids[0]).expect("Failed to start");

        let mafia = holders(&session, Role::Mafia);
        let villagers = holders(&session, Role::Villager);
        session
            .record_night_action(&mafia[0], NightAction::new(ActionKind::Kill, villagers[0].clone()))
            .expect("Kill rejected");
        let outcome = session
            .record_night_action(&mafia[1], NightAction::new(ActionKind::Kill, villagers[1].clone()))
            .expect("Kill rejected")
            .expect("Night should resolve");

        let victim = outcome.eliminated.expect("A tie still kills");
        villagers
            .iter()
            .position(|v| *v == victim)
            .expect("Victim was a target")
    };

    assert_eq!(kill(99), kill(99));
}

#[test]
fn test_out_of_order_calls_are_fail_closed() {
    let (mut session, ids) = table(&["A", "B", "C", "D"], 1);
    let before = session.snapshot();

    let errors = [
        session
            .record_vote(&ids[1], VoteTarget::Skip)
            .map(|_| ())
            .expect_err("Vote in lobby"),
        session
            .record_night_action(&ids[1], NightAction::new(ActionKind::Kill, ids[2].clone()))
            .map(|_| ())
            .expect_err("Night action in lobby"),
        session.begin_discussion().expect_err("Discussion in lobby"),
        session.start_game(&ids[3]).map(|_| ()).expect_err("Guest start"),
    ];

    assert_eq!(errors[0].kind(), ErrorKind::WrongPhase);
    assert_eq!(errors[3].kind(), ErrorKind::Unauthorized);
    assert_eq!(session.snapshot(), before);
}

#[test]
fn test_end_accepts_only_narration() {
    let (mut session, ids) = table(&["A", "B", "C", "D"], 3);
    session.start_game(&ids[0]).expect("Failed to start");
    let mafia = holder(&session, Role::Mafia);
    session
        .disconnect(&mafia, mafai_game::DisconnectPolicy::Eliminate)
        .expect("Disconnect failed");
    assert_eq!(*session.phase(), Phase::End);

    assert!(session.force_resolve_night().is_err());
    assert!(session.force_resolve_votes().is_err());
    assert!(session.join("Late").is_err());

    let seq = session.log().len();
    session.record_narration(mafai_game::NarrationKind::Votes, "The village sleeps easy.");
    assert_eq!(session.log().len(), seq + 1);
}
