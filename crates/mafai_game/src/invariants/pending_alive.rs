//! Pending submission invariant: only the living act, and only in role.

use super::Invariant;
use crate::session::Session;

/// Invariant: every pending night action comes from a living player whose
/// role allows that action, and every pending ballot from a living voter.
pub struct PendingAliveInvariant;

impl Invariant<Session> for PendingAliveInvariant {
    fn holds(session: &Session) -> bool {
        let roster = session.roster();

        let actions_ok = session.night().entries().all(|(actor, action)| {
            roster.get(actor).is_some_and(|p| {
                p.is_alive() && p.role().night_action() == Some(*action.kind())
            })
        });
        let votes_ok = session
            .votes()
            .entries()
            .all(|(voter, _)| roster.get(voter).is_some_and(|p| p.is_alive()));

        actions_ok && votes_ok
    }

    fn description() -> &'static str {
        "Pending actions and votes come from living, role-matching players"
    }
}
