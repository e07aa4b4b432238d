//! Role count invariant: the dealt deck matches the settings.

use strum::IntoEnumIterator;

use super::Invariant;
use crate::session::Session;
use crate::types::{Phase, Role};

/// Invariant: before the deal nobody holds a role; after it, the
/// specialist counts equal the settings and villagers fill the rest.
pub struct RoleCountsInvariant;

impl Invariant<Session> for RoleCountsInvariant {
    fn holds(session: &Session) -> bool {
        let roster = session.roster();
        if *session.phase() == Phase::Lobby {
            return roster.count_role(Role::Unassigned) == roster.len();
        }

        let settings = session.settings();
        let specialists = settings.specialist_count();
        roster.count_role(Role::Unassigned) == 0
            && Role::iter()
                .filter(|r| r.is_specialist())
                .all(|r| roster.count_role(r) == settings.seats_for(r))
            && roster.len() >= specialists
            && roster.count_role(Role::Villager) == roster.len() - specialists
    }

    fn description() -> &'static str {
        "Dealt roles match the settings and cover the roster"
    }
}
