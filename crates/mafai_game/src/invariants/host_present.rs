//! Host invariant: the host is a living roster member.

use super::Invariant;
use crate::session::Session;

/// Invariant: while anyone is rostered, the host is a rostered player,
/// and alive as long as anyone is alive.
///
/// An empty roster has no host.
pub struct HostPresentInvariant;

impl Invariant<Session> for HostPresentInvariant {
    fn holds(session: &Session) -> bool {
        let roster = session.roster();
        match session.host() {
            None => roster.is_empty(),
            Some(host) => match roster.get(host) {
                Some(player) => player.is_alive() || roster.alive_count() == 0,
                None => false,
            },
        }
    }

    fn description() -> &'static str {
        "Host is a living roster member"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SessionId;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn session() -> Session {
        Session::new(SessionId::from("HOST22"), "Ada", None, StdRng::seed_from_u64(0))
            .unwrap()
            .0
    }

    #[test]
    fn test_new_session_holds() {
        assert!(HostPresentInvariant::holds(&session()));
    }

    #[test]
    fn test_transfer_on_leave_holds() {
        let mut session = session();
        let host = session.host().clone().unwrap();
        let bo = session.join("Bo").unwrap();
        session.remove(&host).unwrap();
        assert_eq!(session.host().as_ref(), Some(&bo));
        assert!(HostPresentInvariant::holds(&session));
    }

    #[test]
    fn test_empty_roster_has_no_host() {
        let mut session = session();
        let host = session.host().clone().unwrap();
        session.remove(&host).unwrap();
        assert!(session.host().is_none());
        assert!(HostPresentInvariant::holds(&session));
    }
}
