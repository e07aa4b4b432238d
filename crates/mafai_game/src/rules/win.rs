//! Win detection.

use tracing::instrument;

use crate::roster::Roster;
use crate::types::Faction;

/// Checks whether either side has won.
///
/// Town wins once no mafia is alive. Mafia wins once they are no longer
/// outnumbered by the living town. Returns `None` while the game goes on.
#[instrument(skip(roster))]
pub fn check_winner(roster: &Roster) -> Option<Faction> {
    let mafia = roster.alive_in(Faction::Mafia);
    let town = roster.alive_in(Faction::Town);

    if mafia == 0 {
        Some(Faction::Town)
    } else if mafia >= town {
        Some(Faction::Mafia)
    } else {
        None
    }
}
