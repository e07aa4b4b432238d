//! Role dealing.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use tracing::{debug, instrument};

use crate::error::{GameError, GameResult};
use crate::roster::Roster;
use crate::settings::Settings;
use crate::types::Role;

/// Smallest table that can hold one of each specialist plus a villager.
pub const MIN_PLAYERS: usize = 4;

/// How many of each role were dealt. Safe to publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleCounts {
    /// Mafia dealt.
    pub mafia: usize,
    /// Doctors dealt.
    pub doctor: usize,
    /// Detectives dealt.
    pub detective: usize,
    /// Villagers dealt.
    pub villager: usize,
}

impl RoleCounts {
    /// Total tokens dealt.
    pub fn total(&self) -> usize {
        self.mafia + self.doctor + self.detective + self.villager
    }
}

/// Builds the deck for a roster of `players`: specialists from the
/// settings, villagers for the remainder.
///
/// # Errors
///
/// Returns [`GameError::NotEnoughPlayers`] when the roster is below
/// [`MIN_PLAYERS`] or leaves no room for a villager.
pub fn build_deck(settings: &Settings, players: usize) -> GameResult<Vec<Role>> {
    let specialists = settings.specialist_count();
    let required = MIN_PLAYERS.max(specialists + 1);
    if players < required {
        return Err(GameError::NotEnoughPlayers {
            required,
            actual: players,
        });
    }

    let mut deck = Vec::with_capacity(players);
    for role in Role::iter().filter(|r| r.is_specialist()) {
        deck.extend(std::iter::repeat_n(role, settings.seats_for(role)));
    }
    deck.extend(std::iter::repeat_n(Role::Villager, players - specialists));
    Ok(deck)
}

/// Shuffles the deck and deals one token per player in roster order.
///
/// Validates before touching the roster, so a failure leaves every
/// player unassigned.
#[instrument(skip(roster, rng), fields(players = roster.len()))]
pub fn assign_roles<R: Rng + ?Sized>(
    roster: &mut Roster,
    settings: &Settings,
    rng: &mut R,
) -> GameResult<RoleCounts> {
    let mut deck = build_deck(settings, roster.len())?;
    deck.shuffle(rng);

    for (player, role) in roster.iter_mut().zip(deck) {
        player.assign_role(role);
    }

    let counts = RoleCounts {
        mafia: roster.count_role(Role::Mafia),
        doctor: roster.count_role(Role::Doctor),
        detective: roster.count_role(Role::Detective),
        villager: roster.count_role(Role::Villager),
    };
    debug!(?counts, "Roles dealt");
    Ok(counts)
}
