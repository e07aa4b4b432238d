//! The roster: players in join order.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{GameError, GameResult};
use crate::types::{Faction, Player, PlayerId, Role};

/// Longest accepted display name, in characters.
pub const MAX_NAME_LEN: usize = 32;

/// Players of a session, kept in insertion (join) order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    players: Vec<Player>,
}

impl Roster {
    /// Creates an empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a player under a freshly generated identity.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidInput`] for an empty or over-long name.
    #[instrument(skip(self))]
    pub fn join(&mut self, name: &str) -> GameResult<PlayerId> {
        let name = validate_name(name)?;
        let id = PlayerId::generate();
        debug!(player_id = %id, name = %name, "Player added to roster");
        self.players.push(Player::new(id.clone(), name));
        Ok(id)
    }

    /// Removes a player, returning the removed record.
    pub fn remove(&mut self, id: &PlayerId) -> Option<Player> {
        let index = self.position(id)?;
        Some(self.players.remove(index))
    }

    /// Looks up a player by identity.
    pub fn get(&self, id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id() == id)
    }

    pub(crate) fn get_mut(&mut self, id: &PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id() == id)
    }

    /// Looks up a player, failing if unknown.
    pub fn require(&self, id: &PlayerId) -> GameResult<&Player> {
        self.get(id)
            .ok_or_else(|| GameError::PlayerNotFound(id.clone()))
    }

    /// Looks up a player, failing if unknown or eliminated.
    pub fn require_alive(&self, id: &PlayerId) -> GameResult<&Player> {
        let player = self.require(id)?;
        if !player.is_alive() {
            return Err(GameError::DeadPlayer(id.clone()));
        }
        Ok(player)
    }

    /// Join-order index of a player.
    pub fn position(&self, id: &PlayerId) -> Option<usize> {
        self.players.iter().position(|p| p.id() == id)
    }

    /// Returns true if the identity is rostered.
    pub fn contains(&self, id: &PlayerId) -> bool {
        self.get(id).is_some()
    }

    /// Display name for an identity, if rostered.
    pub fn name_of(&self, id: &PlayerId) -> Option<&str> {
        self.get(id).map(|p| p.name().as_str())
    }

    /// Iterates over all players in join order.
    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players.iter_mut()
    }

    /// Iterates over living players in join order.
    pub fn alive(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.is_alive())
    }

    /// Number of living players.
    pub fn alive_count(&self) -> usize {
        self.alive().count()
    }

    /// Living players holding an active night role.
    pub fn active_specialists(&self) -> impl Iterator<Item = &Player> {
        self.alive().filter(|p| p.role().is_specialist())
    }

    /// Living players of the given faction.
    pub fn alive_in(&self, faction: Faction) -> usize {
        self.alive().filter(|p| p.role().faction() == faction).count()
    }

    /// Number of players currently holding a role.
    pub fn count_role(&self, role: Role) -> usize {
        self.players.iter().filter(|p| *p.role() == role).count()
    }

    /// Total number of players.
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Returns true if nobody is left.
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Oldest remaining player, the successor for host transfer.
    pub fn first(&self) -> Option<&Player> {
        self.players.first()
    }
}

fn validate_name(name: &str) -> GameResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(GameError::InvalidInput("name must not be empty".into()));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(GameError::InvalidInput(format!(
            "name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}
