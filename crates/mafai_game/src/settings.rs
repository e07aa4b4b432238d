//! Host-configurable session settings.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{GameError, GameResult};
use crate::types::Role;

/// Role counts and phase durations for a session.
///
/// Always valid: a `Settings` value can only be produced by
/// [`Settings::default`] or by a validated [`Settings::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct Settings {
    /// Number of mafia.
    mafia: u32,
    /// Number of doctors.
    doctor: u32,
    /// Number of detectives.
    detective: u32,
    /// Day length in seconds, consumed by the external timeout layer.
    day_duration: u32,
    /// Night length in seconds, consumed by the external timeout layer.
    night_duration: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mafia: 1,
            doctor: 1,
            detective: 1,
            day_duration: 120,
            night_duration: 60,
        }
    }
}

impl Settings {
    /// Total number of specialist tokens in the deck.
    pub fn specialist_count(&self) -> usize {
        self.mafia as usize + self.doctor as usize + self.detective as usize
    }

    /// Configured tokens for a specialist role; zero for the rest.
    pub fn seats_for(&self, role: Role) -> usize {
        match role {
            Role::Mafia => self.mafia as usize,
            Role::Doctor => self.doctor as usize,
            Role::Detective => self.detective as usize,
            Role::Villager | Role::Unassigned => 0,
        }
    }

    /// Merges a partial update, returning the new settings.
    ///
    /// `self` is never modified; a rejected patch leaves the caller
    /// holding the previous configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidSetting`] for negative role counts,
    /// non-positive durations, or values that do not fit in `u32`.
    #[instrument]
    pub fn apply(&self, patch: &SettingsPatch) -> GameResult<Settings> {
        let mut next = *self;

        if let Some(v) = patch.mafia {
            next.mafia = role_count("mafia", v)?;
        }
        if let Some(v) = patch.doctor {
            next.doctor = role_count("doctor", v)?;
        }
        if let Some(v) = patch.detective {
            next.detective = role_count("detective", v)?;
        }
        if let Some(v) = patch.day_duration {
            next.day_duration = duration("day_duration", v)?;
        }
        if let Some(v) = patch.night_duration {
            next.night_duration = duration("night_duration", v)?;
        }

        debug!(?next, "Settings patch validated");
        Ok(next)
    }
}

fn role_count(field: &str, value: i64) -> GameResult<u32> {
    if value < 0 {
        return Err(GameError::InvalidSetting(format!(
            "{field} must be non-negative, got {value}"
        )));
    }
    u32::try_from(value)
        .map_err(|_| GameError::InvalidSetting(format!("{field} is too large: {value}")))
}

fn duration(field: &str, value: i64) -> GameResult<u32> {
    if value <= 0 {
        return Err(GameError::InvalidSetting(format!(
            "{field} must be a positive number of seconds, got {value}"
        )));
    }
    u32::try_from(value)
        .map_err(|_| GameError::InvalidSetting(format!("{field} is too large: {value}")))
}

/// Partial settings update; absent fields keep their current value.
///
/// Fields are signed so that negative input is reported as an invalid
/// setting rather than a parse failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsPatch {
    /// New mafia count.
    #[serde(default)]
    pub mafia: Option<i64>,
    /// New doctor count.
    #[serde(default)]
    pub doctor: Option<i64>,
    /// New detective count.
    #[serde(default)]
    pub detective: Option<i64>,
    /// New day duration in seconds.
    #[serde(default)]
    pub day_duration: Option<i64>,
    /// New night duration in seconds.
    #[serde(default)]
    pub night_duration: Option<i64>,
}
