//! Session store: every live game, keyed by join code.
//!
//! Each session sits behind its own mutex, so operations on one game are
//! serialized while different games proceed in parallel. The registry
//! lock is only held long enough to find or insert an entry.

use crate::error::ServiceError;
use derive_new::new;
use mafai_game::{GameResult, Phase, PlayerId, Session, SessionId, SessionSnapshot};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

/// Broadcast buffer per session; slow subscribers skip ahead.
const BROADCAST_CAPACITY: usize = 64;

/// Attempts at drawing an unused join code before giving up.
const CODE_ATTEMPTS: usize = 32;

/// Published after every successful mutation of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct SessionBroadcast {
    /// Which session changed.
    pub session_id: SessionId,
    /// Its version after the change.
    pub version: u64,
}

/// Lobby-list entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionListing {
    /// Join code.
    pub session_id: SessionId,
    /// Current phase.
    pub phase: Phase,
    /// Roster size.
    pub players: usize,
    /// Current round.
    pub round: u32,
    /// Session theme.
    pub theme: Option<String>,
}

#[derive(Debug, Clone)]
struct SessionEntry {
    session: Arc<Mutex<Session>>,
    events: broadcast::Sender<SessionBroadcast>,
}

#[derive(Debug)]
struct Registry {
    sessions: HashMap<SessionId, SessionEntry>,
    /// Draws join codes.
    rng: StdRng,
    /// Base seed for per-session random sources.
    seed: Option<u64>,
    /// Sessions created so far; offsets the base seed.
    created: u64,
}

impl Registry {
    fn session_rng(&mut self) -> StdRng {
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(self.created)),
            None => StdRng::from_os_rng(),
        };
        self.created += 1;
        rng
    }

    fn fresh_code(&mut self) -> Option<SessionId> {
        (0..CODE_ATTEMPTS)
            .map(|_| SessionId::generate(&mut self.rng))
            .find(|code| !self.sessions.contains_key(code))
    }
}

/// Manages all game sessions.
#[derive(Debug, Clone)]
pub struct SessionManager {
    registry: Arc<Mutex<Registry>>,
}

impl SessionManager {
    /// Creates an empty store. A seed makes codes and every session's
    /// random draws reproducible.
    #[instrument]
    pub fn new(seed: Option<u64>) -> Self {
        info!("Creating session manager");
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            registry: Arc::new(Mutex::new(Registry {
                sessions: HashMap::new(),
                rng,
                seed,
                created: 0,
            })),
        }
    }

    /// Creates a session under a fresh code with its host seated.
    #[instrument(skip(self))]
    pub fn create(
        &self,
        host_name: &str,
        theme: Option<String>,
    ) -> Result<(SessionId, PlayerId, SessionSnapshot), ServiceError> {
        let mut registry = self.registry()?;
        let code = registry.fresh_code().ok_or_else(|| {
            warn!("Join code space exhausted");
            ServiceError::Game(mafai_game::GameError::InvalidInput(
                "no free session code".into(),
            ))
        })?;
        let rng = registry.session_rng();
        let (session, host) = Session::new(code.clone(), host_name, theme, rng)?;
        let snapshot = session.snapshot();

        let (events, _) = broadcast::channel(BROADCAST_CAPACITY);
        registry.sessions.insert(
            code.clone(),
            SessionEntry {
                session: Arc::new(Mutex::new(session)),
                events,
            },
        );
        info!(session_id = %code, host_id = %host, "Created new session");
        Ok((code, host, snapshot))
    }

    /// Runs a mutating operation under the session's lock and announces
    /// the new version if anything changed.
    #[instrument(skip(self, op))]
    pub fn with_session<T>(
        &self,
        id: &SessionId,
        op: impl FnOnce(&mut Session) -> GameResult<T>,
    ) -> Result<T, ServiceError> {
        let entry = self.entry(id)?;
        let mut session = entry
            .session
            .lock()
            .map_err(|_| ServiceError::LockPoisoned)?;

        let before = *session.version();
        let result = op(&mut *session);
        let after = *session.version();
        drop(session);

        if after != before {
            // No subscribers is fine.
            let _ = entry.events.send(SessionBroadcast::new(id.clone(), after));
            debug!(version = after, "Session change broadcast");
        }
        Ok(result?)
    }

    /// Runs a read-only closure under the session's lock.
    #[instrument(skip(self, view))]
    pub fn read<T>(
        &self,
        id: &SessionId,
        view: impl FnOnce(&Session) -> T,
    ) -> Result<T, ServiceError> {
        let entry = self.entry(id)?;
        let session = entry
            .session
            .lock()
            .map_err(|_| ServiceError::LockPoisoned)?;
        Ok(view(&*session))
    }

    /// Full-truth snapshot of a session.
    pub fn snapshot(&self, id: &SessionId) -> Result<SessionSnapshot, ServiceError> {
        self.read(id, Session::snapshot)
    }

    /// Subscribes to change notifications for one session.
    #[instrument(skip(self))]
    pub fn subscribe(
        &self,
        id: &SessionId,
    ) -> Result<broadcast::Receiver<SessionBroadcast>, ServiceError> {
        Ok(self.entry(id)?.events.subscribe())
    }

    /// Removes the session if its roster is empty. Returns true if evicted.
    #[instrument(skip(self))]
    pub fn evict_if_empty(&self, id: &SessionId) -> Result<bool, ServiceError> {
        let mut registry = self.registry()?;
        let Some(entry) = registry.sessions.get(id) else {
            return Ok(false);
        };
        let empty = entry
            .session
            .lock()
            .map_err(|_| ServiceError::LockPoisoned)?
            .is_empty();
        if empty {
            registry.sessions.remove(id);
            info!(session_id = %id, "Evicted empty session");
        }
        Ok(empty)
    }

    /// Lists all sessions, ordered by code.
    #[instrument(skip(self))]
    pub fn list(&self) -> Result<Vec<SessionListing>, ServiceError> {
        let entries: Vec<(SessionId, SessionEntry)> = self
            .registry()?
            .sessions
            .iter()
            .map(|(id, entry)| (id.clone(), entry.clone()))
            .collect();

        let mut listings = entries
            .into_iter()
            .map(|(session_id, entry)| {
                let session = entry
                    .session
                    .lock()
                    .map_err(|_| ServiceError::LockPoisoned)?;
                Ok(SessionListing {
                    session_id,
                    phase: *session.phase(),
                    players: session.roster().len(),
                    round: *session.round(),
                    theme: session.theme().clone(),
                })
            })
            .collect::<Result<Vec<_>, ServiceError>>()?;
        listings.sort_by(|a, b| a.session_id.cmp(&b.session_id));
        debug!(count = listings.len(), "Listed sessions");
        Ok(listings)
    }

    /// Number of live sessions.
    pub fn len(&self) -> Result<usize, ServiceError> {
        Ok(self.registry()?.sessions.len())
    }

    /// Returns true if no sessions are live.
    pub fn is_empty(&self) -> Result<bool, ServiceError> {
        Ok(self.len()? == 0)
    }

    fn registry(&self) -> Result<MutexGuard<'_, Registry>, ServiceError> {
        self.registry.lock().map_err(|_| ServiceError::LockPoisoned)
    }

    fn entry(&self, id: &SessionId) -> Result<SessionEntry, ServiceError> {
        self.registry()?
            .sessions
            .get(id)
            .cloned()
            .ok_or_else(|| {
                debug!(session_id = %id, "Session not found");
                ServiceError::SessionNotFound(id.clone())
            })
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(None)
    }
}
