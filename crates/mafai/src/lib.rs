//! Mafai - Mafia party game server
//!
//! Wraps the `mafai_game` session state machine in a session store,
//! an LLM narration collaborator and an MCP tool server.
//!
//! # Architecture
//!
//! - **SessionManager**: every live game behind its own lock, with change broadcasts
//! - **GameService**: runs operations, narrates resolutions, evicts empty games
//! - **Redaction**: per-viewer views, so roles never leak to the wrong player
//! - **MafaiServer**: MCP tools over stdio or streamable HTTP

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cli;
mod config;
mod error;
mod llm_client;
mod narrator;
mod redaction;
mod server;
mod service;
mod session;

pub use config::{ConfigError, NarratorConfig, ServerConfig};
pub use error::ServiceError;
pub use llm_client::{LlmClient, LlmConfig, LlmError, LlmProvider};
pub use narrator::{FallbackNarrator, LlmNarrator, Narrator};
pub use redaction::{RedactedView, VisiblePlayer, redact_for};
pub use server::{
    CastVoteRequest, CreateGameRequest, GetStateRequest, JoinGameRequest, MafaiServer,
    NightActionKind, NightActionRequest, PlayerRequest, SessionRequest, SetReadyRequest,
    UpdateSettingsRequest,
};
pub use service::{DisconnectReport, GameService, ResolutionReport, StepReport};
pub use session::{SessionBroadcast, SessionListing, SessionManager};
