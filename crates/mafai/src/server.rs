//! MCP server: the transport adapter over [`GameService`].

use crate::error::ServiceError;
use crate::service::GameService;
use mafai_game::{ActionKind, NightAction, PlayerId, SessionId, SettingsPatch, VoteTarget};
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content, ServerCapabilities, ServerInfo};
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_handler, tool_router};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

/// Request for creating a game.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CreateGameRequest {
    /// Host's display name.
    pub host_name: String,
    /// Optional story theme.
    #[serde(default)]
    pub theme: Option<String>,
}

/// Request for joining a game.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JoinGameRequest {
    /// Session code.
    pub session_id: String,
    /// Display name.
    pub name: String,
}

/// Request naming a player in a session.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PlayerRequest {
    /// Session code.
    pub session_id: String,
    /// Player ID.
    pub player_id: String,
}

/// Request naming only a session.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SessionRequest {
    /// Session code.
    pub session_id: String,
}

/// Request for toggling readiness.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SetReadyRequest {
    /// Session code.
    pub session_id: String,
    /// Player ID.
    pub player_id: String,
    /// Ready flag.
    pub ready: bool,
}

/// Request for changing settings. Omitted fields are left unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UpdateSettingsRequest {
    /// Session code.
    pub session_id: String,
    /// Host's player ID.
    pub player_id: String,
    /// Number of mafia.
    #[serde(default)]
    pub mafia: Option<i64>,
    /// Number of doctors.
    #[serde(default)]
    pub doctor: Option<i64>,
    /// Number of detectives.
    #[serde(default)]
    pub detective: Option<i64>,
    /// Day length in seconds.
    #[serde(default)]
    pub day_duration: Option<i64>,
    /// Night length in seconds.
    #[serde(default)]
    pub night_duration: Option<i64>,
}

/// Night action kinds on the wire.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum NightActionKind {
    /// Mafia only.
    Kill,
    /// Doctor only.
    Save,
    /// Detective only.
    Investigate,
}

impl From<NightActionKind> for ActionKind {
    fn from(kind: NightActionKind) -> Self {
        match kind {
            NightActionKind::Kill => ActionKind::Kill,
            NightActionKind::Save => ActionKind::Save,
            NightActionKind::Investigate => ActionKind::Investigate,
        }
    }
}

/// Request for a night action.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NightActionRequest {
    /// Session code.
    pub session_id: String,
    /// Acting player's ID.
    pub player_id: String,
    /// Action matching the player's role.
    pub action: NightActionKind,
    /// Targeted player's ID.
    pub target: String,
    /// What you do tonight, in your own words. Only used for the story.
    #[serde(default)]
    pub activity: Option<String>,
}

/// Request for a day vote.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CastVoteRequest {
    /// Session code.
    pub session_id: String,
    /// Voting player's ID.
    pub player_id: String,
    /// Player ID to eliminate, or "skip".
    pub target: String,
}

/// Request for a session view.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GetStateRequest {
    /// Session code.
    pub session_id: String,
    /// Viewer's player ID; omit to spectate.
    #[serde(default)]
    pub player_id: Option<String>,
}

/// Main server handler.
pub struct MafaiServer {
    service: GameService,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl MafaiServer {
    /// Creates a server over a shared service.
    #[instrument(skip(service))]
    pub fn with_service(service: GameService) -> Self {
        debug!("Creating MCP server over shared game service");
        Self {
            service,
            tool_router: Self::tool_router(),
        }
    }

    /// Creates a new game.
    #[instrument(skip(self, req), fields(host_name = %req.host_name))]
    #[tool(description = "Create a new Mafia game. Returns the session code and your player ID; you are the host.")]
    pub async fn create_game(
        &self,
        Parameters(req): Parameters<CreateGameRequest>,
    ) -> Result<CallToolResult, McpError> {
        let (session_id, player_id, view) = self
            .service
            .create_game(&req.host_name, req.theme)
            .map_err(to_mcp)?;
        info!(session_id = %session_id, player_id = %player_id, "Game created");
        json_result(&serde_json::json!({
            "session_id": session_id,
            "player_id": player_id,
            "state": view,
        }))
    }

    /// Joins a game in its lobby.
    #[instrument(skip(self, req), fields(session_id = %req.session_id, name = %req.name))]
    #[tool(description = "Join a game lobby by session code. Returns your player ID.")]
    pub async fn join_game(
        &self,
        Parameters(req): Parameters<JoinGameRequest>,
    ) -> Result<CallToolResult, McpError> {
        let (player_id, view) = self
            .service
            .join_game(&session(&req.session_id), &req.name)
            .map_err(to_mcp)?;
        json_result(&serde_json::json!({ "player_id": player_id, "state": view }))
    }

    /// Leaves a lobby.
    #[instrument(skip(self, req), fields(session_id = %req.session_id, player_id = %req.player_id))]
    #[tool(description = "Leave a game lobby. Only possible before the game starts.")]
    pub async fn leave_game(
        &self,
        Parameters(req): Parameters<PlayerRequest>,
    ) -> Result<CallToolResult, McpError> {
        let removed = self
            .service
            .leave_game(&session(&req.session_id), &player(&req.player_id))
            .map_err(to_mcp)?;
        json_result(&serde_json::json!({ "removed": removed }))
    }

    /// Sets lobby readiness.
    #[instrument(skip(self, req), fields(session_id = %req.session_id, player_id = %req.player_id))]
    #[tool(description = "Mark yourself ready (or not) in the lobby.")]
    pub async fn set_ready(
        &self,
        Parameters(req): Parameters<SetReadyRequest>,
    ) -> Result<CallToolResult, McpError> {
        let view = self
            .service
            .set_ready(&session(&req.session_id), &player(&req.player_id), req.ready)
            .map_err(to_mcp)?;
        json_result(&view)
    }

    /// Changes lobby settings.
    #[instrument(skip(self, req), fields(session_id = %req.session_id, player_id = %req.player_id))]
    #[tool(description = "Host only, lobby only: change role counts or phase durations.")]
    pub async fn update_settings(
        &self,
        Parameters(req): Parameters<UpdateSettingsRequest>,
    ) -> Result<CallToolResult, McpError> {
        let patch = SettingsPatch {
            mafia: req.mafia,
            doctor: req.doctor,
            detective: req.detective,
            day_duration: req.day_duration,
            night_duration: req.night_duration,
        };
        let settings = self
            .service
            .update_settings(&session(&req.session_id), &player(&req.player_id), &patch)
            .map_err(to_mcp)?;
        json_result(&settings)
    }

    /// Starts the game.
    #[instrument(skip(self, req), fields(session_id = %req.session_id, player_id = %req.player_id))]
    #[tool(description = "Host only: deal roles and begin the first night. Needs at least 4 players.")]
    pub async fn start_game(
        &self,
        Parameters(req): Parameters<PlayerRequest>,
    ) -> Result<CallToolResult, McpError> {
        let view = self
            .service
            .start_game(&session(&req.session_id), &player(&req.player_id))
            .await
            .map_err(to_mcp)?;
        json_result(&view)
    }

    /// Submits a night action.
    #[instrument(skip(self, req), fields(session_id = %req.session_id, player_id = %req.player_id, action = ?req.action))]
    #[tool(description = "Submit your night action: kill (mafia), save (doctor) or investigate (detective). Resubmitting replaces your earlier choice.")]
    pub async fn night_action(
        &self,
        Parameters(req): Parameters<NightActionRequest>,
    ) -> Result<CallToolResult, McpError> {
        let mut action = NightAction::new(req.action.into(), player(&req.target));
        if let Some(activity) = req.activity {
            action = action.with_activity(activity);
        }
        let report = self
            .service
            .night_action(&session(&req.session_id), &player(&req.player_id), action)
            .await
            .map_err(to_mcp)?;
        json_result(&report)
    }

    /// Acknowledges the day's narration.
    #[instrument(skip(self, req), fields(session_id = %req.session_id, player_id = %req.player_id))]
    #[tool(description = "Confirm you have read the day's story. Discussion opens once every living player has.")]
    pub async fn acknowledge_day(
        &self,
        Parameters(req): Parameters<PlayerRequest>,
    ) -> Result<CallToolResult, McpError> {
        let view = self
            .service
            .acknowledge_day(&session(&req.session_id), &player(&req.player_id))
            .map_err(to_mcp)?;
        json_result(&view)
    }

    /// Opens discussion on timeout.
    #[instrument(skip(self, req), fields(session_id = %req.session_id))]
    #[tool(description = "Open discussion without waiting for everyone to acknowledge the day.")]
    pub async fn begin_discussion(
        &self,
        Parameters(req): Parameters<SessionRequest>,
    ) -> Result<CallToolResult, McpError> {
        let view = self
            .service
            .begin_discussion(&session(&req.session_id))
            .map_err(to_mcp)?;
        json_result(&view)
    }

    /// Casts a vote.
    #[instrument(skip(self, req), fields(session_id = %req.session_id, player_id = %req.player_id))]
    #[tool(description = "Vote to eliminate a living player by ID, or vote \"skip\". Resubmitting replaces your earlier vote.")]
    pub async fn cast_vote(
        &self,
        Parameters(req): Parameters<CastVoteRequest>,
    ) -> Result<CallToolResult, McpError> {
        let report = self
            .service
            .cast_vote(
                &session(&req.session_id),
                &player(&req.player_id),
                VoteTarget::from(req.target),
            )
            .await
            .map_err(to_mcp)?;
        json_result(&report)
    }

    /// Resolves the night on timeout.
    #[instrument(skip(self, req), fields(session_id = %req.session_id))]
    #[tool(description = "Resolve the night now with whatever actions have been submitted.")]
    pub async fn force_resolve_night(
        &self,
        Parameters(req): Parameters<SessionRequest>,
    ) -> Result<CallToolResult, McpError> {
        let report = self
            .service
            .force_resolve_night(&session(&req.session_id))
            .await
            .map_err(to_mcp)?;
        json_result(&report)
    }

    /// Resolves the vote on timeout.
    #[instrument(skip(self, req), fields(session_id = %req.session_id))]
    #[tool(description = "Resolve the vote now with whatever ballots have been cast.")]
    pub async fn force_resolve_votes(
        &self,
        Parameters(req): Parameters<SessionRequest>,
    ) -> Result<CallToolResult, McpError> {
        let report = self
            .service
            .force_resolve_votes(&session(&req.session_id))
            .await
            .map_err(to_mcp)?;
        json_result(&report)
    }

    /// Reports a dropped player.
    #[instrument(skip(self, req), fields(session_id = %req.session_id, player_id = %req.player_id))]
    #[tool(description = "Report that a player has disconnected. The server's disconnect policy decides what happens.")]
    pub async fn disconnect(
        &self,
        Parameters(req): Parameters<PlayerRequest>,
    ) -> Result<CallToolResult, McpError> {
        let report = self
            .service
            .disconnect(&session(&req.session_id), &player(&req.player_id))
            .await
            .map_err(to_mcp)?;
        json_result(&report)
    }

    /// Returns the caller's view of a session.
    #[instrument(skip(self, req), fields(session_id = %req.session_id))]
    #[tool(description = "Get the game state as you are allowed to see it. You see your own role, and fellow mafia if you are mafia.")]
    pub async fn get_state(
        &self,
        Parameters(req): Parameters<GetStateRequest>,
    ) -> Result<CallToolResult, McpError> {
        let viewer = req.player_id.as_deref().map(player);
        let view = self
            .service
            .get_state(&session(&req.session_id), viewer.as_ref())
            .map_err(to_mcp)?;
        json_result(&view)
    }

    /// Lists all games.
    #[instrument(skip(self))]
    #[tool(description = "List all games with their phase and player count.")]
    pub async fn list_games(&self) -> Result<CallToolResult, McpError> {
        let games = self.service.list_games().map_err(to_mcp)?;
        info!(count = games.len(), "Listed games");
        json_result(&games)
    }
}

#[tool_handler(router = self.tool_router)]
impl ServerHandler for MafaiServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Mafia party game server. Create or join a game, then follow the phases: \
                 night actions, day acknowledgement, discussion votes."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

fn session(code: &str) -> SessionId {
    SessionId::from(code.trim().to_ascii_uppercase().as_str())
}

fn player(id: &str) -> PlayerId {
    PlayerId::from(id.trim())
}

fn to_mcp(err: ServiceError) -> McpError {
    if err.is_recoverable() {
        warn!(error = %err, kind = ?err.kind(), "Request rejected");
        McpError::invalid_params(err.to_string(), None)
    } else {
        error!(error = %err, "Request failed");
        McpError::internal_error(err.to_string(), None)
    }
}

fn json_result(value: &impl Serialize) -> Result<CallToolResult, McpError> {
    let text = serde_json::to_string_pretty(value).map_err(|e| {
        error!(error = %e, "Failed to encode response");
        McpError::internal_error(format!("Failed to encode response: {}", e), None)
    })?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}
