//! WebSocket message dispatch
//!
//! Entry point for every parsed client event. The identity gate lives here; the handlers in
//! `admin` and `team` do the work. A rejected event produces exactly one `error` reply to the
//! caller and nothing else.

use std::sync::Arc;

use crate::auth::{self, CredentialStore};
use crate::error::{GameError, GameResult};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::{AppState, GameSession, SharedGame};
use crate::types::{ConnectionId, Identity};

use super::{admin, team};

/// Per-connection state owned by the socket task
pub struct ConnectionContext {
    pub id: ConnectionId,
    pub credentials: Box<dyn CredentialStore>,
}

impl ConnectionContext {
    pub fn new(id: ConnectionId, remember_admin_secret: bool) -> Self {
        Self {
            id,
            credentials: auth::credential_store(remember_admin_secret),
        }
    }
}

/// Handle one client event. Errors are already reported to the caller when this returns.
pub async fn handle_message(
    msg: ClientMessage,
    ctx: &ConnectionContext,
    state: &Arc<AppState>,
) -> GameResult<()> {
    let result = match msg {
        ClientMessage::JoinGame { game_id, team_name } => {
            team::handle_join_game(state, ctx, game_id, team_name).await
        }

        ClientMessage::SubmitAnswer { answer } => {
            team::handle_submit_answer(state, ctx, answer).await
        }

        ClientMessage::AdminLogin { game_id, password } => {
            admin::handle_admin_login(state, ctx, game_id, password).await
        }

        ClientMessage::StartGame { password } => {
            admin::handle_start_game(state, ctx, password).await
        }

        ClientMessage::StartQuestion { password } => {
            admin::handle_start_question(state, ctx, password).await
        }

        ClientMessage::CloseQuestion { password } => {
            admin::handle_close_question(state, ctx, password).await
        }

        ClientMessage::GradeAnswer {
            team_id,
            round_num,
            question_num,
            is_correct,
            points,
            password,
        } => {
            admin::handle_grade_answer(
                state,
                ctx,
                admin::Grading {
                    team_id,
                    round_num,
                    question_num,
                    is_correct,
                    points,
                },
                password,
            )
            .await
        }

        ClientMessage::NextQuestion { password } => {
            admin::handle_next_question(state, ctx, password).await
        }

        ClientMessage::PreviousQuestion { password } => {
            admin::handle_previous_question(state, ctx, password).await
        }

        ClientMessage::GetLeaderboard {} => handle_get_leaderboard(state, ctx).await,

        ClientMessage::GetGameState {} => handle_get_game_state(state, ctx).await,
    };

    if let Err(e) = &result {
        tracing::warn!(conn_id = %ctx.id, code = e.code(), "Request rejected: {}", e);
        state.connections.send(&ctx.id, ServerMessage::from(e)).await;
    }
    result
}

/// Transport closed: drop the connection and release whatever binding it held in its game
pub async fn handle_disconnect(state: &Arc<AppState>, ctx: &ConnectionContext) {
    ctx.credentials.forget();
    let Some(identity) = state.connections.unregister(&ctx.id).await else {
        return;
    };
    let Ok(game) = state.games.get(identity.game_id()).await else {
        return;
    };
    let mut session = game.lock().await;
    if session.detach(&ctx.id) {
        tracing::info!(
            conn_id = %ctx.id,
            game_id = %session.game_id,
            identity = ?identity,
            "Binding released on disconnect"
        );
    }
}

/// Game of the connection's current binding
pub(super) async fn bound_game(state: &AppState, ctx: &ConnectionContext) -> GameResult<SharedGame> {
    let identity = state
        .connections
        .identity(&ctx.id)
        .await
        .ok_or_else(|| GameError::validation("Not in a game"))?;
    state.games.get(identity.game_id()).await
}

/// Refuse to rebind a connection that already belongs to another identity.
/// An admin may log in again to the same game.
pub(super) async fn ensure_unbound(
    state: &AppState,
    ctx: &ConnectionContext,
    game_id: &str,
    as_admin: bool,
) -> GameResult<()> {
    match state.connections.identity(&ctx.id).await {
        None => Ok(()),
        Some(Identity::Admin { game_id: bound }) if as_admin && bound == game_id => Ok(()),
        Some(identity) => Err(GameError::validation(format!(
            "Connection is already bound to game {}",
            identity.game_id()
        ))),
    }
}

/// A privileged event that passed the identity gate
pub(super) struct AdminCall {
    pub game: SharedGame,
    password: Option<String>,
}

impl AdminCall {
    /// Check that the caller still holds the game's admin binding and resolve the secret to
    /// present. The engine verifies the secret itself.
    pub fn authorize(&self, session: &GameSession, ctx: &ConnectionContext) -> GameResult<String> {
        if session.admin_connection() != Some(ctx.id.as_str()) {
            return Err(GameError::Auth("Admin access required".to_string()));
        }
        self.password
            .clone()
            .or_else(|| ctx.credentials.recall(&session.game_id))
            .ok_or_else(|| GameError::Auth("Admin password required".to_string()))
    }
}

pub(super) async fn admin_call(
    state: &AppState,
    ctx: &ConnectionContext,
    password: Option<String>,
) -> GameResult<AdminCall> {
    let game_id = match state.connections.identity(&ctx.id).await {
        Some(Identity::Admin { game_id }) => game_id,
        Some(Identity::Team { .. }) => {
            return Err(GameError::Auth("Admin access required".to_string()))
        }
        None => return Err(GameError::validation("Not in a game")),
    };
    let game = state.games.get(&game_id).await?;
    Ok(AdminCall { game, password })
}

async fn handle_get_leaderboard(state: &Arc<AppState>, ctx: &ConnectionContext) -> GameResult<()> {
    let game = bound_game(state, ctx).await?;
    let session = game.lock().await;
    state
        .connections
        .send(&ctx.id, crate::broadcast::leaderboard(&session))
        .await;
    Ok(())
}

async fn handle_get_game_state(state: &Arc<AppState>, ctx: &ConnectionContext) -> GameResult<()> {
    let game = bound_game(state, ctx).await?;
    let session = game.lock().await;
    state
        .connections
        .send(
            &ctx.id,
            ServerMessage::Success {
                message: None,
                is_admin: None,
                game_id: Some(session.game_id.clone()),
                game_state: Some(session.summary()),
            },
        )
        .await;
    Ok(())
}
