//! Team handlers: joining a game and submitting answers

use std::sync::Arc;

use crate::broadcast::{self, Audience};
use crate::error::{GameError, GameResult};
use crate::protocol::ServerMessage;
use crate::state::AppState;
use crate::types::{GameStatus, Identity, QuestionPhase};

use super::handlers::{ensure_unbound, ConnectionContext};

pub async fn handle_join_game(
    state: &Arc<AppState>,
    ctx: &ConnectionContext,
    game_id: String,
    team_name: String,
) -> GameResult<()> {
    let game_id = game_id.trim();
    if game_id.is_empty() || team_name.trim().is_empty() {
        return Err(GameError::validation("game_id and team_name are required"));
    }
    ensure_unbound(state, ctx, game_id, false).await?;

    let game = state.games.get(game_id).await?;
    let mut session = game.lock().await;

    // The old transport may be gone before its disconnect has been processed
    if let Some(old) = session.connection_of(&team_name).map(str::to_string) {
        if !state.connections.is_live(&old).await {
            session.detach(&old);
            tracing::info!(
                game_id = %session.game_id,
                stale_conn = %old,
                "Released binding of closed connection"
            );
        }
    }
    let outcome = session.join_or_reattach(&team_name, &ctx.id)?;

    let identity = Identity::Team {
        game_id: session.game_id.clone(),
        team_id: outcome.team_id.clone(),
    };
    if !state.connections.bind(&ctx.id, identity).await {
        // Transport went away mid-request
        session.detach(&ctx.id);
        return Ok(());
    }

    if outcome.reattached {
        tracing::info!(
            conn_id = %ctx.id,
            game_id = %session.game_id,
            team_id = %outcome.team_id,
            "Team '{}' reattached",
            outcome.team_name
        );
    } else {
        tracing::info!(
            conn_id = %ctx.id,
            game_id = %session.game_id,
            team_id = %outcome.team_id,
            "Team '{}' joined",
            outcome.team_name
        );
    }

    state
        .connections
        .send(
            &ctx.id,
            ServerMessage::TeamJoined {
                team_id: outcome.team_id.clone(),
                team_name: outcome.team_name.clone(),
                game_id: session.game_id.clone(),
            },
        )
        .await;
    broadcast::to_all(state, &session, broadcast::team_list(&session)).await;

    // A team coming back mid-question needs the open question again
    if outcome.reattached && session.status() == GameStatus::InProgress(QuestionPhase::Active) {
        if let Some(question) = session.current_question() {
            state
                .connections
                .send(&ctx.id, broadcast::question_started(question, Audience::Team))
                .await;
        }
    }
    Ok(())
}

pub async fn handle_submit_answer(
    state: &Arc<AppState>,
    ctx: &ConnectionContext,
    answer: String,
) -> GameResult<()> {
    let (game_id, team_id) = match state.connections.identity(&ctx.id).await {
        Some(Identity::Team { game_id, team_id }) => (game_id, team_id),
        Some(Identity::Admin { .. }) => {
            return Err(GameError::validation(
                "Must be part of a team to submit answers",
            ))
        }
        None => return Err(GameError::validation("Not in a game")),
    };

    let game = state.games.get(&game_id).await?;
    let mut session = game.lock().await;
    let team_name = match session.team(&team_id) {
        Some(team) if team.connection.as_deref() == Some(ctx.id.as_str()) => team.name.clone(),
        _ => {
            return Err(GameError::validation(
                "This connection no longer represents the team",
            ))
        }
    };

    let recorded = session.submit_answer(&team_id, &answer)?;
    tracing::info!(
        game_id = %session.game_id,
        team_id = %team_id,
        round = recorded.round_num,
        question = recorded.question_num,
        auto_correct = recorded.auto_correct,
        "Answer submitted"
    );

    state
        .connections
        .send(
            &ctx.id,
            ServerMessage::AnswerSubmitted {
                team_id: None,
                team_name: None,
                answer: recorded.text.clone(),
                submitted_at: recorded.submitted_at,
                is_auto_correct: None,
                correct_answer: None,
            },
        )
        .await;

    let correct_answer = session.current_question().map(|q| q.answer.clone());
    broadcast::to_admin(
        state,
        &session,
        ServerMessage::AnswerSubmitted {
            team_id: Some(team_id),
            team_name: Some(team_name),
            answer: recorded.text,
            submitted_at: recorded.submitted_at,
            is_auto_correct: Some(recorded.auto_correct),
            correct_answer,
        },
    )
    .await;
    Ok(())
}
