//! Admin handlers
//!
//! Every handler except `admin_login` goes through the identity gate in `handlers`, then
//! hands the resolved secret to the engine. Fan-out is queued before the game lock is
//! released so all observers see one game's events in commit order.

use std::sync::Arc;

use crate::broadcast;
use crate::error::{GameError, GameResult};
use crate::protocol::ServerMessage;
use crate::state::game::Advance;
use crate::state::AppState;
use crate::types::{Identity, TeamId};

use super::handlers::{admin_call, ensure_unbound, ConnectionContext};

/// Fields of a `grade_answer` event
#[derive(Debug, Clone)]
pub struct Grading {
    pub team_id: TeamId,
    pub round_num: u32,
    pub question_num: u32,
    pub is_correct: bool,
    pub points: u32,
}

pub async fn handle_admin_login(
    state: &Arc<AppState>,
    ctx: &ConnectionContext,
    game_id: String,
    password: String,
) -> GameResult<()> {
    let game_id = game_id.trim();
    if game_id.is_empty() || password.is_empty() {
        return Err(GameError::validation("game_id and password are required"));
    }
    ensure_unbound(state, ctx, game_id, true).await?;

    let game = state.games.get(game_id).await?;
    let mut session = game.lock().await;
    let replaced = session.bind_admin(&password, &ctx.id)?;

    let identity = Identity::Admin {
        game_id: session.game_id.clone(),
    };
    if !state.connections.bind(&ctx.id, identity).await {
        session.detach(&ctx.id);
        return Ok(());
    }
    ctx.credentials.remember(&session.game_id, &password);

    match replaced {
        Some(previous) => tracing::info!(
            conn_id = %ctx.id,
            game_id = %session.game_id,
            previous_conn = %previous,
            "Admin binding moved to newer login"
        ),
        None => tracing::info!(conn_id = %ctx.id, game_id = %session.game_id, "Admin logged in"),
    }

    state
        .connections
        .send(
            &ctx.id,
            ServerMessage::Success {
                message: Some("Admin logged in successfully".to_string()),
                is_admin: Some(true),
                game_id: Some(session.game_id.clone()),
                game_state: None,
            },
        )
        .await;
    state
        .connections
        .send(&ctx.id, broadcast::team_list(&session))
        .await;
    Ok(())
}

pub async fn handle_start_game(
    state: &Arc<AppState>,
    ctx: &ConnectionContext,
    password: Option<String>,
) -> GameResult<()> {
    let call = admin_call(state, ctx, password).await?;
    let mut session = call.game.lock().await;
    let secret = call.authorize(&session, ctx)?;
    session.start_game(&secret)?;

    tracing::info!(
        game_id = %session.game_id,
        teams = session.teams().len(),
        "Game started"
    );
    let msg = ServerMessage::GameStarted {
        game_id: session.game_id.clone(),
    };
    broadcast::to_all(state, &session, msg).await;
    Ok(())
}

pub async fn handle_start_question(
    state: &Arc<AppState>,
    ctx: &ConnectionContext,
    password: Option<String>,
) -> GameResult<()> {
    let call = admin_call(state, ctx, password).await?;
    let mut session = call.game.lock().await;
    let secret = call.authorize(&session, ctx)?;
    let question = session.start_question(&secret)?;

    tracing::info!(
        game_id = %session.game_id,
        round = question.round_num,
        question = question.question_num,
        "Question started"
    );
    broadcast::to_game(state, &session, |audience| {
        broadcast::question_started(&question, audience)
    })
    .await;
    Ok(())
}

pub async fn handle_close_question(
    state: &Arc<AppState>,
    ctx: &ConnectionContext,
    password: Option<String>,
) -> GameResult<()> {
    let call = admin_call(state, ctx, password).await?;
    let mut session = call.game.lock().await;
    let secret = call.authorize(&session, ctx)?;
    let answers = session.close_question(&secret)?;
    let question = session
        .current_question()
        .cloned()
        .ok_or(GameError::QuestionNotActive)?;

    tracing::info!(
        game_id = %session.game_id,
        round = question.round_num,
        question = question.question_num,
        answers = answers.len(),
        "Question closed"
    );
    broadcast::to_game(state, &session, |audience| {
        broadcast::question_closed(&session, &question, &answers, audience)
    })
    .await;
    broadcast::to_all(state, &session, broadcast::leaderboard(&session)).await;
    Ok(())
}

pub async fn handle_grade_answer(
    state: &Arc<AppState>,
    ctx: &ConnectionContext,
    grading: Grading,
    password: Option<String>,
) -> GameResult<()> {
    let call = admin_call(state, ctx, password).await?;
    let mut session = call.game.lock().await;
    let secret = call.authorize(&session, ctx)?;
    let outcome = session.grade_answer(
        &secret,
        &grading.team_id,
        grading.round_num,
        grading.question_num,
        grading.is_correct,
        grading.points,
    )?;

    tracing::info!(
        game_id = %session.game_id,
        team_id = %grading.team_id,
        is_correct = grading.is_correct,
        points = outcome.answer.points_awarded,
        new_score = outcome.new_score,
        "Answer graded"
    );
    let msg = ServerMessage::AnswerGraded {
        team_id: outcome.answer.team_id.clone(),
        team_name: outcome.team_name.clone(),
        is_correct: grading.is_correct,
        points_awarded: outcome.answer.points_awarded,
        new_score: outcome.new_score,
    };
    broadcast::to_all(state, &session, msg).await;
    broadcast::to_all(state, &session, broadcast::leaderboard(&session)).await;
    Ok(())
}

pub async fn handle_next_question(
    state: &Arc<AppState>,
    ctx: &ConnectionContext,
    password: Option<String>,
) -> GameResult<()> {
    let call = admin_call(state, ctx, password).await?;
    let mut session = call.game.lock().await;
    let secret = call.authorize(&session, ctx)?;

    match session.advance_question(&secret)? {
        Advance::Question(question) => {
            tracing::info!(
                game_id = %session.game_id,
                round = question.round_num,
                question = question.question_num,
                "Advanced to next question"
            );
            broadcast::to_game(state, &session, |audience| {
                broadcast::question_started(&question, audience)
            })
            .await;
        }
        Advance::Finished => {
            tracing::info!(game_id = %session.game_id, "Game finished");
            let msg = ServerMessage::GameFinished {
                final_leaderboard: session.leaderboard(),
            };
            broadcast::to_all(state, &session, msg).await;
        }
    }
    Ok(())
}

pub async fn handle_previous_question(
    state: &Arc<AppState>,
    ctx: &ConnectionContext,
    password: Option<String>,
) -> GameResult<()> {
    let call = admin_call(state, ctx, password).await?;
    let session = call.game.lock().await;
    let secret = call.authorize(&session, ctx)?;
    session.previous_question(&secret)
}
