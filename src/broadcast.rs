//! Per-recipient shaping of game events.
//!
//! Only the connection currently bound as the game's admin receives admin copies. Everyone
//! else in the game, including a connection whose admin binding was taken over, gets the team
//! copy with admin-only fields left out.

use crate::protocol::{AnswerInfo, ServerMessage, TeamInfo};
use crate::state::{AppState, GameSession};
use crate::types::{Answer, Identity, Question};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Admin,
    Team,
}

pub fn audience_of(session: &GameSession, conn_id: &str, identity: &Identity) -> Audience {
    match identity {
        Identity::Admin { .. } if session.admin_connection() == Some(conn_id) => Audience::Admin,
        _ => Audience::Team,
    }
}

pub fn question_started(question: &Question, audience: Audience) -> ServerMessage {
    ServerMessage::QuestionStarted {
        round: question.round_num,
        question_num: question.question_num,
        question: question.question.clone(),
        answer: match audience {
            Audience::Admin => Some(question.answer.clone()),
            Audience::Team => None,
        },
    }
}

pub fn question_closed(
    session: &GameSession,
    question: &Question,
    answers: &[Answer],
    audience: Audience,
) -> ServerMessage {
    ServerMessage::QuestionClosed {
        round: question.round_num,
        question_num: question.question_num,
        answers: match audience {
            Audience::Admin => Some(answer_infos(session, answers)),
            Audience::Team => None,
        },
    }
}

pub fn answer_infos(session: &GameSession, answers: &[Answer]) -> Vec<AnswerInfo> {
    answers
        .iter()
        .map(|a| AnswerInfo {
            team_id: a.team_id.clone(),
            team_name: session
                .team(&a.team_id)
                .map(|t| t.name.clone())
                .unwrap_or_default(),
            answer: a.text.clone(),
            submitted_at: a.submitted_at,
            is_auto_correct: a.auto_correct,
            is_correct: a.grade.as_bool(),
            points_awarded: a.points_awarded,
        })
        .collect()
}

pub fn team_list(session: &GameSession) -> ServerMessage {
    ServerMessage::TeamListUpdate {
        teams: session.teams().iter().map(TeamInfo::from).collect(),
    }
}

pub fn leaderboard(session: &GameSession) -> ServerMessage {
    ServerMessage::LeaderboardUpdate {
        leaderboard: session.leaderboard(),
    }
}

/// Shape one event per recipient and queue it for every connection in the game
pub async fn to_game<F>(state: &AppState, session: &GameSession, shape: F) -> usize
where
    F: Fn(Audience) -> ServerMessage,
{
    state
        .connections
        .fan_out(&session.game_id, |conn_id, identity| {
            Some(shape(audience_of(session, conn_id, identity)))
        })
        .await
}

/// Same event for every connection in the game
pub async fn to_all(state: &AppState, session: &GameSession, msg: ServerMessage) -> usize {
    state.connections.broadcast(&session.game_id, msg).await
}

/// Queue an event for the game's bound admin, if one is connected
pub async fn to_admin(state: &AppState, session: &GameSession, msg: ServerMessage) -> bool {
    match session.admin_connection() {
        Some(conn_id) => state.connections.send(conn_id, msg).await,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn session() -> GameSession {
        let questions: Arc<[Question]> = vec![Question {
            round_num: 1,
            question_num: 1,
            question: "Capital of France?".into(),
            answer: "Paris".into(),
        }]
        .into();
        GameSession::create("g1", "secret", questions).unwrap()
    }

    fn admin() -> Identity {
        Identity::Admin {
            game_id: "g1".into(),
        }
    }

    #[test]
    fn test_only_bound_admin_gets_admin_copy() {
        let mut session = session();
        session.bind_admin("secret", "conn-a").unwrap();
        assert_eq!(audience_of(&session, "conn-a", &admin()), Audience::Admin);

        // A newer login takes over; the old connection now sees team copies
        session.bind_admin("secret", "conn-b").unwrap();
        assert_eq!(audience_of(&session, "conn-a", &admin()), Audience::Team);
        assert_eq!(audience_of(&session, "conn-b", &admin()), Audience::Admin);
    }

    #[test]
    fn test_team_identity_never_admin() {
        let mut session = session();
        session.bind_admin("secret", "conn-a").unwrap();
        let team = Identity::Team {
            game_id: "g1".into(),
            team_id: "t1".into(),
        };
        assert_eq!(audience_of(&session, "conn-a", &team), Audience::Team);
    }

    #[test]
    fn test_question_started_shapes() {
        let session = session();
        let question = session.current_question().unwrap().clone();
        match question_started(&question, Audience::Admin) {
            ServerMessage::QuestionStarted { answer, .. } => {
                assert_eq!(answer.as_deref(), Some("Paris"))
            }
            _ => panic!("Expected QuestionStarted message"),
        }
        match question_started(&question, Audience::Team) {
            ServerMessage::QuestionStarted { answer, .. } => assert_eq!(answer, None),
            _ => panic!("Expected QuestionStarted message"),
        }
    }
}
