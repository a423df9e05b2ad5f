//! Wire protocol
//!
//! Both directions use the envelope `{"event": "<name>", "data": {...}}`.
//! Fields marked admin-only are `None` in every team-scoped copy and are then omitted from JSON.

use crate::error::GameError;
use crate::types::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

fn default_points() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    JoinGame {
        game_id: GameId,
        team_name: String,
    },
    AdminLogin {
        game_id: GameId,
        password: String,
    },
    // Admin-only messages. `password` may be omitted when the connection's
    // credential store remembers the login secret.
    StartGame {
        #[serde(default)]
        password: Option<String>,
    },
    StartQuestion {
        #[serde(default)]
        password: Option<String>,
    },
    CloseQuestion {
        #[serde(default)]
        password: Option<String>,
    },
    GradeAnswer {
        team_id: TeamId,
        round_num: u32,
        question_num: u32,
        is_correct: bool,
        #[serde(default = "default_points")]
        points: u32,
        #[serde(default)]
        password: Option<String>,
    },
    NextQuestion {
        #[serde(default)]
        password: Option<String>,
    },
    /// Backward navigation is not supported; always rejected
    PreviousQuestion {
        #[serde(default)]
        password: Option<String>,
    },
    // Team messages
    SubmitAnswer {
        answer: String,
    },
    // Any bound connection
    GetLeaderboard {},
    GetGameState {},
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    TeamJoined {
        team_id: TeamId,
        team_name: String,
        game_id: GameId,
    },
    TeamListUpdate {
        teams: Vec<TeamInfo>,
    },
    GameStarted {
        game_id: GameId,
    },
    QuestionStarted {
        round: u32,
        question_num: u32,
        question: String,
        /// Admin-only
        #[serde(default, skip_serializing_if = "Option::is_none")]
        answer: Option<String>,
    },
    AnswerSubmitted {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        team_id: Option<TeamId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        team_name: Option<String>,
        answer: String,
        submitted_at: DateTime<Utc>,
        /// Admin-only
        #[serde(default, skip_serializing_if = "Option::is_none")]
        is_auto_correct: Option<bool>,
        /// Admin-only
        #[serde(default, skip_serializing_if = "Option::is_none")]
        correct_answer: Option<String>,
    },
    QuestionClosed {
        round: u32,
        question_num: u32,
        /// Admin-only
        #[serde(default, skip_serializing_if = "Option::is_none")]
        answers: Option<Vec<AnswerInfo>>,
    },
    AnswerGraded {
        team_id: TeamId,
        team_name: String,
        is_correct: bool,
        points_awarded: u32,
        new_score: i64,
    },
    LeaderboardUpdate {
        leaderboard: Vec<LeaderboardEntry>,
    },
    GameFinished {
        final_leaderboard: Vec<LeaderboardEntry>,
    },
    Error {
        message: String,
        code: String,
    },
    Success {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        is_admin: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        game_id: Option<GameId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        game_state: Option<GameSummary>,
    },
}

impl ServerMessage {
    /// Wire event name, for logs
    pub fn event(&self) -> &'static str {
        match self {
            ServerMessage::TeamJoined { .. } => "team_joined",
            ServerMessage::TeamListUpdate { .. } => "team_list_update",
            ServerMessage::GameStarted { .. } => "game_started",
            ServerMessage::QuestionStarted { .. } => "question_started",
            ServerMessage::AnswerSubmitted { .. } => "answer_submitted",
            ServerMessage::QuestionClosed { .. } => "question_closed",
            ServerMessage::AnswerGraded { .. } => "answer_graded",
            ServerMessage::LeaderboardUpdate { .. } => "leaderboard_update",
            ServerMessage::GameFinished { .. } => "game_finished",
            ServerMessage::Error { .. } => "error",
            ServerMessage::Success { .. } => "success",
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        ServerMessage::Success {
            message: Some(message.into()),
            is_admin: None,
            game_id: None,
            game_state: None,
        }
    }
}

impl From<&GameError> for ServerMessage {
    fn from(err: &GameError) -> Self {
        ServerMessage::Error {
            message: err.to_string(),
            code: err.code().to_string(),
        }
    }
}

/// Roster entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamInfo {
    pub team_id: TeamId,
    pub name: String,
    pub score: i64,
}

impl From<&Team> for TeamInfo {
    fn from(t: &Team) -> Self {
        Self {
            team_id: t.team_id.clone(),
            name: t.name.clone(),
            score: t.score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub name: String,
    pub score: i64,
}

/// Admin-only view of a submitted answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerInfo {
    pub team_id: TeamId,
    pub team_name: String,
    pub answer: String,
    pub submitted_at: DateTime<Utc>,
    pub is_auto_correct: bool,
    pub is_correct: Option<bool>,
    pub points_awarded: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSummary {
    pub game_id: GameId,
    pub status: String,
    pub team_count: usize,
    pub current_round: u32,
    pub current_question: u32,
    pub total_questions: usize,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_client_envelope() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"event": "join_game", "data": {"game_id": "g1", "team_name": "Alpha"}}"#,
        )
        .unwrap();
        match msg {
            ClientMessage::JoinGame { game_id, team_name } => {
                assert_eq!(game_id, "g1");
                assert_eq!(team_name, "Alpha");
            }
            other => panic!("Expected JoinGame, got {:?}", other),
        }
    }

    #[test]
    fn test_grade_answer_defaults() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"event": "grade_answer", "data": {"team_id": "t1", "round_num": 1,
                "question_num": 2, "is_correct": true}}"#,
        )
        .unwrap();
        match msg {
            ClientMessage::GradeAnswer {
                points, password, ..
            } => {
                assert_eq!(points, 1);
                assert_eq!(password, None);
            }
            other => panic!("Expected GradeAnswer, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_payload_events() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"event": "get_leaderboard", "data": {}}"#).unwrap();
        assert!(matches!(msg, ClientMessage::GetLeaderboard {}));

        let msg: ClientMessage =
            serde_json::from_str(r#"{"event": "start_game", "data": {}}"#).unwrap();
        assert!(matches!(msg, ClientMessage::StartGame { password: None }));
    }

    #[test]
    fn test_unknown_event_is_a_parse_error() {
        let result = serde_json::from_str::<ClientMessage>(r#"{"event": "teleport", "data": {}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_team_copy_omits_admin_fields() {
        let msg = ServerMessage::QuestionStarted {
            round: 1,
            question_num: 1,
            question: "Capital of France?".into(),
            answer: None,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["event"], "question_started");
        assert!(json["data"].get("answer").is_none());
        assert_eq!(json["data"]["question"], "Capital of France?");
    }

    #[test]
    fn test_error_from_game_error() {
        let msg = ServerMessage::from(&GameError::NoTeams);
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["event"], "error");
        assert_eq!(json["data"]["message"], "Cannot start game with no teams");
        assert_eq!(json["data"]["code"], "NO_TEAMS");
    }
}
