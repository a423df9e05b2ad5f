use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque ID types for type safety
pub type GameId = String;
pub type TeamId = String;
pub type ConnectionId = String;

/// Sub-state of a started game with respect to its current question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionPhase {
    /// Pointer sits on a question that has not been opened yet
    Ready,
    Active,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    /// Questions not yet validated. `GameSession::create` either fails or returns a
    /// session already in `Waiting`, so a live session never reports this.
    Setup,
    Waiting,
    InProgress(QuestionPhase),
    Finished,
}

impl GameStatus {
    /// Wire name of the status, as shown in game summaries
    pub fn as_str(&self) -> &'static str {
        match self {
            GameStatus::Setup => "setup",
            GameStatus::Waiting => "waiting",
            GameStatus::InProgress(QuestionPhase::Ready) => "in_progress",
            GameStatus::InProgress(QuestionPhase::Active) => "question_active",
            GameStatus::InProgress(QuestionPhase::Closed) => "question_closed",
            GameStatus::Finished => "finished",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub round_num: u32,
    pub question_num: u32,
    pub question: String,
    pub answer: String,
}

impl Question {
    /// Non-authoritative hint: trimmed, case-insensitive equality with the canonical answer
    pub fn matches(&self, submitted: &str) -> bool {
        submitted.trim().to_lowercase() == self.answer.trim().to_lowercase()
    }
}

#[derive(Debug, Clone)]
pub struct Team {
    pub team_id: TeamId,
    pub name: String,
    pub score: i64,
    /// Live transport bound to this team; `None` while disconnected
    pub connection: Option<ConnectionId>,
}

impl Team {
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grade {
    Ungraded,
    Correct,
    Incorrect,
}

impl Grade {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Grade::Ungraded => None,
            Grade::Correct => Some(true),
            Grade::Incorrect => Some(false),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Answer {
    pub team_id: TeamId,
    pub round_num: u32,
    pub question_num: u32,
    pub text: String,
    pub submitted_at: DateTime<Utc>,
    pub auto_correct: bool,
    pub grade: Grade,
    pub points_awarded: u32,
}

impl Answer {
    pub fn is_for(&self, team_id: &str, round_num: u32, question_num: u32) -> bool {
        self.team_id == team_id && self.round_num == round_num && self.question_num == question_num
    }
}

/// Logical identity a transport connection is bound to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Admin { game_id: GameId },
    Team { game_id: GameId, team_id: TeamId },
}

impl Identity {
    pub fn game_id(&self) -> &str {
        match self {
            Identity::Admin { game_id } | Identity::Team { game_id, .. } => game_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_matches_ignores_case_and_padding() {
        let q = Question {
            round_num: 1,
            question_num: 1,
            question: "Capital of France?".into(),
            answer: "Paris".into(),
        };
        assert!(q.matches("paris "));
        assert!(q.matches("  PARIS"));
        assert!(!q.matches("Lyon"));
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(GameStatus::Waiting.as_str(), "waiting");
        assert_eq!(
            GameStatus::InProgress(QuestionPhase::Active).as_str(),
            "question_active"
        );
        assert_eq!(GameStatus::Finished.as_str(), "finished");
    }
}
