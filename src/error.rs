//! Typed failures of the session engine.
//!
//! Every rejection leaves the game untouched. The event router turns these into
//! a single `error` event for the offending connection.

use crate::questions::QuestionSourceError;

/// Result type for session engine operations
pub type GameResult<T> = Result<T, GameError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("{0}")]
    Auth(String),

    #[error("Team name '{0}' already exists")]
    DuplicateName(String),

    #[error("Game {0} not found")]
    GameNotFound(String),

    #[error("Game has already started")]
    GameAlreadyStarted,

    #[error("Cannot start game with no teams")]
    NoTeams,

    #[error("No active question to answer")]
    QuestionNotActive,

    #[error("Team has already submitted an answer for this question")]
    DuplicateSubmission,

    #[error("{0}")]
    OutOfSequence(String),

    #[error("{0}")]
    Validation(String),
}

impl GameError {
    pub fn invalid_password() -> Self {
        GameError::Auth("Invalid admin password".to_string())
    }

    pub fn out_of_sequence(msg: impl Into<String>) -> Self {
        GameError::OutOfSequence(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        GameError::Validation(msg.into())
    }

    /// Stable machine-readable code carried next to the message on the wire
    pub fn code(&self) -> &'static str {
        match self {
            GameError::Auth(_) => "AUTH_ERROR",
            GameError::DuplicateName(_) => "DUPLICATE_NAME",
            GameError::GameNotFound(_) => "GAME_NOT_FOUND",
            GameError::GameAlreadyStarted => "GAME_ALREADY_STARTED",
            GameError::NoTeams => "NO_TEAMS",
            GameError::QuestionNotActive => "QUESTION_NOT_ACTIVE",
            GameError::DuplicateSubmission => "DUPLICATE_SUBMISSION",
            GameError::OutOfSequence(_) => "OUT_OF_SEQUENCE",
            GameError::Validation(_) => "VALIDATION_ERROR",
        }
    }
}

impl From<QuestionSourceError> for GameError {
    fn from(err: QuestionSourceError) -> Self {
        GameError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let errors = [
            GameError::invalid_password(),
            GameError::DuplicateName("a".into()),
            GameError::GameNotFound("g".into()),
            GameError::GameAlreadyStarted,
            GameError::NoTeams,
            GameError::QuestionNotActive,
            GameError::DuplicateSubmission,
            GameError::out_of_sequence("x"),
            GameError::validation("y"),
        ];
        let mut codes: Vec<_> = errors.iter().map(|e| e.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_messages_are_human_readable() {
        assert_eq!(
            GameError::DuplicateName("Alpha".into()).to_string(),
            "Team name 'Alpha' already exists"
        );
        assert_eq!(
            GameError::GameNotFound("g1".into()).to_string(),
            "Game g1 not found"
        );
        assert_eq!(
            GameError::invalid_password().to_string(),
            "Invalid admin password"
        );
    }
}
