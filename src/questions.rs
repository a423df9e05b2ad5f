//! Question source and the JSON seed file used to create games at boot

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::types::{GameId, Question};

#[derive(Debug, thiserror::Error)]
pub enum QuestionSourceError {
    #[error("No questions loaded for game: {0}")]
    NotLoaded(String),

    #[error("Invalid question at position {index}: {reason}")]
    InvalidQuestion { index: usize, reason: String },

    #[error("Game {0} has no questions")]
    Empty(String),

    #[error("Failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse seed file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Supplier of the immutable, ordered question list of a game
#[async_trait]
pub trait QuestionSource: Send + Sync {
    async fn get_questions(&self, game_id: &str) -> Result<Arc<[Question]>, QuestionSourceError>;
}

/// Question lists held in process memory
#[derive(Default)]
pub struct InMemoryQuestionSource {
    games: RwLock<HashMap<GameId, Arc<[Question]>>>,
}

impl InMemoryQuestionSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and store the questions for a game, replacing any earlier list
    pub async fn load(
        &self,
        game_id: &str,
        questions: Vec<Question>,
    ) -> Result<(), QuestionSourceError> {
        validate_questions(game_id, &questions)?;
        self.games
            .write()
            .await
            .insert(game_id.to_string(), questions.into());
        Ok(())
    }
}

#[async_trait]
impl QuestionSource for InMemoryQuestionSource {
    async fn get_questions(&self, game_id: &str) -> Result<Arc<[Question]>, QuestionSourceError> {
        self.games
            .read()
            .await
            .get(game_id)
            .cloned()
            .ok_or_else(|| QuestionSourceError::NotLoaded(game_id.to_string()))
    }
}

/// Check a question list before a game is built on it
pub fn validate_questions(game_id: &str, questions: &[Question]) -> Result<(), QuestionSourceError> {
    if questions.is_empty() {
        return Err(QuestionSourceError::Empty(game_id.to_string()));
    }

    let mut seen = HashSet::new();
    for (index, q) in questions.iter().enumerate() {
        let reason = if q.question.trim().is_empty() {
            Some("Question cannot be empty")
        } else if q.answer.trim().is_empty() {
            Some("Answer cannot be empty")
        } else if q.round_num == 0 {
            Some("Round number must be positive")
        } else if q.question_num == 0 {
            Some("Question number must be positive")
        } else if !seen.insert((q.round_num, q.question_num)) {
            // answers are keyed by this pair
            Some("Duplicate round/question number")
        } else {
            None
        };

        if let Some(reason) = reason {
            return Err(QuestionSourceError::InvalidQuestion {
                index,
                reason: reason.to_string(),
            });
        }
    }

    Ok(())
}

/// One game entry of the seed file
#[derive(Debug, Clone, Deserialize)]
pub struct SeedGame {
    pub game_id: GameId,
    pub admin_password: String,
    pub questions: Vec<Question>,
}

/// Games to create when the server boots
#[derive(Debug, Clone, Deserialize)]
pub struct SeedFile {
    pub games: Vec<SeedGame>,
}

impl SeedFile {
    pub async fn load(path: &Path) -> Result<Self, QuestionSourceError> {
        let contents = tokio::fs::read_to_string(path).await?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, QuestionSourceError> {
        Ok(serde_json::from_str(contents)?)
    }
}
