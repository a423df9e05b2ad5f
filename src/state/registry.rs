//! Game registry: one canonical session per game id.
//!
//! Each session sits behind its own mutex, so calls against one game are serialized while
//! different games proceed independently.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use super::game::GameSession;
use crate::error::{GameError, GameResult};
use crate::questions::QuestionSource;
use crate::types::GameId;

pub type SharedGame = Arc<Mutex<GameSession>>;

pub struct GameRegistry {
    games: RwLock<HashMap<GameId, SharedGame>>,
    questions: Arc<dyn QuestionSource>,
}

impl GameRegistry {
    pub fn new(questions: Arc<dyn QuestionSource>) -> Self {
        Self {
            games: RwLock::new(HashMap::new()),
            questions,
        }
    }

    /// Instantiate a game from the questions its source holds
    pub async fn create_game(&self, game_id: &str, admin_secret: &str) -> GameResult<SharedGame> {
        let questions = self.questions.get_questions(game_id).await?;
        let session = GameSession::create(game_id, admin_secret, questions)?;

        let mut games = self.games.write().await;
        if games.contains_key(&session.game_id) {
            return Err(GameError::validation(format!(
                "Game {} already exists",
                session.game_id
            )));
        }
        tracing::info!(
            game_id = %session.game_id,
            questions = session.total_questions(),
            "game created"
        );
        let game_id = session.game_id.clone();
        let shared = Arc::new(Mutex::new(session));
        games.insert(game_id, shared.clone());
        Ok(shared)
    }

    pub async fn get(&self, game_id: &str) -> GameResult<SharedGame> {
        self.games
            .read()
            .await
            .get(game_id)
            .cloned()
            .ok_or_else(|| GameError::GameNotFound(game_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::questions::InMemoryQuestionSource;
    use crate::types::{GameStatus, Question};

    async fn registry_with(game_ids: &[&str]) -> GameRegistry {
        let source = InMemoryQuestionSource::new();
        for id in game_ids {
            source
                .load(
                    id,
                    vec![Question {
                        round_num: 1,
                        question_num: 1,
                        question: "Q?".into(),
                        answer: "A".into(),
                    }],
                )
                .await
                .unwrap();
        }
        GameRegistry::new(Arc::new(source))
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let registry = registry_with(&["g1"]).await;
        registry.create_game("g1", "pw").await.unwrap();

        let game = registry.get("g1").await.unwrap();
        assert_eq!(game.lock().await.status(), GameStatus::Waiting);
        assert!(Arc::ptr_eq(&game, &registry.get("g1").await.unwrap()));
    }

    #[tokio::test]
    async fn test_one_session_per_game_id() {
        let registry = registry_with(&["g1"]).await;
        registry.create_game("g1", "pw").await.unwrap();
        let result = registry.create_game("g1", "other").await;
        assert!(matches!(result, Err(GameError::Validation(_))));
    }

    #[tokio::test]
    async fn test_missing_questions_and_games() {
        let registry = registry_with(&[]).await;
        assert!(matches!(
            registry.create_game("g1", "pw").await,
            Err(GameError::Validation(_))
        ));
        assert!(matches!(
            registry.get("g1").await,
            Err(GameError::GameNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_games_are_independent() {
        let registry = registry_with(&["g1", "g2"]).await;
        registry.create_game("g1", "pw").await.unwrap();
        registry.create_game("g2", "pw").await.unwrap();

        let g1 = registry.get("g1").await.unwrap();
        let _held = g1.lock().await;
        // g2 stays usable while g1 is locked
        let g2 = registry.get("g2").await.unwrap();
        assert!(g2.lock().await.join_team("Alpha").is_ok());
    }
}
