//! Session engine: the only code that mutates a game.
//!
//! Every operation validates fully before touching any field, so a rejected call leaves the
//! session exactly as it was. Privileged operations take the presented secret and verify it
//! on each call.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::auth::AdminSecret;
use crate::error::{GameError, GameResult};
use crate::protocol::{GameSummary, LeaderboardEntry};
use crate::questions::validate_questions;
use crate::state::leaderboard;
use crate::types::*;

/// Result of a `join_game` request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    pub team_id: TeamId,
    pub team_name: String,
    /// True when an existing, disconnected team was rebound instead of created
    pub reattached: bool,
}

/// Result of grading one answer
#[derive(Debug, Clone)]
pub struct GradeOutcome {
    pub answer: Answer,
    pub team_name: String,
    pub new_score: i64,
}

/// Where the question pointer went on `advance_question`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    Question(Question),
    Finished,
}

#[derive(Debug)]
pub struct GameSession {
    pub game_id: GameId,
    secret: AdminSecret,
    status: GameStatus,
    questions: Arc<[Question]>,
    question_index: usize,
    /// Join order is preserved; the leaderboard relies on it for ties
    teams: Vec<Team>,
    answers: Vec<Answer>,
    admin_connection: Option<ConnectionId>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
}

impl GameSession {
    /// Validate the inputs and build a session that is open for joining
    pub fn create(
        game_id: &str,
        admin_secret: &str,
        questions: Arc<[Question]>,
    ) -> GameResult<Self> {
        let game_id = game_id.trim();
        if game_id.is_empty() {
            return Err(GameError::validation("Game ID cannot be empty"));
        }
        if admin_secret.trim().is_empty() {
            return Err(GameError::validation("Admin password cannot be empty"));
        }
        validate_questions(game_id, &questions)?;

        Ok(Self {
            game_id: game_id.to_string(),
            secret: AdminSecret::new(admin_secret),
            status: GameStatus::Waiting,
            questions,
            question_index: 0,
            teams: Vec::new(),
            answers: Vec::new(),
            admin_connection: None,
            created_at: Utc::now(),
            started_at: None,
        })
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn team(&self, team_id: &str) -> Option<&Team> {
        self.teams.iter().find(|t| t.team_id == team_id)
    }

    fn team_by_name(&self, name: &str) -> Option<&Team> {
        let wanted = name.to_lowercase();
        self.teams.iter().find(|t| t.name.to_lowercase() == wanted)
    }

    pub fn admin_connection(&self) -> Option<&str> {
        self.admin_connection.as_deref()
    }

    /// Question the pointer currently sits on
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.question_index)
    }

    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    /// Answers submitted for the question the pointer sits on, in submission order
    pub fn current_answers(&self) -> Vec<&Answer> {
        match self.current_question() {
            Some(q) => self
                .answers
                .iter()
                .filter(|a| a.round_num == q.round_num && a.question_num == q.question_num)
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn answer_for(&self, team_id: &str, round_num: u32, question_num: u32) -> Option<&Answer> {
        self.answers
            .iter()
            .find(|a| a.is_for(team_id, round_num, question_num))
    }

    /// Verify a presented admin secret
    pub fn authenticate(&self, presented: &str) -> GameResult<()> {
        if self.secret.verify(presented) {
            Ok(())
        } else {
            Err(GameError::invalid_password())
        }
    }

    /// Add a new team to the roster
    pub fn join_team(&mut self, name: &str) -> GameResult<TeamId> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GameError::validation("Team name cannot be empty"));
        }
        if self.status != GameStatus::Waiting {
            return Err(GameError::GameAlreadyStarted);
        }
        if self.team_by_name(name).is_some() {
            return Err(GameError::DuplicateName(name.to_string()));
        }

        let team = Team {
            team_id: ulid::Ulid::new().to_string(),
            name: name.to_string(),
            score: 0,
            connection: None,
        };
        let team_id = team.team_id.clone();
        self.teams.push(team);
        Ok(team_id)
    }

    /// Connection bound to the team with this name, if any
    pub fn connection_of(&self, name: &str) -> Option<&str> {
        self.team_by_name(name.trim())?.connection.as_deref()
    }

    /// Join as a new team, or rebind a disconnected team that re-asserts its name
    pub fn join_or_reattach(&mut self, name: &str, connection: &str) -> GameResult<JoinOutcome> {
        let trimmed = name.trim();

        if let Some(existing) = self.team_by_name(trimmed) {
            if existing.is_connected() {
                return Err(GameError::DuplicateName(trimmed.to_string()));
            }
            let team_id = existing.team_id.clone();
            let team_name = existing.name.clone();
            self.bind_team(&team_id, connection);
            return Ok(JoinOutcome {
                team_id,
                team_name,
                reattached: true,
            });
        }

        let team_id = self.join_team(trimmed)?;
        self.bind_team(&team_id, connection);
        Ok(JoinOutcome {
            team_id,
            team_name: trimmed.to_string(),
            reattached: false,
        })
    }

    fn bind_team(&mut self, team_id: &str, connection: &str) {
        if let Some(team) = self.teams.iter_mut().find(|t| t.team_id == team_id) {
            team.connection = Some(connection.to_string());
        }
    }

    /// Make `connection` the game's admin binding, returning the connection it replaced
    pub fn bind_admin(&mut self, presented: &str, connection: &str) -> GameResult<Option<ConnectionId>> {
        self.authenticate(presented)?;
        let previous = self.admin_connection.replace(connection.to_string());
        Ok(previous.filter(|p| p != connection))
    }

    /// Drop whatever binding points at `connection`. Teams and scores are kept.
    pub fn detach(&mut self, connection: &str) -> bool {
        let mut detached = false;
        if self.admin_connection.as_deref() == Some(connection) {
            self.admin_connection = None;
            detached = true;
        }
        for team in self.teams.iter_mut() {
            if team.connection.as_deref() == Some(connection) {
                team.connection = None;
                detached = true;
            }
        }
        detached
    }

    /// Waiting -> InProgress(Ready) on the first question
    pub fn start_game(&mut self, presented: &str) -> GameResult<()> {
        self.authenticate(presented)?;
        if self.status != GameStatus::Waiting {
            return Err(GameError::GameAlreadyStarted);
        }
        if self.teams.is_empty() {
            return Err(GameError::NoTeams);
        }

        self.status = GameStatus::InProgress(QuestionPhase::Ready);
        self.question_index = 0;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// Open the question under the pointer (Ready) or the next one (Closed)
    pub fn start_question(&mut self, presented: &str) -> GameResult<Question> {
        self.authenticate(presented)?;
        let next_index = match self.status {
            GameStatus::InProgress(QuestionPhase::Ready) => self.question_index,
            GameStatus::InProgress(QuestionPhase::Closed) => {
                let next = self.question_index + 1;
                if next >= self.questions.len() {
                    return Err(GameError::out_of_sequence(
                        "No questions remain; use next_question to finish the game",
                    ));
                }
                next
            }
            GameStatus::InProgress(QuestionPhase::Active) => {
                return Err(GameError::out_of_sequence("A question is already active"));
            }
            GameStatus::Setup | GameStatus::Waiting => {
                return Err(GameError::out_of_sequence("Game has not started"));
            }
            GameStatus::Finished => {
                return Err(GameError::out_of_sequence("Game is finished"));
            }
        };

        self.open_question(next_index)
    }

    fn open_question(&mut self, index: usize) -> GameResult<Question> {
        let question = self
            .questions
            .get(index)
            .cloned()
            .ok_or_else(|| GameError::out_of_sequence("No question at this position"))?;
        self.question_index = index;
        self.status = GameStatus::InProgress(QuestionPhase::Active);
        Ok(question)
    }

    /// Record a team's answer for the active question
    pub fn submit_answer(&mut self, team_id: &str, text: &str) -> GameResult<Answer> {
        let text = text.trim();
        if text.is_empty() {
            return Err(GameError::validation("Answer cannot be empty"));
        }
        if self.team(team_id).is_none() {
            return Err(GameError::validation("Team not found in this game"));
        }
        if self.status != GameStatus::InProgress(QuestionPhase::Active) {
            return Err(GameError::QuestionNotActive);
        }
        let question = self
            .current_question()
            .cloned()
            .ok_or(GameError::QuestionNotActive)?;
        if self
            .answer_for(team_id, question.round_num, question.question_num)
            .is_some()
        {
            return Err(GameError::DuplicateSubmission);
        }

        let answer = Answer {
            team_id: team_id.to_string(),
            round_num: question.round_num,
            question_num: question.question_num,
            text: text.to_string(),
            submitted_at: Utc::now(),
            auto_correct: question.matches(text),
            grade: Grade::Ungraded,
            points_awarded: 0,
        };
        self.answers.push(answer.clone());
        Ok(answer)
    }

    /// Active -> Closed; returns the frozen answers of the question
    pub fn close_question(&mut self, presented: &str) -> GameResult<Vec<Answer>> {
        self.authenticate(presented)?;
        if self.status != GameStatus::InProgress(QuestionPhase::Active) {
            return Err(GameError::QuestionNotActive);
        }

        self.status = GameStatus::InProgress(QuestionPhase::Closed);
        Ok(self.current_answers().into_iter().cloned().collect())
    }

    /// Grade an answer of the closed question. Re-grading replaces the earlier award.
    pub fn grade_answer(
        &mut self,
        presented: &str,
        team_id: &str,
        round_num: u32,
        question_num: u32,
        is_correct: bool,
        points: u32,
    ) -> GameResult<GradeOutcome> {
        self.authenticate(presented)?;
        if self.status != GameStatus::InProgress(QuestionPhase::Closed) {
            return Err(GameError::out_of_sequence(
                "Answers can only be graded after the question is closed",
            ));
        }
        match self.current_question() {
            Some(q) if q.round_num == round_num && q.question_num == question_num => {}
            _ => {
                return Err(GameError::out_of_sequence(format!(
                    "Round {} question {} is not the closed question",
                    round_num, question_num
                )))
            }
        }
        let team_index = self
            .teams
            .iter()
            .position(|t| t.team_id == team_id)
            .ok_or_else(|| GameError::validation("Team not found in this game"))?;
        let answer = self
            .answers
            .iter_mut()
            .find(|a| a.is_for(team_id, round_num, question_num))
            .ok_or_else(|| GameError::validation("Answer not found"))?;

        let awarded = if is_correct { points } else { 0 };
        let delta = i64::from(awarded) - i64::from(answer.points_awarded);
        answer.grade = if is_correct {
            Grade::Correct
        } else {
            Grade::Incorrect
        };
        answer.points_awarded = awarded;
        let answer = answer.clone();

        let team = &mut self.teams[team_index];
        team.score += delta;

        Ok(GradeOutcome {
            answer,
            team_name: team.name.clone(),
            new_score: team.score,
        })
    }

    /// Closed -> next question Active, or -> Finished after the last question
    pub fn advance_question(&mut self, presented: &str) -> GameResult<Advance> {
        self.authenticate(presented)?;
        if self.status != GameStatus::InProgress(QuestionPhase::Closed) {
            return Err(GameError::out_of_sequence(
                "Close the current question before moving on",
            ));
        }

        let next = self.question_index + 1;
        if next >= self.questions.len() {
            self.status = GameStatus::Finished;
            return Ok(Advance::Finished);
        }
        self.open_question(next).map(Advance::Question)
    }

    /// Backward navigation is not a supported transition
    pub fn previous_question(&self, presented: &str) -> GameResult<()> {
        self.authenticate(presented)?;
        Err(GameError::out_of_sequence(
            "Going back to a previous question is not supported",
        ))
    }

    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        leaderboard::project(&self.teams)
    }

    pub fn summary(&self) -> GameSummary {
        let (current_round, current_question) = self
            .current_question()
            .map(|q| (q.round_num, q.question_num))
            .unwrap_or((0, 0));
        GameSummary {
            game_id: self.game_id.clone(),
            status: self.status.as_str().to_string(),
            team_count: self.teams.len(),
            current_round,
            current_question,
            total_questions: self.questions.len(),
            created_at: self.created_at,
            started_at: self.started_at,
        }
    }
}
