pub mod connections;
pub mod game;
pub mod leaderboard;
pub mod registry;

use std::sync::Arc;

use crate::questions::QuestionSource;
pub use connections::ConnectionRegistry;
pub use game::GameSession;
pub use registry::{GameRegistry, SharedGame};

/// Shared application state, owned by the process root and handed to every connection
pub struct AppState {
    pub games: GameRegistry,
    pub connections: ConnectionRegistry,
    /// Whether connections replay their admin login secret for privileged events
    pub remember_admin_secret: bool,
    /// Capacity of each connection's outbound queue
    pub outbound_buffer: usize,
}

impl AppState {
    pub fn new(questions: Arc<dyn QuestionSource>) -> Self {
        Self {
            games: GameRegistry::new(questions),
            connections: ConnectionRegistry::new(),
            remember_admin_secret: true,
            outbound_buffer: crate::config::DEFAULT_OUTBOUND_BUFFER,
        }
    }

    pub fn with_config(questions: Arc<dyn QuestionSource>, config: &crate::config::Config) -> Self {
        Self {
            remember_admin_secret: config.remember_admin_secret,
            outbound_buffer: config.outbound_buffer,
            ..Self::new(questions)
        }
    }
}
