// Public API for integration tests and the server binary

pub mod auth;
pub mod broadcast;
pub mod config;
pub mod error;
pub mod protocol;
pub mod questions;
pub mod state;
pub mod types;
pub mod ws;
