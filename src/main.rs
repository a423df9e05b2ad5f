use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quizhall::{
    config::Config,
    questions::{InMemoryQuestionSource, SeedFile, SeedGame},
    state::AppState,
    ws,
};

/// Log a fatal startup error and end the process
fn fail(context: &str, err: impl std::fmt::Display) -> ! {
    tracing::error!("{}: {}", context, err);
    std::process::exit(1);
}

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quizhall=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting quizhall...");

    let config = Config::from_env();

    let seeds: Vec<SeedGame> = match &config.games_file {
        Some(path) => match SeedFile::load(path).await {
            Ok(seed) => seed.games,
            Err(e) => fail(&format!("Failed to load {}", path.display()), e),
        },
        None => {
            tracing::warn!("QUIZHALL_GAMES_FILE not set, starting without games");
            Vec::new()
        }
    };

    let source = Arc::new(InMemoryQuestionSource::new());
    for seed in &seeds {
        if let Err(e) = source.load(&seed.game_id, seed.questions.clone()).await {
            fail(&format!("Invalid questions for game {}", seed.game_id), e);
        }
    }

    let state = Arc::new(AppState::with_config(source, &config));
    for seed in &seeds {
        if let Err(e) = state
            .games
            .create_game(&seed.game_id, &seed.admin_password)
            .await
        {
            fail(&format!("Failed to create game {}", seed.game_id), e);
        }
    }
    tracing::info!("{} game(s) ready", seeds.len());

    let app = Router::new()
        .route("/ws", get(ws::ws_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = match tokio::net::TcpListener::bind(config.bind).await {
        Ok(listener) => listener,
        Err(e) => fail(&format!("Failed to bind {}", config.bind), e),
    };
    tracing::info!("Listening on http://{}", config.bind);

    if let Err(e) = axum::serve(listener, app).await {
        fail("Server error", e);
    }
}
