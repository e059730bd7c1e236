pub mod config;
pub mod content;
pub mod error;
pub mod game;
pub mod lobby;
pub mod round;
pub mod session;
pub mod types;

use std::sync::Arc;

use askama::Template;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::prelude::*;

use crate::error::{GameError, GameResult};
use crate::game::Registry;
use crate::types::*;

pub fn setup_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "truth_or_dare=info,tower_http=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_target(false),
        )
        .init();
}

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
}

// ─── Templates ────────────────────────────────────────────────────

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    lobbies: usize,
    games: usize,
}

// ─── Routes ───────────────────────────────────────────────────────

/// Unwraps a JSON body, reporting malformed input as a 400.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> GameResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|e| GameError::BadRequest(e.body_text()))
}

async fn index_page(State(state): State<AppState>) -> impl IntoResponse {
    let page = IndexTemplate {
        lobbies: state.registry.lobbies.len(),
        games: state.registry.games.len(),
    };
    match page.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!("Failed to render index: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn create_lobby(
    State(state): State<AppState>,
    payload: Result<Json<CreateLobbyRequest>, JsonRejection>,
) -> GameResult<impl IntoResponse> {
    let created = state.registry.create_lobby(body(payload)?)?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn join_lobby(
    State(state): State<AppState>,
    Path(code): Path<String>,
    payload: Result<Json<JoinLobbyRequest>, JsonRejection>,
) -> GameResult<Json<JoinLobbyResponse>> {
    let req = body(payload)?;
    Ok(Json(state.registry.join_lobby(&code, &req.player_name)?))
}

async fn get_lobby(
    State(state): State<AppState>,
    Path(lobby_id): Path<String>,
) -> GameResult<Json<LobbyView>> {
    Ok(Json(state.registry.lobby(&lobby_id)?))
}

async fn start_game(
    State(state): State<AppState>,
    Path(lobby_id): Path<String>,
) -> GameResult<Json<StartGameResponse>> {
    let handle = state.registry.start_game(&lobby_id)?;
    Ok(Json(StartGameResponse {
        game_id: handle.game_id,
        message: "Game started successfully".to_string(),
    }))
}

async fn get_game(
    State(state): State<AppState>,
    Path(game_id): Path<String>,
) -> GameResult<Json<GameView>> {
    let handle = state.registry.game(&game_id)?;
    Ok(Json(handle.view().await?))
}

async fn next_turn(
    State(state): State<AppState>,
    Path(game_id): Path<String>,
) -> GameResult<Json<TurnView>> {
    let handle = state.registry.game(&game_id)?;
    Ok(Json(handle.next_turn().await?))
}

async fn make_choice(
    State(state): State<AppState>,
    Path(game_id): Path<String>,
    payload: Result<Json<MakeChoiceRequest>, JsonRejection>,
) -> GameResult<Json<serde_json::Value>> {
    let handle = state.registry.game(&game_id)?;
    let req = body(payload)?;
    Ok(Json(
        handle.make_choice(req.choice_type, req.target_player_id).await?,
    ))
}

async fn submit_task(
    State(state): State<AppState>,
    Path(game_id): Path<String>,
    payload: Result<Json<SubmitTaskRequest>, JsonRejection>,
) -> GameResult<Json<serde_json::Value>> {
    let handle = state.registry.game(&game_id)?;
    let req = body(payload)?;
    Ok(Json(handle.submit_task(req.text).await?))
}

async fn end_game(
    State(state): State<AppState>,
    Path(game_id): Path<String>,
) -> GameResult<Json<serde_json::Value>> {
    let handle = state.registry.game(&game_id)?;
    handle.end().await?;
    Ok(Json(serde_json::json!({ "message": "Game ended" })))
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "Not found" })),
    )
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_page))
        .route("/api/health", get(health))
        .route("/api/lobby", post(create_lobby))
        .route("/api/lobby/{id}/join", post(join_lobby))
        .route("/api/lobby/{id}", get(get_lobby))
        .route("/api/lobby/{id}/start", post(start_game))
        .route("/api/game/{id}", get(get_game))
        .route("/api/game/{id}/next-turn", post(next_turn))
        .route("/api/game/{id}/make-choice", post(make_choice))
        .route("/api/game/{id}/submit-task", post(submit_task))
        .route("/api/game/{id}/end", post(end_game))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
