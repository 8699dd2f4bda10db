use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use axum_valid::Valid;

use crate::{
    dto::{
        game::{ForgetResponse, GameSummary, MonitorGameRequest},
        validation::validate_game_id,
    },
    error::AppError,
    services::monitor_service,
    state::{SharedState, game::GameId},
};

fn game_id(raw: String) -> Result<GameId, AppError> {
    validate_game_id(&raw).map_err(|err| AppError::BadRequest(format!("invalid game id: {err}")))?;
    Ok(GameId::new(raw))
}

/// Start monitoring a game.
#[utoipa::path(
    post,
    path = "/games",
    tag = "games",
    request_body = MonitorGameRequest,
    responses(
        (status = 201, description = "Game monitored", body = GameSummary),
        (status = 400, description = "Invalid payload"),
        (status = 409, description = "Game already monitored"),
    )
)]
pub async fn monitor_game(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<MonitorGameRequest>>,
) -> Result<(StatusCode, Json<GameSummary>), AppError> {
    let summary = monitor_service::monitor_game(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

/// Stop monitoring a game. Forgetting an unknown game succeeds with `removed: false`.
#[utoipa::path(
    delete,
    path = "/games/{id}",
    tag = "games",
    params(("id" = String, Path, description = "Game identifier on the external host")),
    responses((status = 200, description = "Game forgotten", body = ForgetResponse))
)]
pub async fn forget_game(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<ForgetResponse>, AppError> {
    let id = game_id(id)?;
    Ok(Json(monitor_service::forget_game(&state, &id).await))
}

/// List every monitored game.
#[utoipa::path(
    get,
    path = "/games",
    tag = "games",
    responses((status = 200, description = "Monitored games", body = [GameSummary]))
)]
pub async fn list_games(State(state): State<SharedState>) -> Json<Vec<GameSummary>> {
    Json(monitor_service::list_games(&state).await)
}

/// Inspect one monitored game.
#[utoipa::path(
    get,
    path = "/games/{id}",
    tag = "games",
    params(("id" = String, Path, description = "Game identifier on the external host")),
    responses(
        (status = 200, description = "Monitored game", body = GameSummary),
        (status = 404, description = "Game not monitored"),
    )
)]
pub async fn get_game(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<GameSummary>, AppError> {
    let id = game_id(id)?;
    Ok(Json(monitor_service::get_game(&state, &id).await?))
}

/// Configure the game monitoring routes subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/games", get(list_games).post(monitor_game))
        .route("/games/{id}", get(get_game).delete(forget_game))
}
