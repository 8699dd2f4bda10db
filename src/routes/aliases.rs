use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, put},
};
use axum_valid::Valid;

use crate::{
    dto::{
        alias::{AliasSummary, ClearAliasResponse, SetAliasRequest},
        validation::validate_not_blank,
    },
    error::AppError,
    services::alias_service,
    state::SharedState,
};

fn player_id(raw: &str) -> Result<&str, AppError> {
    validate_not_blank(raw)
        .map_err(|err| AppError::BadRequest(format!("invalid player id: {err}")))?;
    Ok(raw)
}

/// List registered alias overrides.
#[utoipa::path(
    get,
    path = "/aliases",
    tag = "aliases",
    responses((status = 200, description = "Registered aliases", body = [AliasSummary]))
)]
pub async fn list_aliases(State(state): State<SharedState>) -> Json<Vec<AliasSummary>> {
    Json(alias_service::list_aliases(&state).await)
}

/// Register the name a player appears under on the game host.
#[utoipa::path(
    put,
    path = "/aliases/{player_id}",
    tag = "aliases",
    params(("player_id" = String, Path, description = "Chat user identifier")),
    request_body = SetAliasRequest,
    responses(
        (status = 200, description = "Alias registered", body = AliasSummary),
        (status = 400, description = "Invalid alias"),
    )
)]
pub async fn set_alias(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Valid(Json(payload)): Valid<Json<SetAliasRequest>>,
) -> Result<Json<AliasSummary>, AppError> {
    let id = player_id(&id)?;
    Ok(Json(alias_service::set_alias(&state, id, &payload.alias).await))
}

/// Remove the alias override of a player.
#[utoipa::path(
    delete,
    path = "/aliases/{player_id}",
    tag = "aliases",
    params(("player_id" = String, Path, description = "Chat user identifier")),
    responses((status = 200, description = "Alias removed", body = ClearAliasResponse))
)]
pub async fn clear_alias(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<ClearAliasResponse>, AppError> {
    let id = player_id(&id)?;
    Ok(Json(alias_service::clear_alias(&state, id).await))
}

/// Configure the alias routes subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/aliases", get(list_aliases))
        .route("/aliases/{player_id}", put(set_alias).delete(clear_alias))
}
