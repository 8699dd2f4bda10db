use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the turn herald admin API.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::games::monitor_game,
        crate::routes::games::forget_game,
        crate::routes::games::list_games,
        crate::routes::games::get_game,
        crate::routes::aliases::list_aliases,
        crate::routes::aliases::set_alias,
        crate::routes::aliases::clear_alias,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::game::MonitorGameRequest,
            crate::dto::game::PlayerInput,
            crate::dto::game::GameSummary,
            crate::dto::game::PlayerSummary,
            crate::dto::game::ForgetResponse,
            crate::dto::alias::SetAliasRequest,
            crate::dto::alias::AliasSummary,
            crate::dto::alias::ClearAliasResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "games", description = "Start, stop and inspect game monitoring"),
        (name = "aliases", description = "External name overrides for players"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_admin_routes() {
        let doc = ApiDoc::openapi();
        let paths: Vec<_> = doc.paths.paths.keys().cloned().collect();
        for expected in ["/healthcheck", "/games", "/games/{id}", "/aliases", "/aliases/{player_id}"] {
            assert!(paths.iter().any(|path| path == expected), "missing {expected}");
        }
    }
}
