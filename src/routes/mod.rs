use axum::Router;

use crate::state::SharedState;

pub mod aliases;
pub mod docs;
pub mod games;
pub mod health;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(games::router())
        .merge(aliases::router());

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}
