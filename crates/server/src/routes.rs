use axum::{middleware, routing::get, Router};
use slackroll_db::DbPool;

use crate::state::AppState;
use crate::{gateway, health, oauth, pages};

pub fn router(state: AppState, db_pool: DbPool) -> Router {
    Router::new()
        .route("/", get(pages::home).post(gateway::slash_command))
        .route_layer(middleware::from_fn_with_state(state.clone(), gateway::verify_signature))
        .route("/authenticate", get(oauth::authenticate))
        .route("/validate", get(oauth::validate))
        .route("/confirm", get(pages::confirm))
        .with_state(state)
        .merge(health::router(db_pool))
}
