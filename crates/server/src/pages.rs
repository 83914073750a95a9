use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Html,
};
use serde::Deserialize;
use tera::{Context, Tera};
use tracing::error;

use slackroll_core::roll::DEFAULT_COMMAND;

use crate::state::AppState;

pub fn init_templates() -> Result<Arc<Tera>, tera::Error> {
    let mut tera = Tera::default();
    tera.add_raw_templates(vec![
        ("index.html", include_str!("../../../templates/index.html")),
        ("confirm.html", include_str!("../../../templates/confirm.html")),
        ("error.html", include_str!("../../../templates/error.html")),
    ])?;
    Ok(Arc::new(tera))
}

fn base_context(state: &AppState) -> Context {
    let mut context = Context::new();
    context.insert("project_name", &state.config.roll.app_name);
    context.insert("version", env!("CARGO_PKG_VERSION"));
    context.insert("authorize_url", &state.config.server.authorize_url());
    context.insert(
        "primary_command",
        state.config.roll.allowed_commands.first().map(String::as_str).unwrap_or(DEFAULT_COMMAND),
    );
    context
}

pub fn render(
    state: &AppState,
    template: &str,
    context: &Context,
) -> Result<Html<String>, (StatusCode, Html<String>)> {
    state.templates.render(template, context).map(Html).map_err(|err| {
        error!(event_name = "server.template.render_failed", template, error = %err, "template render failed");
        (StatusCode::INTERNAL_SERVER_ERROR, Html("<h1>Internal error</h1>".to_string()))
    })
}

/// HTML error page with the given status.
pub fn error_page(state: &AppState, status: StatusCode, message: &str) -> (StatusCode, Html<String>) {
    let mut context = base_context(state);
    context.insert("message", message);
    match render(state, "error.html", &context) {
        Ok(html) => (status, html),
        Err(fallback) => fallback,
    }
}

pub async fn home(State(state): State<AppState>) -> Result<Html<String>, (StatusCode, Html<String>)> {
    let mut context = base_context(&state);
    context.insert("allowed_commands", &state.config.roll.allowed_commands);
    render(&state, "index.html", &context)
}

#[derive(Debug, Default, Deserialize)]
pub struct ConfirmQuery {
    pub team: Option<String>,
}

pub async fn confirm(
    State(state): State<AppState>,
    Query(query): Query<ConfirmQuery>,
) -> Result<Html<String>, (StatusCode, Html<String>)> {
    let mut context = base_context(&state);
    context.insert("team", &query.team.filter(|team| !team.trim().is_empty()));
    render(&state, "confirm.html", &context)
}
