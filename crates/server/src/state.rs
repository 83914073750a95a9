use std::sync::Arc;

use slackroll_core::config::AppConfig;
use slackroll_db::{OAuthStateRepository, TeamRepository};
use slackroll_slack::client::SlackApi;
use tera::Tera;

/// Shared handles for every HTTP handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub teams: Arc<dyn TeamRepository>,
    pub oauth_states: Arc<dyn OAuthStateRepository>,
    pub slack: Arc<dyn SlackApi>,
    pub templates: Arc<Tera>,
}
