use std::sync::Arc;

use chrono::Utc;
use slackroll_core::config::{AppConfig, ConfigError};
use slackroll_db::{
    connect_with_settings, migrations, DbPool, SqlOAuthStateRepository, SqlTeamRepository,
};
use slackroll_slack::client::{SlackApiError, SlackWebClient};
use thiserror::Error;
use tracing::{info, warn};

use crate::pages::init_templates;
use crate::state::AppState;

pub struct Application {
    pub config: Arc<AppConfig>,
    pub db_pool: DbPool,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("template initialization failed: {0}")]
    Templates(#[source] tera::Error),
    #[error("slack client initialization failed: {0}")]
    SlackClient(#[source] SlackApiError),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let oauth_states = SqlOAuthStateRepository::new(db_pool.clone());
    match oauth_states.purge_expired(Utc::now()).await {
        Ok(removed) => info!(
            event_name = "system.bootstrap.oauth_state_purged",
            correlation_id = "bootstrap",
            removed,
            "expired oauth state tokens purged"
        ),
        Err(error) => warn!(
            event_name = "system.bootstrap.oauth_state_purge_failed",
            correlation_id = "bootstrap",
            error = %error,
            "could not purge expired oauth state tokens"
        ),
    }

    let templates = init_templates().map_err(BootstrapError::Templates)?;
    let slack =
        SlackWebClient::new(config.slack.api_base_url.as_str()).map_err(BootstrapError::SlackClient)?;

    let config = Arc::new(config);
    let state = AppState {
        config: Arc::clone(&config),
        teams: Arc::new(SqlTeamRepository::new(db_pool.clone())),
        oauth_states: Arc::new(oauth_states),
        slack: Arc::new(slack),
        templates,
    };

    Ok(Application { config, db_pool, state })
}
