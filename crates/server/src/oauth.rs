//! Install flow: `/authenticate` sends the admin to Slack, `/validate`
//! receives the callback and stores the bot token.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, Redirect},
};
use chrono::Utc;
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use slackroll_core::domain::team::{Team, TeamId};
use slackroll_core::errors::ApplicationError;
use slackroll_db::RepositoryError;
use slackroll_slack::client::{
    authorize_redirect_url, encode_query, OAuthAccessRequest, SlackApiError,
};

use crate::pages::error_page;
use crate::state::AppState;

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("Slack declined the install: {0}")]
    Declined(String),
    #[error("Slack did not send an authorization code")]
    MissingCode,
    #[error("This install link has expired or was already used.")]
    InvalidState,
    #[error("could not store install state: {0}")]
    Repository(#[from] RepositoryError),
    #[error("Slack rejected the authorization code: {0}")]
    Exchange(#[from] SlackApiError),
}

impl OAuthError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Declined(_) | Self::MissingCode | Self::InvalidState => StatusCode::BAD_REQUEST,
            Self::Exchange(SlackApiError::Api(_)) => StatusCode::BAD_REQUEST,
            Self::Exchange(_) => StatusCode::BAD_GATEWAY,
            Self::Repository(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Storage and transport failures get a generic message; their detail stays in the log.
    fn into_page(self, state: &AppState) -> (StatusCode, Html<String>) {
        let correlation_id = Uuid::new_v4().to_string();
        let status = self.status();
        let internal = match &self {
            Self::Repository(error) => Some(ApplicationError::Persistence(error.to_string())),
            Self::Exchange(error) if !matches!(error, SlackApiError::Api(_)) => {
                Some(ApplicationError::Integration(error.to_string()))
            }
            _ => None,
        };
        warn!(
            event_name = "server.oauth.failed",
            correlation_id = %correlation_id,
            error = %self,
            "oauth install failed"
        );

        let message = match internal {
            Some(error) => error.into_interface(correlation_id).user_message().to_string(),
            None => self.to_string(),
        };
        error_page(state, status, &message)
    }
}

pub async fn authenticate(
    State(state): State<AppState>,
) -> Result<Redirect, (StatusCode, Html<String>)> {
    let config = &state.config;
    let redirect_uri = config.server.oauth_redirect_url();

    let issued = state
        .oauth_states
        .issue(&redirect_uri, &config.slack.oauth_scope, Utc::now())
        .await
        .map_err(|error| OAuthError::from(error).into_page(&state))?;

    info!(
        event_name = "server.oauth.started",
        expires_at = %issued.expires_at,
        "redirecting to slack consent screen"
    );

    Ok(Redirect::to(&authorize_redirect_url(
        &config.slack.client_id,
        &issued.scope,
        &issued.redirect_uri,
        &issued.state_token,
    )))
}

#[derive(Debug, Default, Deserialize)]
pub struct ValidateQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

pub async fn validate(
    State(state): State<AppState>,
    Query(query): Query<ValidateQuery>,
) -> Result<Redirect, (StatusCode, Html<String>)> {
    complete_install(&state, query).await.map_err(|error| error.into_page(&state))
}

async fn complete_install(state: &AppState, query: ValidateQuery) -> Result<Redirect, OAuthError> {
    if let Some(error) = query.error.filter(|error| !error.trim().is_empty()) {
        return Err(OAuthError::Declined(error));
    }

    let state_token = query.state.filter(|token| !token.is_empty()).ok_or(OAuthError::InvalidState)?;
    let issued = state
        .oauth_states
        .consume(&state_token, Utc::now())
        .await?
        .ok_or(OAuthError::InvalidState)?;
    let code = query.code.filter(|code| !code.is_empty()).ok_or(OAuthError::MissingCode)?;

    let config = &state.config;
    let access = state
        .slack
        .oauth_access(&OAuthAccessRequest {
            client_id: config.slack.client_id.clone(),
            client_secret: config.slack.client_secret.expose_secret().to_string(),
            code,
            redirect_uri: issued.redirect_uri,
        })
        .await?;

    let now = Utc::now();
    let team = Team {
        id: TeamId(access.team_id),
        name: access.team_name,
        access_token: access.access_token,
        scope: access.scope.or(Some(issued.scope)),
        installed_at: now,
        updated_at: now,
    };
    let label = team.display_name().to_string();
    let team_id = team.id.clone();
    state.teams.save(team).await?;

    info!(event_name = "server.oauth.installed", team_id = %team_id, "team installed");

    Ok(Redirect::to(&format!("{}?team={}", config.server.confirm_url(), encode_query(&label))))
}
