use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use slackroll_core::domain::oauth::OAuthState;
use slackroll_core::domain::team::{Team, TeamId};

pub mod memory;
pub mod oauth_state;
pub mod team;

pub use memory::{InMemoryOAuthStateRepository, InMemoryTeamRepository};
pub use oauth_state::SqlOAuthStateRepository;
pub use team::SqlTeamRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Installed workspaces and their bot tokens.
#[async_trait]
pub trait TeamRepository: Send + Sync {
    async fn find_by_id(&self, id: &TeamId) -> Result<Option<Team>, RepositoryError>;
    /// Inserts the team or replaces its token, name and scope.
    async fn save(&self, team: Team) -> Result<(), RepositoryError>;
    async fn list(&self) -> Result<Vec<Team>, RepositoryError>;
    /// Returns `true` when a team was removed.
    async fn delete(&self, id: &TeamId) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait OAuthStateRepository: Send + Sync {
    async fn issue(
        &self,
        redirect_uri: &str,
        scope: &str,
        now: DateTime<Utc>,
    ) -> Result<OAuthState, RepositoryError>;

    /// Marks the token used and returns it, or `None` when the token is
    /// unknown, already used, or expired at `now`.
    async fn consume(
        &self,
        state_token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<OAuthState>, RepositoryError>;
}

pub(crate) fn parse_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("{column}: {e}")))
}
