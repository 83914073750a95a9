use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use slackroll_core::domain::oauth::OAuthState;
use slackroll_core::domain::team::{Team, TeamId};

use super::{OAuthStateRepository, RepositoryError, TeamRepository};

#[derive(Default)]
pub struct InMemoryTeamRepository {
    teams: RwLock<HashMap<String, Team>>,
}

impl InMemoryTeamRepository {
    pub fn with_teams(teams: impl IntoIterator<Item = Team>) -> Self {
        Self {
            teams: RwLock::new(teams.into_iter().map(|team| (team.id.0.clone(), team)).collect()),
        }
    }
}

#[async_trait::async_trait]
impl TeamRepository for InMemoryTeamRepository {
    async fn find_by_id(&self, id: &TeamId) -> Result<Option<Team>, RepositoryError> {
        let teams = self.teams.read().await;
        Ok(teams.get(&id.0).cloned())
    }

    async fn save(&self, team: Team) -> Result<(), RepositoryError> {
        let mut teams = self.teams.write().await;
        let installed_at =
            teams.get(&team.id.0).map(|existing| existing.installed_at).unwrap_or(team.installed_at);
        teams.insert(team.id.0.clone(), Team { installed_at, ..team });
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Team>, RepositoryError> {
        let teams = self.teams.read().await;
        let mut listed: Vec<Team> = teams.values().cloned().collect();
        listed.sort_by(|left, right| left.id.0.cmp(&right.id.0));
        Ok(listed)
    }

    async fn delete(&self, id: &TeamId) -> Result<bool, RepositoryError> {
        let mut teams = self.teams.write().await;
        Ok(teams.remove(&id.0).is_some())
    }
}

#[derive(Default)]
pub struct InMemoryOAuthStateRepository {
    states: RwLock<HashMap<String, OAuthState>>,
}

#[async_trait::async_trait]
impl OAuthStateRepository for InMemoryOAuthStateRepository {
    async fn issue(
        &self,
        redirect_uri: &str,
        scope: &str,
        now: DateTime<Utc>,
    ) -> Result<OAuthState, RepositoryError> {
        let state = OAuthState::new(Uuid::new_v4().simple().to_string(), redirect_uri, scope, now);
        let mut states = self.states.write().await;
        states.retain(|_, existing| !existing.is_expired(now));
        states.insert(state.state_token.clone(), state.clone());
        Ok(state)
    }

    async fn consume(
        &self,
        state_token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<OAuthState>, RepositoryError> {
        let mut states = self.states.write().await;
        let Some(state) = states.get_mut(state_token) else {
            return Ok(None);
        };
        let redeemable = state.is_redeemable(now);
        state.used = true;
        Ok(redeemable.then(|| state.clone()))
    }
}
