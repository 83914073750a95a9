use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use slackroll_core::domain::oauth::OAuthState;

use super::{parse_timestamp, OAuthStateRepository, RepositoryError};
use crate::DbPool;

pub struct SqlOAuthStateRepository {
    pool: DbPool,
}

impl SqlOAuthStateRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Drops tokens that expired at or before `now`. Returns the number removed.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        // `to_rfc3339` on UTC values yields strings that sort chronologically.
        let removed = sqlx::query("DELETE FROM oauth_state WHERE expires_at <= ?")
            .bind(now.to_rfc3339())
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(removed)
    }
}

fn row_to_state(row: &sqlx::sqlite::SqliteRow) -> Result<OAuthState, RepositoryError> {
    let state_token: String =
        row.try_get("state_token").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let redirect_uri: String =
        row.try_get("redirect_uri").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let scope: String = row.try_get("scope").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let requested_at_str: String =
        row.try_get("requested_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let expires_at_str: String =
        row.try_get("expires_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let used: i64 = row.try_get("used").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(OAuthState {
        state_token,
        redirect_uri,
        scope,
        requested_at: parse_timestamp("requested_at", &requested_at_str)?,
        expires_at: parse_timestamp("expires_at", &expires_at_str)?,
        used: used != 0,
    })
}

#[async_trait::async_trait]
impl OAuthStateRepository for SqlOAuthStateRepository {
    async fn issue(
        &self,
        redirect_uri: &str,
        scope: &str,
        now: DateTime<Utc>,
    ) -> Result<OAuthState, RepositoryError> {
        let purged = self.purge_expired(now).await?;
        if purged > 0 {
            tracing::debug!(
                event_name = "db.oauth_state.purged",
                purged,
                "expired oauth states removed"
            );
        }

        let state = OAuthState::new(Uuid::new_v4().simple().to_string(), redirect_uri, scope, now);

        sqlx::query(
            "INSERT INTO oauth_state (state_token, redirect_uri, scope, requested_at, expires_at, used)
             VALUES (?, ?, ?, ?, ?, 0)",
        )
        .bind(&state.state_token)
        .bind(&state.redirect_uri)
        .bind(&state.scope)
        .bind(state.requested_at.to_rfc3339())
        .bind(state.expires_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(state)
    }

    async fn consume(
        &self,
        state_token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<OAuthState>, RepositoryError> {
        // The `used = 0` guard makes concurrent callbacks race for a single winner,
        // so the returned row was unused before this update.
        let row = sqlx::query(
            "UPDATE oauth_state SET used = 1
             WHERE state_token = ? AND used = 0
             RETURNING state_token, redirect_uri, scope, requested_at, expires_at, 0 AS used",
        )
        .bind(state_token)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut state = row_to_state(&row)?;
        if !state.is_redeemable(now) {
            tracing::info!(
                event_name = "db.oauth_state.expired",
                requested_at = %state.requested_at,
                "oauth state token presented after expiry"
            );
            return Ok(None);
        }
        state.used = true;
        Ok(Some(state))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::SqlOAuthStateRepository;
    use crate::repositories::OAuthStateRepository;
    use crate::{connect_with_settings, migrations};

    const REDIRECT: &str = "https://dice.example.com/validate";

    async fn setup() -> SqlOAuthStateRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlOAuthStateRepository::new(pool)
    }

    #[tokio::test]
    async fn issued_state_is_consumed_once() {
        let repo = setup().await;
        let now = Utc::now();
        let issued = repo.issue(REDIRECT, "commands,chat:write", now).await.expect("issue");

        assert_eq!(issued.state_token.len(), 32);
        assert_eq!(issued.expires_at - issued.requested_at, Duration::minutes(10));

        let consumed =
            repo.consume(&issued.state_token, now).await.expect("consume").expect("redeemable");
        assert_eq!(consumed.redirect_uri, REDIRECT);
        assert!(consumed.used);

        let replay = repo.consume(&issued.state_token, now).await.expect("consume again");
        assert!(replay.is_none(), "state tokens are single-use");
    }

    #[tokio::test]
    async fn expired_state_is_rejected() {
        let repo = setup().await;
        let issued_at = Utc::now() - Duration::minutes(30);
        let issued = repo.issue(REDIRECT, "commands", issued_at).await.expect("issue");

        let result = repo.consume(&issued.state_token, Utc::now()).await.expect("consume");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn unknown_state_is_rejected() {
        let repo = setup().await;
        let result = repo.consume("not-a-token", Utc::now()).await.expect("consume");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn tokens_are_unique_and_purge_drops_expired() {
        let repo = setup().await;
        let now = Utc::now();
        let stale = repo.issue(REDIRECT, "commands", now - Duration::hours(1)).await.expect("stale");
        let other = repo.issue(REDIRECT, "commands", now - Duration::hours(1)).await.expect("other");
        assert_ne!(stale.state_token, other.state_token);

        assert_eq!(repo.purge_expired(now).await.expect("purge"), 2);
        assert_eq!(repo.purge_expired(now).await.expect("purge again"), 0);
    }

    #[tokio::test]
    async fn issuing_sweeps_expired_rows() {
        let repo = setup().await;
        let start = Utc::now();
        for _ in 0..5 {
            repo.issue(REDIRECT, "commands", start).await.expect("issue");
        }
        assert_eq!(row_count(&repo).await, 5);

        let later = start + Duration::minutes(11);
        let fresh = repo.issue(REDIRECT, "commands", later).await.expect("issue later");

        assert_eq!(row_count(&repo).await, 1);
        assert!(repo.consume(&fresh.state_token, later).await.expect("consume").is_some());
    }

    async fn row_count(repo: &SqlOAuthStateRepository) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM oauth_state")
            .fetch_one(&repo.pool)
            .await
            .expect("count rows")
    }
}
