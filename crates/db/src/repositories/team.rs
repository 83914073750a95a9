use sqlx::Row;

use slackroll_core::domain::team::{Team, TeamId};

use super::{parse_timestamp, RepositoryError, TeamRepository};
use crate::DbPool;

pub struct SqlTeamRepository {
    pool: DbPool,
}

impl SqlTeamRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_team(row: &sqlx::sqlite::SqliteRow) -> Result<Team, RepositoryError> {
    let team_id: String =
        row.try_get("team_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let team_name: Option<String> =
        row.try_get("team_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let access_token: String =
        row.try_get("access_token").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let scope: Option<String> =
        row.try_get("scope").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let installed_at_str: String =
        row.try_get("installed_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at_str: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(Team {
        id: TeamId(team_id),
        name: team_name,
        access_token,
        scope,
        installed_at: parse_timestamp("installed_at", &installed_at_str)?,
        updated_at: parse_timestamp("updated_at", &updated_at_str)?,
    })
}

#[async_trait::async_trait]
impl TeamRepository for SqlTeamRepository {
    async fn find_by_id(&self, id: &TeamId) -> Result<Option<Team>, RepositoryError> {
        let row = sqlx::query(
            "SELECT team_id, team_name, access_token, scope, installed_at, updated_at
             FROM teams WHERE team_id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_team).transpose()
    }

    async fn save(&self, team: Team) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO teams (team_id, team_name, access_token, scope, installed_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(team_id) DO UPDATE SET
                 team_name = excluded.team_name,
                 access_token = excluded.access_token,
                 scope = excluded.scope,
                 updated_at = excluded.updated_at",
        )
        .bind(&team.id.0)
        .bind(&team.name)
        .bind(&team.access_token)
        .bind(&team.scope)
        .bind(team.installed_at.to_rfc3339())
        .bind(team.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        tracing::debug!(event_name = "db.team.saved", team_id = %team.id, "team record upserted");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Team>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT team_id, team_name, access_token, scope, installed_at, updated_at
             FROM teams ORDER BY team_id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_team).collect::<Result<Vec<_>, _>>()
    }

    async fn delete(&self, id: &TeamId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM teams WHERE team_id = ?")
            .bind(&id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use slackroll_core::domain::team::{Team, TeamId};

    use super::SqlTeamRepository;
    use crate::repositories::{RepositoryError, TeamRepository};
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    fn sample_team(id: &str, token: &str) -> Team {
        let now = Utc::now();
        Team {
            id: TeamId(id.to_string()),
            name: Some("Tabletop Guild".to_string()),
            access_token: token.to_string(),
            scope: Some("commands,chat:write".to_string()),
            installed_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn save_and_find_by_id() {
        let repo = SqlTeamRepository::new(setup().await);
        let team = sample_team("T100", "xoxb-first");

        repo.save(team.clone()).await.expect("save");
        let found = repo.find_by_id(&TeamId("T100".to_string())).await.expect("find");
        let found = found.expect("should exist");

        assert_eq!(found.id, team.id);
        assert_eq!(found.access_token, "xoxb-first");
        assert_eq!(found.name.as_deref(), Some("Tabletop Guild"));
    }

    #[tokio::test]
    async fn unknown_team_is_none() {
        let repo = SqlTeamRepository::new(setup().await);
        let found = repo.find_by_id(&TeamId("T404".to_string())).await.expect("find");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn save_upserts_token_and_keeps_install_time() {
        let repo = SqlTeamRepository::new(setup().await);
        let original = sample_team("T100", "xoxb-first");
        repo.save(original.clone()).await.expect("save");

        let mut reinstalled = sample_team("T100", "xoxb-second");
        reinstalled.installed_at = original.installed_at + Duration::days(3);
        reinstalled.updated_at = reinstalled.installed_at;
        repo.save(reinstalled).await.expect("upsert");

        let found = repo
            .find_by_id(&TeamId("T100".to_string()))
            .await
            .expect("find")
            .expect("should exist");
        assert_eq!(found.access_token, "xoxb-second");
        assert_eq!(found.installed_at.timestamp(), original.installed_at.timestamp());
        assert_eq!(repo.list().await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn list_is_sorted_and_delete_removes() {
        let repo = SqlTeamRepository::new(setup().await);
        repo.save(sample_team("T200", "xoxb-b")).await.expect("save b");
        repo.save(sample_team("T100", "xoxb-a")).await.expect("save a");

        let ids: Vec<String> =
            repo.list().await.expect("list").into_iter().map(|team| team.id.0).collect();
        assert_eq!(ids, vec!["T100".to_string(), "T200".to_string()]);

        assert!(repo.delete(&TeamId("T100".to_string())).await.expect("delete"));
        assert!(!repo.delete(&TeamId("T100".to_string())).await.expect("delete again"));
        assert_eq!(repo.list().await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn malformed_timestamp_is_a_decode_error() {
        let pool = setup().await;
        sqlx::query(
            "INSERT INTO teams (team_id, team_name, access_token, scope, installed_at, updated_at)
             VALUES ('T1', NULL, 'xoxb-x', NULL, 'yesterday', 'yesterday')",
        )
        .execute(&pool)
        .await
        .expect("raw insert");

        let repo = SqlTeamRepository::new(pool);
        let result = repo.find_by_id(&TeamId("T1".to_string())).await;
        assert!(matches!(result, Err(RepositoryError::Decode(_))));
    }
}
