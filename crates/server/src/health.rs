use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use slackroll_db::{migrations, DbPool};
use tracing::warn;

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Readiness {
    Ready,
    Degraded,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProbeResult {
    pub status: Readiness,
    pub detail: String,
}

impl ProbeResult {
    fn ready(detail: impl Into<String>) -> Self {
        Self { status: Readiness::Ready, detail: detail.into() }
    }

    fn degraded(detail: impl Into<String>) -> Self {
        Self { status: Readiness::Degraded, detail: detail.into() }
    }
}

/// Body of `GET /health`. The schema probe is informational and never flips
/// the overall status on its own.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub status: Readiness,
    pub service: ProbeResult,
    pub database: ProbeResult,
    pub schema: ProbeResult,
    pub checked_at: String,
}

pub fn router(db_pool: DbPool) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { db_pool })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthReport>) {
    let database = probe_database(&state.db_pool).await;
    let schema = if database.status == Readiness::Ready {
        probe_schema(&state.db_pool).await
    } else {
        ProbeResult::degraded("skipped: database unreachable")
    };

    let status = database.status;
    if status == Readiness::Degraded {
        warn!(event_name = "server.health.degraded", detail = %database.detail, "database probe failed");
    }

    let report = HealthReport {
        status,
        service: ProbeResult::ready(concat!(
            "slackroll-server ",
            env!("CARGO_PKG_VERSION"),
            " accepting slash commands"
        )),
        database,
        schema,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = match status {
        Readiness::Ready => StatusCode::OK,
        Readiness::Degraded => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(report))
}

async fn probe_database(pool: &DbPool) -> ProbeResult {
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await {
        Ok(_) => ProbeResult::ready("SELECT 1 succeeded"),
        Err(error) => ProbeResult::degraded(format!("SELECT 1 failed: {error}")),
    }
}

async fn probe_schema(pool: &DbPool) -> ProbeResult {
    match migrations::pending_count(pool).await {
        Ok(0) => ProbeResult::ready("all migrations applied"),
        Ok(pending) => ProbeResult::degraded(format!("{pending} migration(s) pending")),
        Err(error) => ProbeResult::degraded(format!("could not read migration history: {error}")),
    }
}

#[cfg(test)]
mod tests {
    use axum::{extract::State, http::StatusCode, Json};
    use slackroll_db::{connect_with_settings, migrations};

    use super::{health, HealthState, Readiness};

    #[tokio::test]
    async fn migrated_database_reports_ready() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool");
        migrations::run_pending(&pool).await.expect("migrations");

        let (status, Json(report)) = health(State(HealthState { db_pool: pool.clone() })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(report.status, Readiness::Ready);
        assert_eq!(report.schema.status, Readiness::Ready);
        assert!(report.service.detail.starts_with("slackroll-server "));

        pool.close().await;
    }

    #[tokio::test]
    async fn pending_migrations_do_not_fail_the_probe() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool");

        let (status, Json(report)) = health(State(HealthState { db_pool: pool.clone() })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(report.schema.status, Readiness::Degraded);
        assert_eq!(report.schema.detail, "2 migration(s) pending");

        pool.close().await;
    }

    #[tokio::test]
    async fn closed_pool_is_service_unavailable() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool");
        pool.close().await;

        let (status, Json(report)) = health(State(HealthState { db_pool: pool })).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(report.database.status, Readiness::Degraded);
        assert_eq!(report.service.status, Readiness::Ready);
    }
}
