use serde::Serialize;
use slackroll_core::redact_token;
use slackroll_db::{migrations, SqlTeamRepository, TeamRepository};

use crate::commands::{current_thread_runtime, load_config, open_pool, CommandResult};

#[derive(Debug, Serialize)]
struct TeamSummary {
    team_id: String,
    team_name: Option<String>,
    access_token: String,
    scope: Option<String>,
    installed_at: String,
    updated_at: String,
}

pub fn run() -> CommandResult {
    let config = match load_config("teams") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match current_thread_runtime("teams") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = open_pool(&config).await?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;
        let teams = SqlTeamRepository::new(pool.clone())
            .list()
            .await
            .map_err(|error| ("team_lookup", error.to_string(), 6u8))?;
        pool.close().await;
        Ok::<_, (&'static str, String, u8)>(teams)
    });

    let teams = match result {
        Ok(teams) => teams,
        Err((error_class, message, exit_code)) => {
            return CommandResult::failure("teams", error_class, message, exit_code);
        }
    };

    let summaries: Vec<TeamSummary> = teams
        .into_iter()
        .map(|team| TeamSummary {
            team_id: team.id.to_string(),
            team_name: team.name.clone(),
            access_token: redact_token(&team.access_token),
            scope: team.scope.clone(),
            installed_at: team.installed_at.to_rfc3339(),
            updated_at: team.updated_at.to_rfc3339(),
        })
        .collect();

    match serde_json::to_string(&summaries) {
        Ok(listing) => CommandResult::success("teams", listing),
        Err(error) => CommandResult::failure("teams", "serialization", error.to_string(), 7),
    }
}
