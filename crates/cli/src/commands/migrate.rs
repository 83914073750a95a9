use chrono::Utc;
use slackroll_db::{migrations, SqlOAuthStateRepository};

use crate::commands::{current_thread_runtime, load_config, open_pool, CommandResult};

/// Applies pending migrations, then drops install states that can no longer be redeemed.
pub fn run() -> CommandResult {
    let config = match load_config("migrate") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match current_thread_runtime("migrate") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = open_pool(&config).await?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;
        let purged = SqlOAuthStateRepository::new(pool.clone())
            .purge_expired(Utc::now())
            .await
            .map_err(|error| ("oauth_state_purge", error.to_string(), 6u8))?;
        pool.close().await;
        Ok::<u64, (&'static str, String, u8)>(purged)
    });

    match result {
        Ok(purged) => CommandResult::success(
            "migrate",
            format!("applied pending migrations; purged {purged} expired install state(s)"),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("migrate", error_class, message, exit_code)
        }
    }
}
