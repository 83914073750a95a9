use secrecy::ExposeSecret;
use serde::Serialize;
use slackroll_core::config::AppConfig;
use slackroll_db::{SqlTeamRepository, TeamRepository};

use crate::commands::{current_thread_runtime, load_config, open_pool};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn new(name: &'static str, status: CheckStatus, details: impl Into<String>) -> Self {
        Self { name, status, details: details.into() }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match load_config("doctor") {
        Ok(config) => {
            checks.push(DoctorCheck::new(
                "config_validation",
                CheckStatus::Pass,
                "configuration loaded and validated",
            ));
            checks.push(check_slack_credentials(&config));
            checks.push(check_request_signing(&config));
            checks.push(check_database(&config));
        }
        Err(failure) => {
            checks.push(DoctorCheck::new("config_validation", CheckStatus::Fail, failure.output));
            for name in ["slack_credentials", "request_signing", "database_connectivity"] {
                checks.push(DoctorCheck::new(
                    name,
                    CheckStatus::Skipped,
                    "skipped because configuration did not load",
                ));
            }
        }
    }

    // An unsigned deployment still works, so a skipped signing check is not a failure.
    let healthy = checks.iter().all(|check| {
        check.status == CheckStatus::Pass
            || (check.name == "request_signing" && check.status == CheckStatus::Skipped)
    });
    let overall_status = if healthy { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if healthy {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_slack_credentials(config: &AppConfig) -> DoctorCheck {
    let client_id = config.slack.client_id.trim();
    if !client_id.contains('.') {
        return DoctorCheck::new(
            "slack_credentials",
            CheckStatus::Fail,
            format!("client id `{client_id}` does not look like a Slack app client id"),
        );
    }

    DoctorCheck::new(
        "slack_credentials",
        CheckStatus::Pass,
        format!(
            "client id `{client_id}` with scope `{}`; install redirect {}",
            config.slack.oauth_scope,
            config.server.oauth_redirect_url()
        ),
    )
}

fn check_request_signing(config: &AppConfig) -> DoctorCheck {
    match &config.slack.signing_secret {
        Some(secret) if !secret.expose_secret().trim().is_empty() => DoctorCheck::new(
            "request_signing",
            CheckStatus::Pass,
            "slash command requests are verified with the signing secret",
        ),
        _ => DoctorCheck::new(
            "request_signing",
            CheckStatus::Skipped,
            "no signing secret configured; slash command requests are not verified",
        ),
    }
}

fn check_database(config: &AppConfig) -> DoctorCheck {
    let runtime = match current_thread_runtime("doctor") {
        Ok(runtime) => runtime,
        Err(failure) => {
            return DoctorCheck::new("database_connectivity", CheckStatus::Fail, failure.output);
        }
    };

    let result = runtime.block_on(async {
        let pool = open_pool(config)
            .await
            .map_err(|(_, message, _)| format!("failed to connect to database: {message}"))?;
        let installed = SqlTeamRepository::new(pool.clone()).list().await;
        pool.close().await;
        Ok::<Option<usize>, String>(installed.ok().map(|teams| teams.len()))
    });

    match result {
        Ok(Some(teams)) => DoctorCheck::new(
            "database_connectivity",
            CheckStatus::Pass,
            format!("connected using `{}`; {teams} team(s) installed", config.database.url),
        ),
        Ok(None) => DoctorCheck::new(
            "database_connectivity",
            CheckStatus::Fail,
            format!(
                "connected using `{}` but the schema is missing; run `slackroll migrate`",
                config.database.url
            ),
        ),
        Err(error) => DoctorCheck::new("database_connectivity", CheckStatus::Fail, error),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
