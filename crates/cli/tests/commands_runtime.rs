use std::env;
use std::sync::{Mutex, OnceLock};

use serde_json::Value;
use slackroll_cli::commands::{config, doctor, migrate, roll, teams};

const VALID_ENV: &[(&str, &str)] = &[
    ("SLACKROLL_SLACK_CLIENT_ID", "1111.2222"),
    ("SLACKROLL_SLACK_CLIENT_SECRET", "client-secret-value"),
    ("SLACKROLL_DATABASE_URL", "sqlite::memory:"),
];

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(VALID_ENV, || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
        assert!(payload["message"].as_str().unwrap_or_default().contains("purged 0"));
    });
}

#[test]
fn migrate_returns_config_failure_without_credentials() {
    with_env(&[("SLACKROLL_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
        assert!(payload["message"].as_str().unwrap_or_default().contains("slack.client_id"));
    });
}

#[test]
fn teams_lists_nothing_on_a_fresh_database() {
    with_env(VALID_ENV, || {
        let result = teams::run();
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "teams");
        assert_eq!(payload["message"], "[]");
    });
}

#[test]
fn config_redacts_secrets_and_attributes_env_sources() {
    with_env(VALID_ENV, || {
        let output = config::run();

        assert!(output.contains(
            "- slack.client_id = 1111.2222 (source: env (SLACKROLL_SLACK_CLIENT_ID))"
        ));
        assert!(output.contains("- slack.client_secret = <redacted>"));
        assert!(output.contains("- slack.signing_secret = <unset> (source: default)"));
        assert!(!output.contains("client-secret-value"));
    });
}

#[test]
fn doctor_reports_missing_schema_and_unsigned_requests() {
    with_env(VALID_ENV, || {
        let report = parse_payload(&doctor::run(true));

        assert_eq!(report["overall_status"], "fail");
        let checks = report["checks"].as_array().cloned().unwrap_or_default();
        let status_of = |name: &str| {
            checks
                .iter()
                .find(|check| check["name"] == name)
                .map(|check| check["status"].clone())
                .unwrap_or(Value::Null)
        };
        assert_eq!(status_of("config_validation"), "pass");
        assert_eq!(status_of("slack_credentials"), "pass");
        assert_eq!(status_of("request_signing"), "skipped");
        assert_eq!(status_of("database_connectivity"), "fail");
    });
}

#[test]
fn doctor_skips_dependent_checks_when_config_is_invalid() {
    with_env(&[], || {
        let output = doctor::run(false);

        assert!(output.starts_with("doctor: one or more readiness checks failed"));
        assert!(output.contains("- [fail] config_validation:"));
        assert!(output.contains("- [skip] database_connectivity:"));
    });
}

#[test]
fn roll_uses_configured_app_name_in_usage() {
    with_env(
        &[
            ("SLACKROLL_SLACK_CLIENT_ID", "1111.2222"),
            ("SLACKROLL_SLACK_CLIENT_SECRET", "client-secret-value"),
            ("SLACKROLL_ROLL_APP_NAME", "Table Dice"),
        ],
        || {
            let result = roll::run("help", "erin", None);
            assert_eq!(result.exit_code, 0);

            let payload = parse_payload(&result.output);
            assert!(payload["message"]
                .as_str()
                .unwrap_or_default()
                .starts_with("*Table Dice* can roll anywhere from"));
        },
    );
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "SLACKROLL_DATABASE_URL",
        "SLACKROLL_DATABASE_MAX_CONNECTIONS",
        "SLACKROLL_DATABASE_TIMEOUT_SECS",
        "SLACKROLL_SLACK_CLIENT_ID",
        "SLACKROLL_SLACK_CLIENT_SECRET",
        "SLACKROLL_SLACK_SIGNING_SECRET",
        "SLACKROLL_SLACK_API_BASE_URL",
        "SLACKROLL_SLACK_OAUTH_SCOPE",
        "SLACKROLL_SLACK_BOT_USERNAME",
        "SLACKROLL_SLACK_BOT_ICON_EMOJI",
        "SLACKROLL_SERVER_BIND_ADDRESS",
        "SLACKROLL_SERVER_PORT",
        "SLACKROLL_SERVER_BASE_URL",
        "SLACKROLL_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "SLACKROLL_ROLL_APP_NAME",
        "SLACKROLL_ROLL_ALLOWED_COMMANDS",
        "SLACKROLL_LOGGING_LEVEL",
        "SLACKROLL_LOGGING_FORMAT",
        "SLACKROLL_LOG_LEVEL",
        "SLACKROLL_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
