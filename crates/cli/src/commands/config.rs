use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use slackroll_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let fields = vec![
        field("database.url", config.database.url.clone(), &["SLACKROLL_DATABASE_URL"]),
        field(
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["SLACKROLL_DATABASE_MAX_CONNECTIONS"],
        ),
        field(
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["SLACKROLL_DATABASE_TIMEOUT_SECS"],
        ),
        field("slack.client_id", config.slack.client_id.clone(), &["SLACKROLL_SLACK_CLIENT_ID"]),
        field(
            "slack.client_secret",
            redact_secret(Some(&config.slack.client_secret)),
            &["SLACKROLL_SLACK_CLIENT_SECRET"],
        ),
        field(
            "slack.signing_secret",
            redact_secret(config.slack.signing_secret.as_ref()),
            &["SLACKROLL_SLACK_SIGNING_SECRET"],
        ),
        field(
            "slack.api_base_url",
            config.slack.api_base_url.clone(),
            &["SLACKROLL_SLACK_API_BASE_URL"],
        ),
        field("slack.oauth_scope", config.slack.oauth_scope.clone(), &["SLACKROLL_SLACK_OAUTH_SCOPE"]),
        field(
            "slack.bot_username",
            config.slack.bot_username.clone(),
            &["SLACKROLL_SLACK_BOT_USERNAME"],
        ),
        field(
            "slack.bot_icon_emoji",
            config.slack.bot_icon_emoji.clone(),
            &["SLACKROLL_SLACK_BOT_ICON_EMOJI"],
        ),
        field(
            "server.bind_address",
            config.server.bind_address.clone(),
            &["SLACKROLL_SERVER_BIND_ADDRESS"],
        ),
        field("server.port", config.server.port.to_string(), &["SLACKROLL_SERVER_PORT"]),
        field("server.base_url", config.server.base_url.clone(), &["SLACKROLL_SERVER_BASE_URL"]),
        field(
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            &["SLACKROLL_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        field("roll.app_name", config.roll.app_name.clone(), &["SLACKROLL_ROLL_APP_NAME"]),
        field(
            "roll.allowed_commands",
            config.roll.allowed_commands.join(","),
            &["SLACKROLL_ROLL_ALLOWED_COMMANDS"],
        ),
        field(
            "logging.level",
            config.logging.level.clone(),
            &["SLACKROLL_LOGGING_LEVEL", "SLACKROLL_LOG_LEVEL"],
        ),
        field(
            "logging.format",
            format!("{:?}", config.logging.format),
            &["SLACKROLL_LOGGING_FORMAT", "SLACKROLL_LOG_FORMAT"],
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for ConfigField { key, value, env_keys } in fields {
        let source = field_source(
            key,
            env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(key, &value, source));
    }
    lines.push(format!("- derived oauth redirect = {}", config.server.oauth_redirect_url()));

    lines.join("\n")
}

struct ConfigField {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

fn field(key: &'static str, value: String, env_keys: &'static [&'static str]) -> ConfigField {
    ConfigField { key, value, env_keys }
}

fn detect_config_path() -> Option<PathBuf> {
    ["slackroll.toml", "config/slackroll.toml"]
        .into_iter()
        .map(PathBuf::from)
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_secret(secret: Option<&SecretString>) -> String {
    match secret.map(|secret| secret.expose_secret().trim()) {
        None | Some("") => "<unset>".to_string(),
        Some(_) => "<redacted>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;
    use toml::Value;

    use super::{contains_path, field_source, redact_secret};

    #[test]
    fn secrets_never_render_in_clear() {
        let secret = SecretString::from("shhh-very-secret".to_string());

        assert_eq!(redact_secret(Some(&secret)), "<redacted>");
        assert_eq!(redact_secret(None), "<unset>");
    }

    #[test]
    fn nested_keys_resolve_against_file() {
        let doc: Value = "[slack]\nclient_id = \"1.2\"\n".parse().expect("valid toml");

        assert!(contains_path(&doc, "slack.client_id"));
        assert!(!contains_path(&doc, "slack.client_secret"));
        assert_eq!(
            field_source("slack.client_id", &["SLACKROLL_TEST_NEVER_SET"], Some(&doc), None),
            "file (config file)"
        );
        assert_eq!(field_source("server.port", &[], Some(&doc), None), "default");
    }
}
