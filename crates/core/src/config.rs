use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::roll::{DEFAULT_APP_NAME, DEFAULT_COMMAND};

pub const DEFAULT_ALLOWED_COMMANDS: &[&str] =
    &[DEFAULT_COMMAND, "/rolldice", "/diceroll", "/roll_dice", "/dice_roll"];

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub slack: SlackConfig,
    pub server: ServerConfig,
    pub roll: RollConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct SlackConfig {
    pub client_id: String,
    pub client_secret: SecretString,
    pub signing_secret: Option<SecretString>,
    pub api_base_url: String,
    pub oauth_scope: String,
    pub bot_username: String,
    pub bot_icon_emoji: String,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub base_url: String,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct RollConfig {
    pub app_name: String,
    pub allowed_commands: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub slack_client_id: Option<String>,
    pub slack_client_secret: Option<String>,
    pub slack_signing_secret: Option<String>,
    pub slack_api_base_url: Option<String>,
    pub server_port: Option<u16>,
    pub server_base_url: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://slackroll.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            slack: SlackConfig {
                client_id: String::new(),
                client_secret: String::new().into(),
                signing_secret: None,
                api_base_url: "https://slack.com/api".to_string(),
                oauth_scope: "commands,chat:write".to_string(),
                bot_username: "Roll Bot".to_string(),
                bot_icon_emoji: ":game_die:".to_string(),
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                base_url: "http://127.0.0.1:8080".to_string(),
                graceful_shutdown_secs: 15,
            },
            roll: RollConfig {
                app_name: DEFAULT_APP_NAME.to_string(),
                allowed_commands: DEFAULT_ALLOWED_COMMANDS
                    .iter()
                    .map(|command| command.to_string())
                    .collect(),
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl ServerConfig {
    /// Absolute URL for a path served by this deployment.
    pub fn public_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    pub fn authorize_url(&self) -> String {
        self.public_url("authenticate")
    }

    pub fn oauth_redirect_url(&self) -> String {
        self.public_url("validate")
    }

    pub fn confirm_url(&self) -> String {
        self.public_url("confirm")
    }
}

impl RollConfig {
    pub fn is_allowed(&self, command: &str) -> bool {
        let command = command.trim();
        self.allowed_commands.iter().any(|allowed| allowed.eq_ignore_ascii_case(command))
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("slackroll.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(slack) = patch.slack {
            if let Some(client_id) = slack.client_id {
                self.slack.client_id = client_id;
            }
            if let Some(client_secret_value) = slack.client_secret {
                self.slack.client_secret = secret_value(client_secret_value);
            }
            if let Some(signing_secret_value) = slack.signing_secret {
                self.slack.signing_secret = Some(secret_value(signing_secret_value));
            }
            if let Some(api_base_url) = slack.api_base_url {
                self.slack.api_base_url = api_base_url;
            }
            if let Some(oauth_scope) = slack.oauth_scope {
                self.slack.oauth_scope = oauth_scope;
            }
            if let Some(bot_username) = slack.bot_username {
                self.slack.bot_username = bot_username;
            }
            if let Some(bot_icon_emoji) = slack.bot_icon_emoji {
                self.slack.bot_icon_emoji = bot_icon_emoji;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(base_url) = server.base_url {
                self.server.base_url = base_url;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(roll) = patch.roll {
            if let Some(app_name) = roll.app_name {
                self.roll.app_name = app_name;
            }
            if let Some(allowed_commands) = roll.allowed_commands {
                self.roll.allowed_commands = allowed_commands;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("SLACKROLL_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("SLACKROLL_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_env("SLACKROLL_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("SLACKROLL_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_env("SLACKROLL_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("SLACKROLL_SLACK_CLIENT_ID") {
            self.slack.client_id = value;
        }
        if let Some(value) = read_env("SLACKROLL_SLACK_CLIENT_SECRET") {
            self.slack.client_secret = secret_value(value);
        }
        if let Some(value) = read_env("SLACKROLL_SLACK_SIGNING_SECRET") {
            self.slack.signing_secret = Some(secret_value(value));
        }
        if let Some(value) = read_env("SLACKROLL_SLACK_API_BASE_URL") {
            self.slack.api_base_url = value;
        }
        if let Some(value) = read_env("SLACKROLL_SLACK_OAUTH_SCOPE") {
            self.slack.oauth_scope = value;
        }
        if let Some(value) = read_env("SLACKROLL_SLACK_BOT_USERNAME") {
            self.slack.bot_username = value;
        }
        if let Some(value) = read_env("SLACKROLL_SLACK_BOT_ICON_EMOJI") {
            self.slack.bot_icon_emoji = value;
        }

        if let Some(value) = read_env("SLACKROLL_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("SLACKROLL_SERVER_PORT") {
            self.server.port = parse_env("SLACKROLL_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("SLACKROLL_SERVER_BASE_URL") {
            self.server.base_url = value;
        }
        if let Some(value) = read_env("SLACKROLL_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_env("SLACKROLL_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("SLACKROLL_ROLL_APP_NAME") {
            self.roll.app_name = value;
        }
        if let Some(value) = read_env("SLACKROLL_ROLL_ALLOWED_COMMANDS") {
            self.roll.allowed_commands = parse_list(&value);
        }

        let log_level =
            read_env("SLACKROLL_LOGGING_LEVEL").or_else(|| read_env("SLACKROLL_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("SLACKROLL_LOGGING_FORMAT").or_else(|| read_env("SLACKROLL_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(client_id) = overrides.slack_client_id {
            self.slack.client_id = client_id;
        }
        if let Some(client_secret) = overrides.slack_client_secret {
            self.slack.client_secret = secret_value(client_secret);
        }
        if let Some(signing_secret) = overrides.slack_signing_secret {
            self.slack.signing_secret = Some(secret_value(signing_secret));
        }
        if let Some(api_base_url) = overrides.slack_api_base_url {
            self.slack.api_base_url = api_base_url;
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
        if let Some(base_url) = overrides.server_base_url {
            self.server.base_url = base_url;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_slack(&self.slack)?;
        validate_server(&self.server)?;
        validate_roll(&self.roll)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("slackroll.toml"), PathBuf::from("config/slackroll.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

static INTERPOLATION: OnceLock<Regex> = OnceLock::new();

fn interpolation_regex() -> &'static Regex {
    INTERPOLATION
        .get_or_init(|| Regex::new(r"\$\{([^}]*)\}").expect("interpolation pattern compiles"))
}

/// Replaces `${VAR}` with the value of `VAR`. A `${` with no closing brace is rejected.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut last = 0;
    for captures in interpolation_regex().captures_iter(input) {
        let (Some(whole), Some(var)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        let value = env::var(var.as_str())
            .map_err(|_| ConfigError::MissingEnvInterpolation { var: var.as_str().to_string() })?;
        output.push_str(&input[last..whole.start()]);
        output.push_str(&value);
        last = whole.end();
    }

    let tail = &input[last..];
    if tail.contains("${") {
        return Err(ConfigError::UnterminatedInterpolation);
    }
    output.push_str(tail);

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_slack(slack: &SlackConfig) -> Result<(), ConfigError> {
    if slack.client_id.trim().is_empty() {
        return Err(ConfigError::Validation(
            "slack.client_id is required. Get it from https://api.slack.com/apps > Your App > Basic Information > App Credentials".to_string(),
        ));
    }

    if slack.client_secret.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "slack.client_secret is required. Get it from https://api.slack.com/apps > Your App > Basic Information > App Credentials".to_string(),
        ));
    }

    if let Some(signing_secret) = &slack.signing_secret {
        if signing_secret.expose_secret().trim().is_empty() {
            return Err(ConfigError::Validation(
                "slack.signing_secret must not be blank when set".to_string(),
            ));
        }
    }

    if !is_http_url(&slack.api_base_url) {
        return Err(ConfigError::Validation(
            "slack.api_base_url must start with http:// or https://".to_string(),
        ));
    }

    if slack.oauth_scope.trim().is_empty() {
        return Err(ConfigError::Validation(
            "slack.oauth_scope must list at least one scope (e.g. `commands,chat:write`)"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if !is_http_url(&server.base_url) {
        return Err(ConfigError::Validation(
            "server.base_url must start with http:// or https://".to_string(),
        ));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_roll(roll: &RollConfig) -> Result<(), ConfigError> {
    if roll.app_name.trim().is_empty() {
        return Err(ConfigError::Validation("roll.app_name must not be empty".to_string()));
    }

    if roll.allowed_commands.is_empty() {
        return Err(ConfigError::Validation(
            "roll.allowed_commands must contain at least one slash command".to_string(),
        ));
    }

    if let Some(bad) = roll.allowed_commands.iter().find(|command| {
        let command = command.trim();
        command.len() < 2 || !command.starts_with('/') || command.contains(char::is_whitespace)
    }) {
        return Err(ConfigError::Validation(format!(
            "roll.allowed_commands entry `{bad}` must look like `/roll`"
        )));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn is_http_url(value: &str) -> bool {
    let value = value.trim();
    value.starts_with("http://") || value.starts_with("https://")
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    slack: Option<SlackPatch>,
    server: Option<ServerPatch>,
    roll: Option<RollPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct SlackPatch {
    client_id: Option<String>,
    client_secret: Option<String>,
    signing_secret: Option<String>,
    api_base_url: Option<String>,
    oauth_scope: Option<String>,
    bot_username: Option<String>,
    bot_icon_emoji: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    base_url: Option<String>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RollPatch {
    app_name: Option<String>,
    allowed_commands: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
