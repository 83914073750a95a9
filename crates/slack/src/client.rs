use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::blocks::{Block, MessageTemplate};

pub const DEFAULT_API_BASE_URL: &str = "https://slack.com/api";
pub const AUTHORIZE_URL: &str = "https://slack.com/oauth/v2/authorize";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SlackApiError {
    #[error("slack request failed: {0}")]
    Transport(String),
    #[error("slack returned HTTP {status}")]
    Http { status: u16 },
    #[error("slack API error: {0}")]
    Api(String),
    #[error("unexpected slack response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for SlackApiError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::Decode(error.to_string())
        } else {
            Self::Transport(error.to_string())
        }
    }
}

/// Body of a `chat.postMessage` call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PostMessage {
    pub channel: String,
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<Block>,
    pub username: String,
    pub icon_emoji: String,
}

impl PostMessage {
    pub fn from_template(
        channel: impl Into<String>,
        template: MessageTemplate,
        username: impl Into<String>,
        icon_emoji: impl Into<String>,
    ) -> Self {
        Self {
            channel: channel.into(),
            text: template.fallback_text,
            blocks: template.blocks,
            username: username.into(),
            icon_emoji: icon_emoji.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OAuthAccessRequest {
    pub client_id: String,
    pub client_secret: String,
    pub code: String,
    pub redirect_uri: String,
}

/// Bot installation returned by `oauth.v2.access`.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthAccess {
    pub access_token: String,
    pub scope: Option<String>,
    pub team_id: String,
    pub team_name: Option<String>,
}

impl std::fmt::Debug for OAuthAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthAccess")
            .field("access_token", &slackroll_core::redact_token(&self.access_token))
            .field("scope", &self.scope)
            .field("team_id", &self.team_id)
            .field("team_name", &self.team_name)
            .finish()
    }
}

#[async_trait]
pub trait SlackApi: Send + Sync {
    async fn post_message(&self, token: &str, message: &PostMessage) -> Result<(), SlackApiError>;

    async fn oauth_access(&self, request: &OAuthAccessRequest)
        -> Result<OAuthAccess, SlackApiError>;
}

/// `SlackApi` over the Slack Web API.
#[derive(Clone)]
pub struct SlackWebClient {
    http: Client,
    base_url: String,
}

impl SlackWebClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, SlackApiError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|error| SlackApiError::Transport(error.to_string()))?;
        Ok(Self::with_client(http, base_url))
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        Self { http, base_url: base_url.into().trim_end_matches('/').to_owned() }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{method}", self.base_url)
    }
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OAuthAccessResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    team: Option<OAuthTeam>,
}

#[derive(Debug, Deserialize)]
struct OAuthTeam {
    id: String,
    #[serde(default)]
    name: Option<String>,
}

fn api_error(error: Option<String>) -> SlackApiError {
    SlackApiError::Api(error.unwrap_or_else(|| "unknown_error".to_owned()))
}

#[async_trait]
impl SlackApi for SlackWebClient {
    async fn post_message(&self, token: &str, message: &PostMessage) -> Result<(), SlackApiError> {
        let response = self
            .http
            .post(self.method_url("chat.postMessage"))
            .bearer_auth(token)
            .json(message)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SlackApiError::Http { status: response.status().as_u16() });
        }

        let envelope: ApiEnvelope = response.json().await?;
        if !envelope.ok {
            return Err(api_error(envelope.error));
        }
        Ok(())
    }

    async fn oauth_access(
        &self,
        request: &OAuthAccessRequest,
    ) -> Result<OAuthAccess, SlackApiError> {
        let response = self
            .http
            .post(self.method_url("oauth.v2.access"))
            .form(&[
                ("client_id", request.client_id.as_str()),
                ("client_secret", request.client_secret.as_str()),
                ("code", request.code.as_str()),
                ("redirect_uri", request.redirect_uri.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SlackApiError::Http { status: response.status().as_u16() });
        }

        let body: OAuthAccessResponse = response.json().await?;
        parse_oauth_access(body)
    }
}

fn parse_oauth_access(body: OAuthAccessResponse) -> Result<OAuthAccess, SlackApiError> {
    if !body.ok {
        return Err(api_error(body.error));
    }
    let access_token = body
        .access_token
        .filter(|token| !token.is_empty())
        .ok_or_else(|| SlackApiError::Decode("missing access_token".to_owned()))?;
    let team = body.team.ok_or_else(|| SlackApiError::Decode("missing team".to_owned()))?;

    Ok(OAuthAccess { access_token, scope: body.scope, team_id: team.id, team_name: team.name })
}

/// Slack's consent screen URL for a bot install.
pub fn authorize_redirect_url(
    client_id: &str,
    scope: &str,
    redirect_uri: &str,
    state: &str,
) -> String {
    format!(
        "{AUTHORIZE_URL}?client_id={}&scope={}&redirect_uri={}&state={}",
        encode_query(client_id),
        encode_query(scope),
        encode_query(redirect_uri),
        encode_query(state),
    )
}

pub fn encode_query(value: &str) -> String {
    value
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{b:02X}"),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{
        authorize_redirect_url, encode_query, parse_oauth_access, OAuthAccess,
        OAuthAccessResponse, OAuthTeam, PostMessage, SlackApiError,
    };
    use crate::blocks::roll_message;

    #[test]
    fn authorize_url_encodes_every_parameter() {
        let url = authorize_redirect_url(
            "123.456",
            "commands,chat:write",
            "https://dice.example.com/validate",
            "abc",
        );

        assert_eq!(
            url,
            "https://slack.com/oauth/v2/authorize?client_id=123.456\
             &scope=commands%2Cchat%3Awrite\
             &redirect_uri=https%3A%2F%2Fdice.example.com%2Fvalidate&state=abc"
        );
        assert_eq!(encode_query("a b"), "a%20b");
    }

    #[test]
    fn post_message_serializes_bot_identity() {
        let message = PostMessage::from_template("C1", roll_message("hi"), "Roll Bot", ":game_die:");
        let json = serde_json::to_value(&message).expect("serialize");

        assert_eq!(json["channel"], "C1");
        assert_eq!(json["text"], "hi");
        assert_eq!(json["username"], "Roll Bot");
        assert_eq!(json["icon_emoji"], ":game_die:");
        assert_eq!(json["blocks"][0]["type"], "section");
    }

    #[test]
    fn oauth_response_maps_team_and_token() {
        let access = parse_oauth_access(OAuthAccessResponse {
            ok: true,
            error: None,
            access_token: Some("xoxb-123".to_owned()),
            scope: Some("commands,chat:write".to_owned()),
            team: Some(OAuthTeam { id: "T1".to_owned(), name: Some("Guild".to_owned()) }),
        })
        .expect("parse");

        assert_eq!(
            access,
            OAuthAccess {
                access_token: "xoxb-123".to_owned(),
                scope: Some("commands,chat:write".to_owned()),
                team_id: "T1".to_owned(),
                team_name: Some("Guild".to_owned()),
            }
        );
        assert!(!format!("{access:?}").contains("xoxb-123"));
    }

    #[test]
    fn oauth_error_is_surfaced() {
        let error = parse_oauth_access(OAuthAccessResponse {
            ok: false,
            error: Some("invalid_code".to_owned()),
            access_token: None,
            scope: None,
            team: None,
        })
        .expect_err("must fail");

        assert_eq!(error, SlackApiError::Api("invalid_code".to_owned()));
        assert_eq!(error.to_string(), "slack API error: invalid_code");
    }

    #[test]
    fn oauth_success_without_token_is_decode_error() {
        let error = parse_oauth_access(OAuthAccessResponse {
            ok: true,
            error: None,
            access_token: None,
            scope: None,
            team: Some(OAuthTeam { id: "T1".to_owned(), name: None }),
        })
        .expect_err("must fail");

        assert!(matches!(error, SlackApiError::Decode(_)));
    }
}
