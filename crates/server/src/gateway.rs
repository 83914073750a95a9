//! Slash command endpoint (`POST /`).

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Form,
};
use chrono::Utc;
use secrecy::ExposeSecret;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use slackroll_core::domain::team::TeamId;
use slackroll_core::errors::ApplicationError;
use slackroll_core::roll::RngDieSource;
use slackroll_db::RepositoryError;
use slackroll_slack::blocks::authorize_prompt;
use slackroll_slack::client::PostMessage;
use slackroll_slack::commands::{
    normalize_roll_command, plan_roll, RollCommandOutcome, SlashCommandPayload,
};
use slackroll_slack::signature::{self, SignatureError, SIGNATURE_HEADER, TIMESTAMP_HEADER};

use crate::state::AppState;

/// Slack caps slash command payloads well below this.
const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("request signature rejected: {0}")]
    Signature(#[from] SignatureError),
    #[error("request body could not be read")]
    UnreadableBody,
    #[error("team lookup failed: {0}")]
    Repository(#[from] RepositoryError),
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match self {
            Self::Signature(error) => {
                warn!(
                    event_name = "server.gateway.signature_rejected",
                    error = %error,
                    "rejected request with bad signature"
                );
                (StatusCode::UNAUTHORIZED, "invalid request signature").into_response()
            }
            Self::UnreadableBody => {
                (StatusCode::BAD_REQUEST, "request body could not be read").into_response()
            }
            Self::Repository(error) => {
                let correlation_id = Uuid::new_v4().to_string();
                let interface = ApplicationError::Persistence(error.to_string())
                    .into_interface(correlation_id.as_str());
                warn!(
                    event_name = "server.gateway.repository_error",
                    correlation_id = %correlation_id,
                    error = %interface,
                    "team lookup failed"
                );
                (StatusCode::SERVICE_UNAVAILABLE, interface.user_message()).into_response()
            }
        }
    }
}

/// Verifies `X-Slack-Signature` on POST requests when a signing secret is configured.
pub async fn verify_signature(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    let Some(secret) = state.config.slack.signing_secret.as_ref() else {
        return Ok(next.run(request).await);
    };
    if request.method() != Method::POST {
        return Ok(next.run(request).await);
    }

    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, MAX_BODY_BYTES).await.map_err(|_| GatewayError::UnreadableBody)?;
    let timestamp = parts.headers.get(TIMESTAMP_HEADER).and_then(|value| value.to_str().ok());
    let signed = parts.headers.get(SIGNATURE_HEADER).and_then(|value| value.to_str().ok());

    signature::verify(secret.expose_secret(), timestamp, signed, &bytes, Utc::now().timestamp())?;

    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}

pub async fn slash_command(
    State(state): State<AppState>,
    Form(payload): Form<SlashCommandPayload>,
) -> Result<Response, GatewayError> {
    let request_id = Uuid::new_v4().to_string();
    let config = &state.config;

    let envelope =
        match normalize_roll_command(payload, &config.roll, request_id.as_str()) {
            Ok(envelope) => envelope,
            Err(error) => {
                info!(
                    event_name = "server.gateway.command_rejected",
                    correlation_id = %request_id,
                    error = %error,
                    "slash command rejected"
                );
                return Ok(reply(error.to_string()));
            }
        };

    let Some(team) = state.teams.find_by_id(&TeamId(envelope.team_id.clone())).await? else {
        info!(
            event_name = "server.gateway.team_not_authorized",
            correlation_id = %request_id,
            team_id = %envelope.team_id,
            "team has no stored token"
        );
        return Ok(reply(authorize_prompt(&config.roll.app_name, &config.server.authorize_url())));
    };

    let outcome = {
        let mut source = RngDieSource::from_entropy();
        plan_roll(&envelope, &config.roll.app_name, &mut source)
    };

    let template = match outcome {
        RollCommandOutcome::Reply(text) => return Ok(reply(text)),
        RollCommandOutcome::Post(template) => template,
    };

    let message = PostMessage::from_template(
        envelope.channel_id.as_str(),
        template,
        config.slack.bot_username.as_str(),
        config.slack.bot_icon_emoji.as_str(),
    );

    match state.slack.post_message(&team.access_token, &message).await {
        Ok(()) => {
            info!(
                event_name = "server.gateway.roll_posted",
                correlation_id = %request_id,
                team_id = %envelope.team_id,
                channel_id = %envelope.channel_id,
                "roll posted to channel"
            );
            Ok(StatusCode::NO_CONTENT.into_response())
        }
        Err(error) => {
            warn!(
                event_name = "server.gateway.post_failed",
                correlation_id = %request_id,
                team_id = %envelope.team_id,
                error = %error,
                "chat.postMessage failed"
            );
            Ok(reply(error.to_string()))
        }
    }
}

/// Private answer to the requester, delivered as the HTTP body.
fn reply(text: String) -> Response {
    (StatusCode::OK, text).into_response()
}
