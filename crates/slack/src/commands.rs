use serde::Deserialize;
use thiserror::Error;

use slackroll_core::config::RollConfig;
use slackroll_core::roll::{evaluate_roll, DieSource, RollContext, RollResponse};

use crate::blocks::{self, MessageTemplate};

/// Form fields Slack sends with every slash command invocation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SlashCommandPayload {
    pub command: String,
    pub text: String,
    pub team_id: String,
    pub team_domain: String,
    pub channel_id: String,
    pub channel_name: String,
    pub user_id: String,
    pub user_name: String,
    pub response_url: String,
    pub trigger_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandEnvelope {
    pub command: String,
    pub text: String,
    pub team_id: String,
    pub channel_id: String,
    pub user_id: String,
    pub user_name: String,
    pub request_id: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("\"{0}\" is not an allowed command")]
    UnsupportedCommand(String),
    #[error("slash command payload is missing `{0}`")]
    MissingField(&'static str),
}

/// What the gateway should do with a command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RollCommandOutcome {
    /// Post to the originating channel as the bot.
    Post(MessageTemplate),
    /// Answer only the requester, in the HTTP response body.
    Reply(String),
}

pub fn normalize_roll_command(
    payload: SlashCommandPayload,
    roll: &RollConfig,
    request_id: impl Into<String>,
) -> Result<CommandEnvelope, CommandParseError> {
    let command = payload.command.trim().to_ascii_lowercase();
    if !roll.is_allowed(&command) {
        return Err(CommandParseError::UnsupportedCommand(payload.command));
    }

    let team_id = payload.team_id.trim().to_owned();
    if team_id.is_empty() {
        return Err(CommandParseError::MissingField("team_id"));
    }
    let channel_id = payload.channel_id.trim().to_owned();
    if channel_id.is_empty() {
        return Err(CommandParseError::MissingField("channel_id"));
    }

    let user_name = if payload.user_name.trim().is_empty() {
        payload.user_id.clone()
    } else {
        payload.user_name.trim().to_owned()
    };

    Ok(CommandEnvelope {
        command,
        text: payload.text,
        team_id,
        channel_id,
        user_id: payload.user_id,
        user_name,
        request_id: request_id.into(),
    })
}

/// Runs the roll pipeline for an authorized command.
pub fn plan_roll(
    envelope: &CommandEnvelope,
    app_name: &str,
    source: &mut dyn DieSource,
) -> RollCommandOutcome {
    let context = RollContext { app_name, command: &envelope.command };

    match evaluate_roll(&envelope.text, &envelope.user_name, &context, source) {
        Ok(RollResponse::Rolled(message)) => {
            tracing::info!(
                event_name = "slack.command.rolled",
                correlation_id = %envelope.request_id,
                team_id = %envelope.team_id,
                count = message.request.count,
                sides = message.request.sides,
                total = message.outcome.final_sum,
                "roll evaluated"
            );
            RollCommandOutcome::Post(blocks::roll_message(&message.text))
        }
        Ok(RollResponse::Usage(text)) => {
            tracing::debug!(
                event_name = "slack.command.usage",
                correlation_id = %envelope.request_id,
                command = %envelope.command,
                "usage requested"
            );
            RollCommandOutcome::Reply(text)
        }
        Err(error) => {
            tracing::info!(
                event_name = "slack.command.rejected",
                correlation_id = %envelope.request_id,
                team_id = %envelope.team_id,
                error = %error,
                "roll expression rejected"
            );
            RollCommandOutcome::Reply(error.user_message())
        }
    }
}

#[cfg(test)]
mod tests {
    use slackroll_core::config::RollConfig;
    use slackroll_core::roll::FixedDieSource;

    use super::{
        normalize_roll_command, plan_roll, CommandEnvelope, CommandParseError,
        RollCommandOutcome, SlashCommandPayload,
    };

    fn allowed() -> RollConfig {
        RollConfig {
            app_name: "EM Slack Roll".to_owned(),
            allowed_commands: ["/roll", "/rolldice"].iter().map(|c| c.to_string()).collect(),
        }
    }

    fn payload(command: &str, text: &str) -> SlashCommandPayload {
        SlashCommandPayload {
            command: command.to_owned(),
            text: text.to_owned(),
            team_id: "T1".to_owned(),
            channel_id: "C1".to_owned(),
            user_id: "U1".to_owned(),
            user_name: "alice".to_owned(),
            ..SlashCommandPayload::default()
        }
    }

    fn envelope(command: &str, text: &str) -> CommandEnvelope {
        normalize_roll_command(payload(command, text), &allowed(), "req-1").expect("allowed")
    }

    #[test]
    fn normalizes_allowed_command() {
        let envelope = envelope(" /RollDice ", "2d8");

        assert_eq!(envelope.command, "/rolldice");
        assert_eq!(envelope.text, "2d8");
        assert_eq!(envelope.team_id, "T1");
        assert_eq!(envelope.request_id, "req-1");
    }

    #[test]
    fn rejects_command_outside_allow_list() {
        let error = normalize_roll_command(payload("/flip", ""), &allowed(), "req-2")
            .expect_err("must reject");

        assert_eq!(error, CommandParseError::UnsupportedCommand("/flip".to_owned()));
        assert_eq!(error.to_string(), "\"/flip\" is not an allowed command");
    }

    #[test]
    fn requires_team_and_channel() {
        let mut missing_team = payload("/roll", "");
        missing_team.team_id.clear();
        assert_eq!(
            normalize_roll_command(missing_team, &allowed(), "r"),
            Err(CommandParseError::MissingField("team_id"))
        );

        let mut missing_channel = payload("/roll", "");
        missing_channel.channel_id = "  ".to_owned();
        assert_eq!(
            normalize_roll_command(missing_channel, &allowed(), "r"),
            Err(CommandParseError::MissingField("channel_id"))
        );
    }

    #[test]
    fn blank_user_name_falls_back_to_user_id() {
        let mut anonymous = payload("/roll", "");
        anonymous.user_name.clear();
        let envelope = normalize_roll_command(anonymous, &allowed(), "r").expect("allowed");
        assert_eq!(envelope.user_name, "U1");
    }

    #[test]
    fn roll_becomes_channel_post() {
        let outcome = plan_roll(&envelope("/roll", "3d6+2"), "EM Slack Roll", &mut FixedDieSource(4));

        let RollCommandOutcome::Post(message) = outcome else {
            panic!("expected a channel post");
        };
        assert_eq!(message.fallback_text, "_alice rolled 3 6-sided dice:_  *14* (4, 4, 4)  + 2");
    }

    #[test]
    fn help_uses_invoked_command_name() {
        let outcome = plan_roll(&envelope("/rolldice", "help"), "Tavern Dice", &mut FixedDieSource(1));

        let RollCommandOutcome::Reply(text) = outcome else {
            panic!("expected a private reply");
        };
        assert!(text.starts_with("*Tavern Dice* can roll"));
        assert!(text.contains("`/rolldice d20`"));
    }

    #[test]
    fn parse_errors_are_private_replies() {
        let outcome = plan_roll(&envelope("/roll", "xyz"), "EM Slack Roll", &mut FixedDieSource(1));
        assert_eq!(
            outcome,
            RollCommandOutcome::Reply("'xyz' is not a recognized roll format".to_owned())
        );
    }

    #[test]
    fn payload_decodes_with_missing_optional_fields() {
        let payload: SlashCommandPayload = serde_json::from_value(serde_json::json!({
            "command": "/roll",
            "team_id": "T1",
        }))
        .expect("decode");
        assert_eq!(payload.text, "");
        assert_eq!(payload.channel_name, "");
    }
}
