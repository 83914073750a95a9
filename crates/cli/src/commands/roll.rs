use slackroll_core::{evaluate_roll, RngDieSource, RollContext, RollResponse};

use crate::commands::CommandResult;

/// Evaluates `expression` locally without touching Slack or the database.
///
/// Configuration is optional here: when it loads, its app name and first
/// allowed command shape the usage text, otherwise the built-in defaults do.
pub fn run(expression: &str, user_name: &str, seed: Option<u64>) -> CommandResult {
    let config = super::load_config("roll").ok();
    let app_name = config.as_ref().map(|config| config.roll.app_name.as_str());
    let command = config
        .as_ref()
        .and_then(|config| config.roll.allowed_commands.first())
        .map(String::as_str);

    let mut context = RollContext::default();
    if let Some(app_name) = app_name {
        context.app_name = app_name;
    }
    if let Some(command) = command {
        context.command = command;
    }

    let mut source = match seed {
        Some(seed) => RngDieSource::seeded(seed),
        None => RngDieSource::from_entropy(),
    };

    match evaluate_roll(expression, user_name, &context, &mut source) {
        Ok(RollResponse::Rolled(message)) => CommandResult::success("roll", message.text),
        Ok(RollResponse::Usage(text)) => CommandResult::success("roll", text),
        Err(error) => CommandResult::failure("roll", "invalid_roll", error.user_message(), 2),
    }
}
