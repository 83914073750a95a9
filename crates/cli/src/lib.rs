pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "slackroll",
    about = "Slack dice roller operator CLI",
    long_about = "Apply migrations, inspect configuration, check readiness, list installed teams, \
                  and try out roll expressions locally.",
    after_help = "Examples:\n  slackroll doctor --json\n  slackroll config\n  slackroll roll 4d10+2"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, Slack credentials, and DB connectivity checks")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Evaluate a roll expression the same way the slash command does")]
    Roll {
        #[arg(help = "Roll expression such as `d20`, `4d10` or `1d6+3`; omit for 1d6")]
        expression: Option<String>,
        #[arg(long, default_value = "you", help = "Name shown in the rendered message")]
        user: String,
        #[arg(long, help = "Seed the die source for a reproducible result")]
        seed: Option<u64>,
    },
    #[command(about = "List teams that completed the install flow")]
    Teams,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Roll { expression, user, seed } => {
            commands::roll::run(expression.as_deref().unwrap_or_default(), &user, seed)
        }
        Command::Teams => commands::teams::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
