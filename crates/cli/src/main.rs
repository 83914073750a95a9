use std::process::ExitCode;

fn main() -> ExitCode {
    slackroll_cli::run()
}
