//! Dice roll pipeline for slash commands.
//!
//! A raw command text goes through three pure steps:
//!
//! ```text
//! "3d6+2" → grammar::parse_roll → RollRequest
//!         → evaluator::evaluate  → RollOutcome
//!         → format::format_roll  → "_alice rolled 3 6-sided dice:_  *14* (4, 4, 4)  + 2"
//! ```
//!
//! [`evaluate_roll`] runs the whole pipeline. It holds no state between calls;
//! the only external input is the caller-supplied [`DieSource`].

pub mod evaluator;
pub mod format;
pub mod grammar;
pub mod usage;

use thiserror::Error;

pub use evaluator::{evaluate, DieSource, FixedDieSource, RngDieSource};
pub use format::format_roll;
pub use grammar::{parse_roll, ParsedCommand};
pub use usage::usage_message;

pub const MIN_DICE: u32 = 1;
pub const MAX_DICE: u32 = 100;
pub const MIN_SIDES: u32 = 4;
pub const MAX_SIDES: u32 = 100;

/// Expression used when the command text is empty.
pub const DEFAULT_ROLL: &str = "d6";
pub const HELP_KEYWORD: &str = "help";

pub const DEFAULT_APP_NAME: &str = "EM Slack Roll";
pub const DEFAULT_COMMAND: &str = "/roll";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModifierSign {
    Plus,
    Minus,
}

impl ModifierSign {
    pub fn as_char(self) -> char {
        match self {
            Self::Plus => '+',
            Self::Minus => '-',
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Modifier {
    pub sign: ModifierSign,
    pub value: u32,
}

impl Modifier {
    pub fn apply(self, sum: i64) -> i64 {
        match self.sign {
            ModifierSign::Plus => sum + i64::from(self.value),
            ModifierSign::Minus => sum - i64::from(self.value),
        }
    }
}

/// A validated roll. `count` and `sides` are always inside their ranges.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RollRequest {
    pub count: u32,
    pub sides: u32,
    pub modifier: Option<Modifier>,
}

impl RollRequest {
    pub fn new(count: u32, sides: u32, modifier: Option<Modifier>) -> Self {
        Self {
            count: count.clamp(MIN_DICE, MAX_DICE),
            sides: sides.clamp(MIN_SIDES, MAX_SIDES),
            modifier,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RollOutcome {
    pub dice: Vec<u32>,
    pub raw_sum: i64,
    pub final_sum: i64,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RollError {
    #[error("'{input}' is not a recognized roll format")]
    InvalidFormat { input: String },
    #[error("'{input}' has a modifier sign without a value")]
    MalformedModifier { input: String },
}

impl RollError {
    /// Text shown to the user who issued the command.
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

/// Names used when rendering the usage text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RollContext<'a> {
    pub app_name: &'a str,
    pub command: &'a str,
}

impl Default for RollContext<'_> {
    fn default() -> Self {
        Self { app_name: DEFAULT_APP_NAME, command: DEFAULT_COMMAND }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RolledMessage {
    pub request: RollRequest,
    pub outcome: RollOutcome,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RollResponse {
    Rolled(RolledMessage),
    Usage(String),
}

impl RollResponse {
    pub fn text(&self) -> &str {
        match self {
            Self::Rolled(message) => &message.text,
            Self::Usage(text) => text,
        }
    }
}

pub fn evaluate_roll(
    expression: &str,
    user_name: &str,
    context: &RollContext<'_>,
    source: &mut dyn DieSource,
) -> Result<RollResponse, RollError> {
    match parse_roll(expression)? {
        ParsedCommand::Usage => {
            Ok(RollResponse::Usage(usage_message(context.app_name, context.command)))
        }
        ParsedCommand::Roll(request) => {
            let outcome = evaluate(&request, source);
            let text = format_roll(&request, &outcome, user_name);
            Ok(RollResponse::Rolled(RolledMessage { request, outcome, text }))
        }
    }
}
