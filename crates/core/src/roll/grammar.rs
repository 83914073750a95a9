use std::sync::OnceLock;

use regex::Regex;

use super::{
    Modifier, ModifierSign, RollError, RollRequest, DEFAULT_ROLL, HELP_KEYWORD, MAX_DICE,
    MAX_SIDES, MIN_DICE, MIN_SIDES,
};

// Anchored at both ends: trailing or leading characters are rejected.
const ROLL_PATTERN: &str = r"^([0-9]+)?d([0-9]+)(?:([-+])([0-9]+)?)?$";

static ROLL_REGEX: OnceLock<Regex> = OnceLock::new();

fn roll_regex() -> &'static Regex {
    ROLL_REGEX.get_or_init(|| Regex::new(ROLL_PATTERN).expect("roll grammar pattern compiles"))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParsedCommand {
    Roll(RollRequest),
    Usage,
}

/// Parses command text such as `d20`, `4d10` or `2d8-1`.
///
/// Matching is case-insensitive and ignores surrounding whitespace. Empty
/// text parses as [`DEFAULT_ROLL`]; `help` parses as [`ParsedCommand::Usage`].
/// Out-of-range dice counts and side counts are clamped, never rejected.
pub fn parse_roll(input: &str) -> Result<ParsedCommand, RollError> {
    let normalized = input.trim().to_lowercase();
    let expression = if normalized.is_empty() { DEFAULT_ROLL } else { normalized.as_str() };

    if expression == HELP_KEYWORD {
        return Ok(ParsedCommand::Usage);
    }

    let invalid = || RollError::InvalidFormat { input: expression.to_owned() };
    let captures = roll_regex().captures(expression).ok_or_else(invalid)?;

    let count = captures
        .get(1)
        .map(|digits| clamp_digits(digits.as_str(), MIN_DICE, MAX_DICE))
        .unwrap_or(MIN_DICE);
    let sides = captures
        .get(2)
        .map(|digits| clamp_digits(digits.as_str(), MIN_SIDES, MAX_SIDES))
        .ok_or_else(invalid)?;

    let modifier = match captures.get(3) {
        None => None,
        Some(sign) => {
            let digits = captures
                .get(4)
                .ok_or_else(|| RollError::MalformedModifier { input: expression.to_owned() })?;
            let value = digits.as_str().parse::<u32>().map_err(|_| invalid())?;
            let sign = if sign.as_str() == "-" { ModifierSign::Minus } else { ModifierSign::Plus };
            Some(Modifier { sign, value })
        }
    };

    Ok(ParsedCommand::Roll(RollRequest { count, sides, modifier }))
}

fn clamp_digits(digits: &str, min: u32, max: u32) -> u32 {
    // The pattern only admits ASCII digits, so a parse failure is an overflow.
    let value = digits.parse::<u64>().unwrap_or(u64::MAX);
    let clamped = value.clamp(u64::from(min), u64::from(max));
    u32::try_from(clamped).unwrap_or(max)
}
