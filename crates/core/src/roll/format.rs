use super::{RollOutcome, RollRequest};

/// Renders a roll as Slack mrkdwn, e.g.
/// `_alice rolled 2 8-sided dice:_  *8* (6, 3)  - 1`.
pub fn format_roll(request: &RollRequest, outcome: &RollOutcome, user_name: &str) -> String {
    let noun = if request.count == 1 { "die" } else { "dice" };
    let results = outcome.dice.iter().map(u32::to_string).collect::<Vec<_>>().join(", ");
    let modifier = request
        .modifier
        .map(|modifier| format!("  {} {}", modifier.sign.as_char(), modifier.value))
        .unwrap_or_default();

    format!(
        "_{user_name} rolled {count} {sides}-sided {noun}:_  *{total}* ({results}){modifier}",
        count = request.count,
        sides = request.sides,
        total = outcome.final_sum,
    )
}

#[cfg(test)]
mod tests {
    use super::format_roll;
    use crate::roll::{Modifier, ModifierSign, RollOutcome, RollRequest};

    #[test]
    fn single_die_uses_singular_noun() {
        let request = RollRequest { count: 1, sides: 20, modifier: None };
        let outcome = RollOutcome { dice: vec![17], raw_sum: 17, final_sum: 17 };

        assert_eq!(format_roll(&request, &outcome, "bob"), "_bob rolled 1 20-sided die:_  *17* (17)");
    }

    #[test]
    fn several_dice_with_penalty() {
        let request = RollRequest {
            count: 2,
            sides: 8,
            modifier: Some(Modifier { sign: ModifierSign::Minus, value: 1 }),
        };
        let outcome = RollOutcome { dice: vec![6, 3], raw_sum: 9, final_sum: 8 };

        assert_eq!(
            format_roll(&request, &outcome, "alice"),
            "_alice rolled 2 8-sided dice:_  *8* (6, 3)  - 1"
        );
    }

    #[test]
    fn formatting_is_repeatable() {
        let request = RollRequest {
            count: 4,
            sides: 10,
            modifier: Some(Modifier { sign: ModifierSign::Plus, value: 3 }),
        };
        let outcome = RollOutcome { dice: vec![1, 10, 5, 5], raw_sum: 21, final_sum: 24 };

        assert_eq!(
            format_roll(&request, &outcome, "carol"),
            format_roll(&request, &outcome, "carol")
        );
    }
}
