use super::{MAX_DICE, MAX_SIDES, MIN_DICE, MIN_SIDES};

pub fn usage_message(app_name: &str, command: &str) -> String {
    let examples = [
        (command.to_owned(), "Rolls a single 6-sided die".to_owned()),
        (format!("{command} d20"), "Rolls a single 20-sided die".to_owned()),
        (format!("{command} 4d10"), "Rolls 4 10-sided dice".to_owned()),
        (format!("{command} 1d6+3"), "Rolls a single 6-sided die with a +3 modifier".to_owned()),
        (format!("{command} help"), "Shows this message".to_owned()),
    ];

    let mut message = format!(
        "*{app_name}* can roll anywhere from *{MIN_DICE}-{MAX_DICE} dice* with \
         *{MIN_SIDES}-{MAX_SIDES} sides* each.\nHere are some examples:\n"
    );
    for (example, description) in examples {
        message.push_str(&format!("\n`{example}`\n\t{description}\n"));
    }
    message
}
