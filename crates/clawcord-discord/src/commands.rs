//! Prefix text commands for messages that do not mention the bot.

/// Handle `<prefix><command>` messages.
///
/// Returns `Some(response)` if the message was a recognized command, `None`
/// if it should go on to mention handling.
///
/// Recognized commands:
///   `help`: how to talk to the bot
pub fn handle_prefix_command(content: &str, prefix: &str) -> Option<String> {
    if prefix.is_empty() {
        return None;
    }
    let rest = content.trim().strip_prefix(prefix)?;
    let command = rest.split_whitespace().next()?;

    if command.eq_ignore_ascii_case("help") {
        return Some(format!(
            "**Clawcord**\n\
             - Mention me with a question or task and I'll hand it to Claude Code.\n\
             - `{prefix}help`: show this help"
        ));
    }
    None
}
