use teloxide::prelude::*;

use crate::router::AppState;

const BUN_PROMPT: &str = "Tell a cheerful, lightly humorous story about your bun-selling \
business and mention dark rye bread, keeping it fun and friendly.";

const EMPTY_CHAT_PROMPT: &str = "Hey friend, write something after !chat - or should I just \
brag about my newest bun?";

/// `!chat <prompt>` and `!bun` conversational commands. Anything else is
/// silently ignored.
pub async fn handle_text_command(
    bot: Bot,
    msg: &Message,
    state: &AppState,
    text: &str,
) -> ResponseResult<()> {
    if let Some(prompt) = text.strip_prefix("!chat") {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            bot.send_message(msg.chat.id, EMPTY_CHAT_PROMPT).await?;
            return Ok(());
        }
        let reply = state.responder.reply(prompt).await;
        bot.send_message(msg.chat.id, reply).await?;
    } else if text.starts_with("!bun") {
        let reply = state.responder.reply(BUN_PROMPT).await;
        bot.send_message(msg.chat.id, reply).await?;
    }

    Ok(())
}
