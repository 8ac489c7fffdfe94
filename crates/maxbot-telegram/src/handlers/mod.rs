//! Message handlers.
//!
//! Private chats get a direct conversational reply (they play the role of
//! the per-user channels in the reference deployment). Group messages run
//! through moderation first; only clean messages reach the text commands.

use std::sync::Arc;

use teloxide::prelude::*;

use maxbot_core::{
    domain::{ChatId, MessageId, UserId},
    moderation::{InboundMessage, Outcome},
};

use crate::router::AppState;

pub mod commands;

pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    if user.is_bot {
        return Ok(());
    }
    let Some(text) = msg.text().map(|s| s.to_string()) else {
        return Ok(());
    };

    if msg.chat.is_private() {
        let reply = state.responder.reply(&text).await;
        bot.send_message(msg.chat.id, reply).await?;
        return Ok(());
    }

    let inbound = InboundMessage {
        chat_id: ChatId(msg.chat.id.0),
        message_id: MessageId(msg.id.0),
        author_id: UserId(user.id.0 as i64),
        author_name: user.mention().unwrap_or_else(|| user.full_name()),
        text: text.clone(),
    };
    if let Outcome::Flagged { .. } = state.moderator.handle_message(&inbound).await {
        return Ok(());
    }

    commands::handle_text_command(bot, &msg, &state, &text).await
}
