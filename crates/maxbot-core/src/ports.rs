use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    domain::{ChatId, MessageRef, UserId},
    Result,
};

/// Capabilities the core needs from the chat platform.
///
/// Telegram is the first implementation; the shape is platform-neutral so a
/// Discord/Slack adapter can fit behind the same interface. Enforcement
/// methods fail with `Error::Forbidden` when the bot lacks rights and
/// `Error::NotFound` when the chat or member is unknown.
#[async_trait]
pub trait ChatPort: Send + Sync {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef>;

    async fn delete_message(&self, msg: MessageRef) -> Result<()>;

    /// Restrict the member from posting until the given instant.
    async fn timeout_member(
        &self,
        chat_id: ChatId,
        user_id: UserId,
        until: DateTime<Utc>,
        reason: &str,
    ) -> Result<()>;

    async fn ban_member(&self, chat_id: ChatId, user_id: UserId, reason: &str) -> Result<()>;

    /// Display name of a current member; `Error::NotFound` when the chat or
    /// the user is unknown to the platform.
    async fn member_name(&self, chat_id: ChatId, user_id: UserId) -> Result<String>;
}
