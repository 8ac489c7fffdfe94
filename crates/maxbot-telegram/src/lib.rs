//! Telegram adapter (teloxide).
//!
//! Implements the core `ChatPort` over the Telegram Bot API. Telegram's
//! restrict-until-date primitive stands in for the platform timeout action;
//! Telegram carries no reason field on enforcement calls, so reasons are
//! logged here instead.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use teloxide::{
    prelude::*,
    types::{ChatMemberKind, ChatPermissions},
    ApiError, RequestError,
};
use tokio::time::sleep;
use tracing::info;

pub mod handlers;
pub mod router;

use maxbot_core::{
    domain::{ChatId, MessageId, MessageRef, UserId},
    errors::Error,
    ports::ChatPort,
    Result,
};

#[derive(Clone)]
pub struct TelegramChat {
    bot: Bot,
}

impl TelegramChat {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub fn bot(&self) -> Bot {
        self.bot.clone()
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn tg_user(user_id: UserId) -> teloxide::types::UserId {
        teloxide::types::UserId(user_id.0 as u64)
    }

    fn tg_msg_id(message_id: MessageId) -> teloxide::types::MessageId {
        teloxide::types::MessageId(message_id.0)
    }

    fn map_err(e: RequestError) -> Error {
        match e {
            RequestError::Api(api) => match api {
                ApiError::ChatNotFound => Error::NotFound("chat not found".to_string()),
                ApiError::UserNotFound => Error::NotFound("user not found".to_string()),
                ApiError::NotEnoughRightsToRestrict => {
                    Error::Forbidden("not enough rights to restrict".to_string())
                }
                ApiError::CantRestrictSelf => {
                    Error::Forbidden("cannot restrict the bot itself".to_string())
                }
                ApiError::MessageCantBeDeleted => {
                    Error::Forbidden("message cannot be deleted".to_string())
                }
                other => Error::External(format!("telegram api error: {other}")),
            },
            other => Error::External(format!("telegram error: {other}")),
        }
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }
}

#[async_trait]
impl ChatPort for TelegramChat {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
        let msg = self
            .with_retry(|| self.bot.send_message(Self::tg_chat(chat_id), text.to_string()))
            .await?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        })
    }

    async fn delete_message(&self, msg: MessageRef) -> Result<()> {
        self.with_retry(|| {
            self.bot
                .delete_message(Self::tg_chat(msg.chat_id), Self::tg_msg_id(msg.message_id))
        })
        .await?;
        Ok(())
    }

    async fn timeout_member(
        &self,
        chat_id: ChatId,
        user_id: UserId,
        until: DateTime<Utc>,
        reason: &str,
    ) -> Result<()> {
        info!("restricting {} in {} until {until}: {reason}", user_id.0, chat_id.0);
        self.with_retry(|| {
            self.bot
                .restrict_chat_member(
                    Self::tg_chat(chat_id),
                    Self::tg_user(user_id),
                    ChatPermissions::empty(),
                )
                .until_date(until)
        })
        .await?;
        Ok(())
    }

    async fn ban_member(&self, chat_id: ChatId, user_id: UserId, reason: &str) -> Result<()> {
        info!("banning {} in {}: {reason}", user_id.0, chat_id.0);
        self.with_retry(|| {
            self.bot
                .ban_chat_member(Self::tg_chat(chat_id), Self::tg_user(user_id))
        })
        .await?;
        Ok(())
    }

    async fn member_name(&self, chat_id: ChatId, user_id: UserId) -> Result<String> {
        let member = self
            .with_retry(|| {
                self.bot
                    .get_chat_member(Self::tg_chat(chat_id), Self::tg_user(user_id))
            })
            .await?;

        if matches!(member.kind, ChatMemberKind::Left | ChatMemberKind::Banned(_)) {
            return Err(Error::NotFound("user is not a member of the chat".to_string()));
        }

        Ok(member
            .user
            .mention()
            .unwrap_or_else(|| member.user.full_name()))
    }
}
