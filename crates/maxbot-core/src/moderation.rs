//! Moderation orchestrator.
//!
//! Drives one inbound message through classify -> delete -> ledger ->
//! escalate -> platform action. Deletion and the ledger increment are not
//! transactional: a warning can be recorded even when removal fails, which
//! reflects the intent to moderate.
//!
//! No per-user sequencing is applied: two messages from one user can have
//! their classification calls interleave at I/O suspension points, and only
//! the ledger mutex serializes the increments (reference behavior).

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::{
    classifier::ClassifierAdapter,
    config::Config,
    domain::{ChatId, MessageId, MessageRef, UserId},
    ledger::WarningLedger,
    policy::{decide, Escalation},
    ports::ChatPort,
    Error, Result,
};

/// One message as seen by the orchestrator.
#[derive(Clone, Debug)]
pub struct InboundMessage {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub author_id: UserId,
    pub author_name: String,
    pub text: String,
}

/// Terminal result of handling one message, returned to the caller for
/// logging / response construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Clean,
    Flagged { count: u32, escalation: Escalation },
}

pub struct Moderator {
    cfg: Arc<Config>,
    classifier: ClassifierAdapter,
    chat: Arc<dyn ChatPort>,
    ledger: Arc<Mutex<WarningLedger>>,
}

impl Moderator {
    pub fn new(
        cfg: Arc<Config>,
        classifier: ClassifierAdapter,
        chat: Arc<dyn ChatPort>,
        ledger: Arc<Mutex<WarningLedger>>,
    ) -> Self {
        Self {
            cfg,
            classifier,
            chat,
            ledger,
        }
    }

    pub async fn handle_message(&self, msg: &InboundMessage) -> Outcome {
        let verdict = self.classifier.classify(&msg.text).await;
        if !verdict.is_inappropriate {
            return Outcome::Clean;
        }
        let reason = if verdict.reason.is_empty() {
            "inappropriate content".to_string()
        } else {
            verdict.reason
        };

        // Best-effort deletion; the warning still counts when it fails.
        let source = MessageRef {
            chat_id: msg.chat_id,
            message_id: msg.message_id,
        };
        if let Err(e) = self.chat.delete_message(source).await {
            warn!("failed to delete flagged message from {}: {e}", msg.author_name);
        }

        let count = self.ledger.lock().await.increment(msg.author_id);
        info!(
            "message from {} flagged: {reason}; warnings now {count}",
            msg.author_name
        );

        let notice = format!(
            "{}, hey, that was out of line - {reason}. This is warning number {count}. \
             My bun business demands polite conversation!",
            msg.author_name
        );
        let _ = self.chat.send_text(msg.chat_id, &notice).await;

        let escalation = decide(
            count,
            self.cfg.mute_threshold,
            self.cfg.ban_threshold,
            self.cfg.mute_duration,
        );
        match escalation {
            Escalation::Notify => {}
            Escalation::Timeout(duration) => self.apply_timeout(msg, duration, count).await,
            Escalation::Ban => self.apply_ban(msg, count).await,
        }

        Outcome::Flagged { count, escalation }
    }

    async fn apply_timeout(&self, msg: &InboundMessage, duration: std::time::Duration, count: u32) {
        let until = Utc::now() + chrono::Duration::seconds(duration.as_secs() as i64);
        match self
            .chat
            .timeout_member(
                msg.chat_id,
                msg.author_id,
                until,
                "too much inappropriate content",
            )
            .await
        {
            Ok(()) => {
                info!("user {} timed out for {}s", msg.author_name, duration.as_secs());
                let announce = format!(
                    "{} got a timeout of {} minutes after {count} warnings. \
                     Time to pause and think about buns!",
                    msg.author_name,
                    duration.as_secs() / 60
                );
                let _ = self.chat.send_text(msg.chat_id, &announce).await;
            }
            Err(Error::Forbidden(_)) => {
                error!("no rights to time out {}", msg.author_name);
                let _ = self
                    .chat
                    .send_text(msg.chat_id, "I can't mute anyone, paws only! No rights!")
                    .await;
            }
            Err(e) => error!("timeout of {} failed: {e}", msg.author_name),
        }
    }

    async fn apply_ban(&self, msg: &InboundMessage, count: u32) {
        match self
            .chat
            .ban_member(msg.chat_id, msg.author_id, "too much inappropriate content")
            .await
        {
            Ok(()) => {
                info!("user {} banned", msg.author_name);
                self.ledger.lock().await.reset(msg.author_id);
                let announce = format!(
                    "{} is banned after {count} warnings. My bun warehouse is cleaner now!",
                    msg.author_name
                );
                let _ = self.chat.send_text(msg.chat_id, &announce).await;
            }
            Err(Error::Forbidden(_)) => {
                error!("no rights to ban {}", msg.author_name);
                let _ = self
                    .chat
                    .send_text(msg.chat_id, "I can't ban anyone, paws only! No rights!")
                    .await;
            }
            Err(e) => error!("ban of {} failed: {e}", msg.author_name),
        }
    }

    // ----- Direct actions, used by the HTTP control endpoint -----

    /// In-channel warning notice. Does not touch the ledger.
    pub async fn warn_member(&self, chat_id: ChatId, name: &str, reason: &str) -> Result<()> {
        let notice = format!(
            "{name} got a warning for: {reason}. Behave like my finest bun!"
        );
        self.chat.send_text(chat_id, &notice).await?;
        info!("warning issued to {name}: {reason}");
        Ok(())
    }

    /// Timeout for the configured mute duration, plus an in-channel notice.
    pub async fn mute_member(
        &self,
        chat_id: ChatId,
        user_id: UserId,
        name: &str,
        reason: &str,
    ) -> Result<()> {
        let duration = self.cfg.mute_duration;
        let until = Utc::now() + chrono::Duration::seconds(duration.as_secs() as i64);
        self.chat
            .timeout_member(chat_id, user_id, until, reason)
            .await?;
        let notice = format!(
            "{name} got a timeout of {} minutes for: {reason}. \
             Time to pause and think about buns!",
            duration.as_secs() / 60
        );
        let _ = self.chat.send_text(chat_id, &notice).await;
        info!("user {name} muted for {}s", duration.as_secs());
        Ok(())
    }

    /// Platform ban plus an in-channel notice. Leaves the ledger untouched
    /// (only the escalation path clears records).
    pub async fn ban_member(
        &self,
        chat_id: ChatId,
        user_id: UserId,
        name: &str,
        reason: &str,
    ) -> Result<()> {
        self.chat.ban_member(chat_id, user_id, reason).await?;
        let notice = format!("{name} is banned for: {reason}. My bun warehouse is cleaner now!");
        let _ = self.chat.send_text(chat_id, &notice).await;
        info!("user {name} banned: {reason}");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Test doubles for the orchestrator tests.

    use super::*;

    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;
    use chrono::DateTime;

    use crate::model::{CompletionClient, CompletionRequest};

    /// Records every platform action; individual calls can be scripted to fail.
    #[derive(Default)]
    pub struct RecordingChat {
        pub sent: StdMutex<Vec<(ChatId, String)>>,
        pub deleted: StdMutex<Vec<MessageRef>>,
        pub timeouts: StdMutex<Vec<(ChatId, UserId, DateTime<Utc>)>>,
        pub bans: StdMutex<Vec<(ChatId, UserId)>>,
        pub fail_delete: StdMutex<bool>,
        pub forbid_timeout: StdMutex<bool>,
        pub forbid_ban: StdMutex<bool>,
    }

    #[async_trait]
    impl ChatPort for RecordingChat {
        async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
            self.sent.lock().unwrap().push((chat_id, text.to_string()));
            Ok(MessageRef {
                chat_id,
                message_id: MessageId(1),
            })
        }

        async fn delete_message(&self, msg: MessageRef) -> Result<()> {
            if *self.fail_delete.lock().unwrap() {
                return Err(Error::Forbidden("message cannot be deleted".into()));
            }
            self.deleted.lock().unwrap().push(msg);
            Ok(())
        }

        async fn timeout_member(
            &self,
            chat_id: ChatId,
            user_id: UserId,
            until: DateTime<Utc>,
            _reason: &str,
        ) -> Result<()> {
            if *self.forbid_timeout.lock().unwrap() {
                return Err(Error::Forbidden("not enough rights".into()));
            }
            self.timeouts.lock().unwrap().push((chat_id, user_id, until));
            Ok(())
        }

        async fn ban_member(&self, chat_id: ChatId, user_id: UserId, _reason: &str) -> Result<()> {
            if *self.forbid_ban.lock().unwrap() {
                return Err(Error::Forbidden("not enough rights".into()));
            }
            self.bans.lock().unwrap().push((chat_id, user_id));
            Ok(())
        }

        async fn member_name(&self, _chat_id: ChatId, user_id: UserId) -> Result<String> {
            Ok(format!("user{}", user_id.0))
        }
    }

    /// Classifier backend returning the same verdict text for every call.
    pub struct FixedClassifier(pub String);

    #[async_trait]
    impl CompletionClient for FixedClassifier {
        async fn complete(&self, _req: CompletionRequest) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    pub fn test_config(warnings_file: std::path::PathBuf) -> Config {
        Config {
            telegram_bot_token: "token".into(),
            cerebras_api_key: "key".into(),
            bot_api_key: "secret".into(),
            cerebras_api_url: "https://api.cerebras.ai/v1/chat/completions".into(),
            cerebras_model: "llama3.1-8b".into(),
            completion_timeout: std::time::Duration::from_secs(15),
            rate_limit_backoff: std::time::Duration::from_secs(10),
            mute_threshold: 6,
            ban_threshold: 10,
            mute_duration: std::time::Duration::from_secs(600),
            min_moderation_len: 5,
            warnings_file,
            status_file: "/tmp/maxbot-status".into(),
            http_bind: "127.0.0.1:0".parse().unwrap(),
            moderated_chats: vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    use crate::classifier::MalformedPolicy;

    const FLAGGED: &str = r#"{"is_inappropriate": true, "reason": "slur"}"#;
    const CLEAN: &str = r#"{"is_inappropriate": false, "reason": ""}"#;

    fn scratch_path(name: &str) -> std::path::PathBuf {
        let path =
            std::path::PathBuf::from(format!("/tmp/maxbot-mod-{}-{name}.json", std::process::id()));
        let _ = std::fs::remove_file(&path);
        path
    }

    fn build(
        name: &str,
        verdict: &str,
    ) -> (Moderator, Arc<RecordingChat>, Arc<Mutex<WarningLedger>>) {
        let cfg = Arc::new(test_config(scratch_path(name)));
        let chat = Arc::new(RecordingChat::default());
        let ledger = Arc::new(Mutex::new(WarningLedger::load(cfg.warnings_file.clone())));
        let classifier = ClassifierAdapter::new(
            Arc::new(FixedClassifier(verdict.to_string())),
            cfg.min_moderation_len,
            MalformedPolicy::FailOpen,
        );
        let moderator = Moderator::new(cfg, classifier, chat.clone(), ledger.clone());
        (moderator, chat, ledger)
    }

    fn message(n: u32) -> InboundMessage {
        InboundMessage {
            chat_id: ChatId(-100),
            message_id: MessageId(n as i32),
            author_id: UserId(7),
            author_name: "offender".to_string(),
            text: "something objectionable".to_string(),
        }
    }

    #[tokio::test]
    async fn clean_message_takes_no_action() {
        let (moderator, chat, ledger) = build("clean", CLEAN);

        let outcome = moderator.handle_message(&message(1)).await;

        assert_eq!(outcome, Outcome::Clean);
        assert!(chat.sent.lock().unwrap().is_empty());
        assert!(chat.deleted.lock().unwrap().is_empty());
        assert_eq!(ledger.lock().await.count(UserId(7)), 0);
    }

    #[tokio::test]
    async fn flagged_message_is_deleted_counted_and_notified() {
        let (moderator, chat, ledger) = build("flagged", FLAGGED);

        let outcome = moderator.handle_message(&message(1)).await;

        assert_eq!(
            outcome,
            Outcome::Flagged {
                count: 1,
                escalation: Escalation::Notify
            }
        );
        assert_eq!(chat.deleted.lock().unwrap().len(), 1);
        assert_eq!(ledger.lock().await.count(UserId(7)), 1);

        let sent = chat.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.contains("warning number 1"));
        assert!(sent[0].1.contains("slur"));
    }

    #[tokio::test]
    async fn sixth_warning_times_the_user_out() {
        let (moderator, chat, ledger) = build("sixth", FLAGGED);

        for n in 1..=6 {
            moderator.handle_message(&message(n)).await;
        }

        assert_eq!(ledger.lock().await.count(UserId(7)), 6);
        let timeouts = chat.timeouts.lock().unwrap();
        assert_eq!(timeouts.len(), 1);
        assert_eq!(timeouts[0].1, UserId(7));
        // Notice + timeout announcement on the sixth message.
        let sent = chat.sent.lock().unwrap();
        assert!(sent.iter().any(|(_, t)| t.contains("timeout of 10 minutes")));
    }

    #[tokio::test]
    async fn tenth_warning_bans_and_clears_the_record() {
        let (moderator, chat, ledger) = build("tenth", FLAGGED);

        for n in 1..=10 {
            moderator.handle_message(&message(n)).await;
        }

        let bans = chat.bans.lock().unwrap();
        assert_eq!(bans.len(), 1);
        assert_eq!(bans[0], (ChatId(-100), UserId(7)));
        // Ledger entry removed entirely after the ban.
        assert!(ledger.lock().await.is_empty());
    }

    #[tokio::test]
    async fn deletion_failure_still_records_the_warning() {
        let (moderator, chat, ledger) = build("delfail", FLAGGED);
        *chat.fail_delete.lock().unwrap() = true;

        let outcome = moderator.handle_message(&message(1)).await;

        assert!(matches!(outcome, Outcome::Flagged { count: 1, .. }));
        assert!(chat.deleted.lock().unwrap().is_empty());
        assert_eq!(ledger.lock().await.count(UserId(7)), 1);
    }

    #[tokio::test]
    async fn forbidden_timeout_sends_a_permission_notice() {
        let (moderator, chat, ledger) = build("forbid-mute", FLAGGED);
        *chat.forbid_timeout.lock().unwrap() = true;

        for n in 1..=6 {
            moderator.handle_message(&message(n)).await;
        }

        assert!(chat.timeouts.lock().unwrap().is_empty());
        assert_eq!(ledger.lock().await.count(UserId(7)), 6);
        let sent = chat.sent.lock().unwrap();
        assert!(sent.iter().any(|(_, t)| t.contains("No rights")));
    }

    #[tokio::test]
    async fn forbidden_ban_keeps_the_ledger_entry() {
        let (moderator, chat, ledger) = build("forbid-ban", FLAGGED);
        *chat.forbid_ban.lock().unwrap() = true;

        for n in 1..=10 {
            moderator.handle_message(&message(n)).await;
        }

        assert!(chat.bans.lock().unwrap().is_empty());
        assert_eq!(ledger.lock().await.count(UserId(7)), 10);
        let sent = chat.sent.lock().unwrap();
        assert!(sent.iter().any(|(_, t)| t.contains("can't ban")));
    }
}
