use std::sync::Arc;

use teloxide::Bot;
use tokio::sync::Mutex;
use tracing::error;

use maxbot_cerebras::CerebrasClient;
use maxbot_core::{
    chat::Responder,
    classifier::{ClassifierAdapter, MalformedPolicy},
    config::Config,
    ledger::WarningLedger,
    model::CompletionClient,
    moderation::Moderator,
    ports::ChatPort,
};
use maxbot_http::ControlState;
use maxbot_telegram::{router::AppState, TelegramChat};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    maxbot_core::logging::init("maxbot")?;

    // Missing credentials abort startup; everything past this point degrades
    // instead of crashing.
    let cfg = Arc::new(Config::load()?);

    let bot = Bot::new(cfg.telegram_bot_token.clone());
    let chat: Arc<dyn ChatPort> = Arc::new(TelegramChat::new(bot.clone()));

    let client: Arc<dyn CompletionClient> = Arc::new(CerebrasClient::new(
        cfg.cerebras_api_url.clone(),
        cfg.cerebras_api_key.clone(),
        cfg.cerebras_model.clone(),
        cfg.completion_timeout,
        cfg.rate_limit_backoff,
    ));

    let ledger = Arc::new(Mutex::new(WarningLedger::load(cfg.warnings_file.clone())));
    let classifier = ClassifierAdapter::new(
        client.clone(),
        cfg.min_moderation_len,
        MalformedPolicy::FailOpen,
    );
    let moderator = Arc::new(Moderator::new(
        cfg.clone(),
        classifier,
        chat.clone(),
        ledger,
    ));
    let responder = Arc::new(Responder::new(client));

    let mut http = tokio::spawn(maxbot_http::serve(
        cfg.http_bind,
        ControlState {
            cfg: cfg.clone(),
            chat,
            moderator: moderator.clone(),
        },
    ));

    let state = Arc::new(AppState {
        cfg,
        moderator,
        responder,
    });

    // The control endpoint is part of the bot's contract: losing it (bind
    // failure, listener error) takes the process down rather than leaving a
    // silently dead HTTP surface.
    tokio::select! {
        res = &mut http => {
            let e = match res {
                Ok(Ok(())) => anyhow::anyhow!("control endpoint exited unexpectedly"),
                Ok(Err(e)) => e,
                Err(e) => anyhow::anyhow!("control endpoint task panicked: {e}"),
            };
            error!("control endpoint failed: {e}");
            Err(e)
        }
        res = maxbot_telegram::router::run_polling(bot, state) => {
            http.abort();
            if let Err(e) = &res {
                error!("telegram polling failed: {e}");
            }
            res
        }
    }
}
