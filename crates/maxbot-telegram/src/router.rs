use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use maxbot_core::{chat::Responder, config::Config, moderation::Moderator, status};

use crate::handlers;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub moderator: Arc<Moderator>,
    pub responder: Arc<Responder>,
}

/// Run the long-polling dispatcher until the process is stopped.
pub async fn run_polling(bot: Bot, state: Arc<AppState>) -> anyhow::Result<()> {
    // Basic startup info + the status file (informational, best-effort).
    if let Ok(me) = bot.get_me().await {
        println!("maxbot started: @{}", me.username());
        if let Err(e) = status::write_status_file(
            &state.cfg.status_file,
            me.username(),
            state.cfg.moderated_chats.len(),
        ) {
            eprintln!("Failed to write status file: {e}");
        }
    }
    println!(
        "Thresholds: mute at {}, ban at {}",
        state.cfg.mute_threshold, state.cfg.ban_threshold
    );

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    Ok(())
}
