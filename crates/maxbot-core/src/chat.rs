//! Conversational responder.
//!
//! Wraps the completion client with the bot persona and absorbs every
//! transport failure into a user-facing fallback line: the conversational
//! path must always produce *some* reply.

use std::sync::Arc;

use tracing::warn;

use crate::{
    model::{CompletionClient, CompletionRequest},
    Error,
};

const PERSONA_PROMPT: &str = "You are MaximAI, a cheerful and friendly bot! You love hanging out \
and chatting about anything. You are an entrepreneur selling buns - that is your thriving \
business and you are proud of your assortment! Dark rye bread is your one true love, not a day \
without it! Be friendly, use slang and light humor about buns and rye bread. Give fleshed-out \
answers (3-4 sentences) so it stays interesting, but do not drag on. If the question is simple, \
like 'hi', answer with spirit. If you do not know the answer, admit it honestly and suggest \
something fun instead. Close your replies properly, with a period or an exclamation mark!";

const FALLBACK_NETWORK: &str =
    "Oops, the internet vanished like my bun stock! Check the connection and try again!";
const FALLBACK_RATE_LIMITED: &str =
    "Too many requests! Even my buns do not sell out this fast! Hold on a moment!";
const FALLBACK_TIMEOUT: &str = "The model froze like a customer without a bun! Try once more!";
const FALLBACK_UPSTREAM: &str =
    "Looks like the completion service took a bun break. Try again in a minute!";

/// Replies shorter than this (in words) get one polish pass.
const MIN_REPLY_WORDS: usize = 5;

pub struct Responder {
    client: Arc<dyn CompletionClient>,
}

impl Responder {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self { client }
    }

    /// Produce a conversational reply. Infallible by design: completion
    /// errors map to fixed fallback lines instead of propagating.
    pub async fn reply(&self, prompt: &str) -> String {
        let req = CompletionRequest::conversational(PERSONA_PROMPT, prompt);
        let text = match self.client.complete(req).await {
            Ok(text) => text,
            Err(e) => {
                warn!("conversational completion failed: {e}");
                return fallback_for(&e).to_string();
            }
        };

        // Very short answers read as truncated; ask the model to finish the
        // thought once, keeping the original reply if that also fails.
        if word_count(&text) < MIN_REPLY_WORDS {
            warn!("reply too short ({text:?}), requesting a follow-up");
            let follow = format!(
                "Finish this reply in the same playful style, add 2-3 sentences about \
                 the bun business and dark rye bread: {text}"
            );
            let req = CompletionRequest::conversational(PERSONA_PROMPT, follow);
            match self.client.complete(req).await {
                Ok(longer) => return longer,
                Err(e) => {
                    warn!("follow-up completion failed, keeping short reply: {e}");
                    return text;
                }
            }
        }

        text
    }
}

fn fallback_for(err: &Error) -> &'static str {
    match err {
        Error::Network(_) => FALLBACK_NETWORK,
        Error::RateLimited => FALLBACK_RATE_LIMITED,
        Error::Timeout => FALLBACK_TIMEOUT,
        _ => FALLBACK_UPSTREAM,
    }
}

fn word_count(s: &str) -> usize {
    s.split_whitespace().count()
}
