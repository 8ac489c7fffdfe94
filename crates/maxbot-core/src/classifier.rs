//! Classifier adapter.
//!
//! Wraps the completion client with a moderation-specific system prompt and
//! parses the strict two-field verdict the model is instructed to return.
//! Parse failures get exactly one reformulated retry; a second failure fails
//! open (the content is treated as acceptable) so a malformed classifier can
//! never block legitimate traffic.

use std::sync::Arc;

use serde::Deserialize;
use tracing::error;

use crate::{
    model::{CompletionClient, CompletionRequest},
    Error, Result,
};

const MODERATION_PROMPT: &str = "You are a chat moderator. Judge whether the given text contains \
insults, profanity, threats or any other inappropriate content. Return strictly a JSON object \
with fields 'is_inappropriate' (true/false) and 'reason' (a string with the reason when \
is_inappropriate=true, otherwise an empty string). Example: {\"is_inappropriate\": true, \
\"reason\": \"the message contains profanity\"} or {\"is_inappropriate\": false, \"reason\": \
\"\"}. Return nothing except the JSON object and make sure the keys are double-quoted.";

/// What to do when the classifier output stays unparsable after the retry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MalformedPolicy {
    /// Treat the content as acceptable (moderation false-negatives are
    /// preferred over blocking traffic).
    FailOpen,
}

/// Structured classifier output. `is_inappropriate` is required; a response
/// without it counts as a parse failure.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Verdict {
    pub is_inappropriate: bool,
    #[serde(default)]
    pub reason: String,
}

impl Verdict {
    pub fn clean() -> Self {
        Self {
            is_inappropriate: false,
            reason: String::new(),
        }
    }
}

pub struct ClassifierAdapter {
    client: Arc<dyn CompletionClient>,
    min_len: usize,
    pub on_malformed: MalformedPolicy,
}

impl ClassifierAdapter {
    pub fn new(client: Arc<dyn CompletionClient>, min_len: usize, on_malformed: MalformedPolicy) -> Self {
        Self {
            client,
            min_len,
            on_malformed,
        }
    }

    pub async fn classify(&self, text: &str) -> Verdict {
        // Trivial content is not worth an API call.
        if text.chars().count() < self.min_len {
            return Verdict::clean();
        }

        let req = CompletionRequest::moderation(MODERATION_PROMPT, text);
        let raw = match self.client.complete(req).await {
            Ok(raw) => raw,
            Err(e) => {
                error!("classification request failed, treating content as clean: {e}");
                return self.malformed();
            }
        };

        match parse_verdict(&raw) {
            Ok(verdict) => verdict,
            Err(e) => {
                error!("unparsable classifier output {raw:?}: {e}");
                self.retry(text).await
            }
        }
    }

    /// Single retry with a reformulated prompt re-stating the schema.
    async fn retry(&self, text: &str) -> Verdict {
        let prompt = format!(
            "Analyze this text: '{text}'. Return strictly JSON: \
             {{\"is_inappropriate\": true/false, \"reason\": \"reason or empty string\"}}."
        );
        let req = CompletionRequest::moderation(MODERATION_PROMPT, prompt);
        match self.client.complete(req).await {
            Ok(raw) => match parse_verdict(&raw) {
                Ok(verdict) => verdict,
                Err(e) => {
                    error!("classifier output unparsable after retry {raw:?}: {e}");
                    self.malformed()
                }
            },
            Err(e) => {
                error!("classification retry failed: {e}");
                self.malformed()
            }
        }
    }

    fn malformed(&self) -> Verdict {
        match self.on_malformed {
            MalformedPolicy::FailOpen => Verdict::clean(),
        }
    }
}

fn parse_verdict(raw: &str) -> Result<Verdict> {
    serde_json::from_str(raw.trim()).map_err(|e| Error::MalformedVerdict(e.to_string()))
}
