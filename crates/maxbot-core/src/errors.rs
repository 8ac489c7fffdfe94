/// Core error type for the bot.
///
/// Adapter crates map their specific errors into this type so the core can
/// handle failures consistently (fallback reply vs fail-open vs HTTP status).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("network failure: {0}")]
    Network(String),

    #[error("upstream rate limited")]
    RateLimited,

    #[error("upstream timeout")]
    Timeout,

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("malformed classifier output: {0}")]
    MalformedVerdict(String),

    #[error("insufficient permission: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid action: {0}")]
    InvalidAction(String),

    #[error("invalid credential")]
    InvalidCredential,

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
