use std::{env, fs, net::SocketAddr, path::Path, path::PathBuf, time::Duration};

use crate::{errors::Error, Result};

/// Typed configuration, loaded from the environment (plus an optional `.env`).
///
/// Thresholds and durations default to the reference deployment values.
#[derive(Clone, Debug)]
pub struct Config {
    // Credentials (required; missing values abort startup)
    pub telegram_bot_token: String,
    pub cerebras_api_key: String,
    pub bot_api_key: String,

    // Completion service
    pub cerebras_api_url: String,
    pub cerebras_model: String,
    pub completion_timeout: Duration,
    pub rate_limit_backoff: Duration,

    // Moderation policy
    pub mute_threshold: u32,
    pub ban_threshold: u32,
    pub mute_duration: Duration,
    pub min_moderation_len: usize,

    // Persistence / status
    pub warnings_file: PathBuf,
    pub status_file: PathBuf,

    // Control endpoint
    pub http_bind: SocketAddr,

    // Chats the bot is deployed to (informational, reported in the status file)
    pub moderated_chats: Vec<i64>,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        let cerebras_api_key = env_str("CEREBRAS_API_KEY").unwrap_or_default();
        let bot_api_key = env_str("BOT_API_KEY").unwrap_or_default();

        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }
        if cerebras_api_key.trim().is_empty() {
            return Err(Error::Config(
                "CEREBRAS_API_KEY environment variable is required".to_string(),
            ));
        }
        if bot_api_key.trim().is_empty() {
            return Err(Error::Config(
                "BOT_API_KEY environment variable is required".to_string(),
            ));
        }

        let cerebras_api_url = env_str("CEREBRAS_API_URL")
            .and_then(non_empty)
            .unwrap_or_else(|| "https://api.cerebras.ai/v1/chat/completions".to_string());
        let cerebras_model = env_str("CEREBRAS_MODEL")
            .and_then(non_empty)
            .unwrap_or_else(|| "llama3.1-8b".to_string());
        let completion_timeout =
            Duration::from_secs(env_u64("COMPLETION_TIMEOUT_SECS").unwrap_or(15));
        let rate_limit_backoff =
            Duration::from_secs(env_u64("RATE_LIMIT_BACKOFF_SECS").unwrap_or(10));

        let mute_threshold = env_u32("MUTE_THRESHOLD").unwrap_or(6);
        let ban_threshold = env_u32("BAN_THRESHOLD").unwrap_or(10);
        if mute_threshold >= ban_threshold {
            return Err(Error::Config(format!(
                "MUTE_THRESHOLD ({mute_threshold}) must be below BAN_THRESHOLD ({ban_threshold})"
            )));
        }
        let mute_duration = Duration::from_secs(env_u64("MUTE_DURATION_SECS").unwrap_or(600));
        let min_moderation_len = env_usize("MIN_MODERATION_LEN").unwrap_or(5);

        let warnings_file =
            PathBuf::from(env_str("WARNINGS_FILE").unwrap_or("warnings.json".to_string()));
        let status_file =
            PathBuf::from(env_str("STATUS_FILE").unwrap_or("bot_status.txt".to_string()));

        let http_bind = env_str("HTTP_BIND")
            .unwrap_or("0.0.0.0:8000".to_string())
            .parse::<SocketAddr>()
            .map_err(|e| Error::Config(format!("invalid HTTP_BIND: {e}")))?;

        let moderated_chats = parse_csv_i64(env_str("MODERATED_CHATS"));

        Ok(Self {
            telegram_bot_token,
            cerebras_api_key,
            bot_api_key,
            cerebras_api_url,
            cerebras_model,
            completion_timeout,
            rate_limit_backoff,
            mute_threshold,
            ban_threshold,
            mute_duration,
            min_moderation_len,
            warnings_file,
            status_file,
            http_bind,
            moderated_chats,
        })
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_u32(key: &str) -> Option<u32> {
    env_str(key).and_then(|s| s.trim().parse::<u32>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn parse_csv_i64(v: Option<String>) -> Vec<i64> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<i64>().ok())
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
