use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use teloxide::types::ChatId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no bot token configured, set TELEGRAM_TOKEN")]
    MissingToken,
    #[error("invalid value {value:?} for {name}")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    /// Chat that receives a notice once the bot is up.
    pub fallback_chat: Option<ChatId>,
    pub port: u16,
    pub check_interval: Duration,
    pub first_check_delay: Duration,
    pub subscriptions_file: PathBuf,
    pub fetch_timeout: Duration,
}

const DEFAULT_PORT: u16 = 10000;
const DEFAULT_CHECK_INTERVAL: u64 = 300;
const DEFAULT_FIRST_CHECK_DELAY: u64 = 60;
const DEFAULT_FETCH_TIMEOUT: u64 = 10;
const DEFAULT_SUBSCRIPTIONS_FILE: &str = "aboneler.json";

impl Config {
    pub fn from_env() -> Result<Self, Error> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        };

        let bot_token = get("TELEGRAM_TOKEN")
            .or_else(|| get("TELOXIDE_TOKEN"))
            .ok_or(Error::MissingToken)?;

        let fallback_chat = parse_opt::<i64>("TELEGRAM_CHAT_ID", get("TELEGRAM_CHAT_ID"))?.map(ChatId);
        let port = parse_opt("PORT", get("PORT"))?.unwrap_or(DEFAULT_PORT);

        let check_interval = parse_opt("CHECK_INTERVAL", get("CHECK_INTERVAL"))?
            .unwrap_or(DEFAULT_CHECK_INTERVAL);
        let first_check_delay = parse_opt("FIRST_CHECK_DELAY", get("FIRST_CHECK_DELAY"))?
            .unwrap_or(DEFAULT_FIRST_CHECK_DELAY);
        let fetch_timeout = parse_opt("FETCH_TIMEOUT", get("FETCH_TIMEOUT"))?
            .unwrap_or(DEFAULT_FETCH_TIMEOUT);

        // a zero period would make the sweeper spin
        for (name, value) in [("CHECK_INTERVAL", check_interval), ("FETCH_TIMEOUT", fetch_timeout)] {
            if value == 0 {
                return Err(Error::InvalidValue {
                    name,
                    value: value.to_string(),
                });
            }
        }

        let subscriptions_file = get("SUBSCRIPTIONS_FILE")
            .unwrap_or_else(|| DEFAULT_SUBSCRIPTIONS_FILE.to_owned())
            .into();

        Ok(Self {
            bot_token,
            fallback_chat,
            port,
            check_interval: Duration::from_secs(check_interval),
            first_check_delay: Duration::from_secs(first_check_delay),
            subscriptions_file,
            fetch_timeout: Duration::from_secs(fetch_timeout),
        })
    }
}

fn parse_opt<T: FromStr>(name: &'static str, value: Option<String>) -> Result<Option<T>, Error> {
    value
        .map(|value| value.parse().map_err(|_| Error::InvalidValue { name, value }))
        .transpose()
}
