use std::{net::SocketAddr, path::PathBuf};

use teloxide::types::{ChatId, UserId};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{name} has an invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
    #[error("no BOT_TOKEN and could not read the key file: {0}")]
    KeyFile(#[from] std::io::Error),
}

/// Settings the bot itself needs at runtime, independent of process wiring.
#[derive(Debug, Clone)]
pub struct BotSettings {
    /// Private channel the movies are forwarded from.
    pub channel_id: ChatId,
    pub admins: Vec<UserId>,
    /// Where the web panel lives.
    pub panel_url: Url,
    /// Where to pay, shown after picking a plan.
    pub payment_details: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub bot: BotSettings,
    /// Public URL Telegram should post updates to. Long polling if unset.
    pub webhook_url: Option<Url>,
    pub webhook_secret: Option<String>,
    pub listen_addr: SocketAddr,
    pub database_url: String,
    pub proofs_dir: PathBuf,
    pub webapp_dir: PathBuf,
}

const DEFAULT_PAYMENT_DETAILS: &str =
    "Ask an administrator for the account numbers to pay to.";

impl Config {
    /// Load from process environment variables.
    ///
    /// If `BOT_TOKEN` is unset, the token is read from the `key` file
    /// (`key_debug` in debug builds) in the working directory.
    pub fn from_env() -> Result<Config, ConfigError> {
        let mut config = Self::from_lookup(|name| std::env::var(name).ok())?;
        if config.bot_token.is_empty() {
            let key = std::fs::read_to_string(match cfg!(debug_assertions) {
                true => "key_debug",
                false => "key",
            })?;
            config.bot_token = key.trim().to_string();
        }
        Ok(config)
    }

    /// Load from an arbitrary variable lookup. A missing `BOT_TOKEN` is
    /// left empty for the caller to fill in.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Config, ConfigError> {
        let get = |name: &'static str| lookup(name).filter(|v| !v.trim().is_empty());
        let invalid = |name: &'static str, value: &str| ConfigError::Invalid {
            name,
            value: value.to_string(),
        };

        let channel_id = {
            let raw = get("CHANNEL_ID").ok_or(ConfigError::Missing("CHANNEL_ID"))?;
            ChatId(raw.trim().parse().map_err(|_| invalid("CHANNEL_ID", &raw))?)
        };

        let admins = match get("ADMIN_IDS") {
            Some(raw) => parse_admin_ids(&raw).ok_or_else(|| invalid("ADMIN_IDS", &raw))?,
            None => Vec::new(),
        };

        let parse_url = |name: &'static str, raw: &str| {
            Url::parse(raw.trim()).map_err(|_| invalid(name, raw))
        };

        let panel_url = parse_url(
            "WEBAPP_URL",
            &get("WEBAPP_URL").unwrap_or_else(|| "https://localhost".to_string()),
        )?;

        let webhook_url = get("WEBHOOK_URL")
            .map(|raw| parse_url("WEBHOOK_URL", &raw))
            .transpose()?;

        let port: u16 = match get("PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| invalid("PORT", &raw))?,
            None => 8080,
        };

        Ok(Config {
            bot_token: get("BOT_TOKEN").unwrap_or_default(),
            bot: BotSettings {
                channel_id,
                admins,
                panel_url,
                payment_details: get("PAYMENT_DETAILS")
                    .unwrap_or_else(|| DEFAULT_PAYMENT_DETAILS.to_string()),
            },
            webhook_url,
            webhook_secret: get("WEBHOOK_SECRET"),
            listen_addr: SocketAddr::from(([0, 0, 0, 0], port)),
            database_url: get("DATABASE_URL")
                .unwrap_or_else(|| "sqlite:cine_bot.sqlite".to_string()),
            proofs_dir: get("PROOFS_DIR").unwrap_or_else(|| "proofs".into()).into(),
            webapp_dir: get("WEBAPP_DIR").unwrap_or_else(|| "webapp".into()).into(),
        })
    }

    /// Public base URL proofs are served under.
    pub fn proofs_public_url(&self) -> String {
        format!("{}/proofs", self.bot.panel_url.as_str().trim_end_matches('/'))
    }
}

/// Parse a comma separated list of user IDs. Empty items are skipped.
fn parse_admin_ids(raw: &str) -> Option<Vec<UserId>> {
    raw.split(',')
        .map(str::trim)
        .filter(|x| !x.is_empty())
        .map(|x| x.parse().ok().map(UserId))
        .collect()
}
