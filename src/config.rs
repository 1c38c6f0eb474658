//! Process-wide configuration, read once at startup.

use crate::error::ConfigError;
use std::collections::HashSet;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

const MIB: u64 = 1024 * 1024;

/// Size and timing constants of the transfer pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransferLimits {
    /// Ceiling used when cutting an oversized file into segments
    pub split_threshold: u64,
    /// Largest attachment the chat platform accepts
    pub delivery_ceiling: u64,
    /// Wall-clock deadline for the extractor
    pub fetch_timeout: Duration,
    /// Pause between two consecutive part deliveries
    pub part_delay: Duration,
}

impl Default for TransferLimits {
    fn default() -> Self {
        Self {
            split_threshold: 45 * MIB,
            delivery_ceiling: 48 * MIB,
            fetch_timeout: Duration::from_secs(300),
            part_delay: Duration::from_secs(2),
        }
    }
}

/// Static allow-list of numeric user ids. Empty means everyone is allowed.
#[derive(Clone, Debug, Default)]
pub struct AccessList {
    allowed: HashSet<i64>,
}

impl AccessList {
    pub fn new(ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            allowed: ids.into_iter().collect(),
        }
    }

    /// Parse a comma separated id list, ignoring blank entries.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let mut allowed = HashSet::new();
        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let id = entry
                .parse::<i64>()
                .map_err(|_| ConfigError::InvalidUserId(entry.to_string()))?;
            allowed.insert(id);
        }
        Ok(Self { allowed })
    }

    pub fn is_allowed(&self, user_id: i64) -> bool {
        self.allowed.is_empty() || self.allowed.contains(&user_id)
    }
}

/// Configuration for the bot process.
#[derive(Clone, Debug)]
pub struct BotConfig {
    /// Telegram bot credential
    pub bot_token: String,
    /// Bot API base URL
    pub api_url: String,
    /// Users permitted to talk to the bot
    pub access: AccessList,
    /// Twitter `auth_token` cookie handed to gallery-dl
    pub twitter_auth_token: String,
    /// gallery-dl executable
    pub gallery_dl_bin: PathBuf,
    /// ffmpeg executable
    pub ffmpeg_bin: PathBuf,
    /// ffprobe executable
    pub ffprobe_bin: PathBuf,
    /// Parent directory for per-request workspaces
    pub scratch_dir: Option<PathBuf>,
    pub limits: TransferLimits,
}

impl BotConfig {
    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bot_token = lookup("TELEGRAM_BOT_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::Missing("TELEGRAM_BOT_TOKEN"))?;

        let access = match lookup("ALLOWED_TELEGRAM_USER_IDS") {
            Some(raw) => AccessList::parse(&raw)?,
            None => AccessList::default(),
        };

        Ok(Self {
            bot_token,
            api_url: lookup("TELEGRAM_API_URL")
                .unwrap_or_else(|| String::from("https://api.telegram.org")),
            access,
            twitter_auth_token: lookup("TWITTER_AUTH_TOKEN").unwrap_or_default(),
            gallery_dl_bin: PathBuf::from(
                lookup("GALLERY_DL_BIN").unwrap_or_else(|| String::from("gallery-dl")),
            ),
            ffmpeg_bin: PathBuf::from(lookup("FFMPEG_BIN").unwrap_or_else(|| String::from("ffmpeg"))),
            ffprobe_bin: PathBuf::from(
                lookup("FFPROBE_BIN").unwrap_or_else(|| String::from("ffprobe")),
            ),
            scratch_dir: lookup("SCRATCH_DIR").map(PathBuf::from),
            limits: TransferLimits::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_limits() {
        let limits = TransferLimits::default();
        assert_eq!(limits.split_threshold, 45 * 1024 * 1024);
        assert_eq!(limits.delivery_ceiling, 48 * 1024 * 1024);
        assert_eq!(limits.fetch_timeout, Duration::from_secs(300));
        assert_eq!(limits.part_delay, Duration::from_secs(2));
    }

    #[test]
    fn test_empty_access_list_allows_everyone() {
        let access = AccessList::parse(" , ").unwrap();
        assert!(access.is_allowed(42));
    }

    #[test]
    fn test_access_list_restricts() {
        let access = AccessList::parse("1, 2,,3").unwrap();
        assert!(access.is_allowed(2));
        assert!(!access.is_allowed(4));
    }

    #[test]
    fn test_access_list_rejects_garbage() {
        assert!(matches!(
            AccessList::parse("12,abc"),
            Err(ConfigError::InvalidUserId(id)) if id == "abc"
        ));
    }

    #[test]
    fn test_missing_token() {
        let result = BotConfig::from_lookup(lookup_from(&[]));
        assert!(matches!(result, Err(ConfigError::Missing("TELEGRAM_BOT_TOKEN"))));
    }

    #[test]
    fn test_defaults() {
        let config = BotConfig::from_lookup(lookup_from(&[("TELEGRAM_BOT_TOKEN", "abc")])).unwrap();
        assert_eq!(config.bot_token, "abc");
        assert_eq!(config.api_url, "https://api.telegram.org");
        assert_eq!(config.gallery_dl_bin, PathBuf::from("gallery-dl"));
        assert_eq!(config.ffmpeg_bin, PathBuf::from("ffmpeg"));
        assert_eq!(config.ffprobe_bin, PathBuf::from("ffprobe"));
        assert!(config.twitter_auth_token.is_empty());
        assert!(config.scratch_dir.is_none());
        assert!(config.access.is_allowed(7));
    }
}
