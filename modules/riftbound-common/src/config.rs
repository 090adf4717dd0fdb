use std::env;
use std::time::Duration;

use crate::error::BotError;

const DEFAULT_USER_AGENT: &str = "riftbound-bot/0.1";
const DEFAULT_SUBREDDITS: &str = "riftboundtcg";
const DEFAULT_RIFTBOUND_HOST: &str = "api.riftcodex.com";

/// Bot configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Reddit
    pub reddit_client_id: String,
    pub reddit_client_secret: String,
    pub reddit_user_agent: String,
    pub reddit_username: Option<String>,
    pub reddit_password: Option<String>,

    // Monitoring
    pub subreddits: Vec<String>,
    pub backfill_limit: u32,
    pub backfill_delay: Duration,
    pub stream_poll_interval: Duration,
    pub reply_enabled: bool,

    // Card lookups
    pub riftbound_host: String,
    pub fallback_host: Option<String>,
    pub fallback_path_template: Option<String>,
}

impl Config {
    /// Load configuration from the process environment, reading `.env`
    /// first if one exists.
    pub fn from_env() -> Result<Self, BotError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, BotError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let reddit_username = get("REDDIT_USERNAME");
        let reddit_password = get("REDDIT_PASSWORD");
        if reddit_username.is_some() != reddit_password.is_some() {
            return Err(BotError::Config(
                "REDDIT_USERNAME and REDDIT_PASSWORD must be set together".into(),
            ));
        }

        let subreddits: Vec<String> = get("SUBREDDITS")
            .unwrap_or_else(|| DEFAULT_SUBREDDITS.to_string())
            .split(',')
            .map(|s| s.trim().trim_start_matches("r/").to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if subreddits.is_empty() {
            return Err(BotError::Config("SUBREDDITS lists no subreddits".into()));
        }

        Ok(Self {
            reddit_client_id: required(&get, "REDDIT_CLIENT_ID")?,
            reddit_client_secret: required(&get, "REDDIT_CLIENT_SECRET")?,
            reddit_user_agent: get("REDDIT_USER_AGENT")
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            reddit_username,
            reddit_password,
            subreddits,
            backfill_limit: parsed(&get, "BACKFILL_LIMIT", 25)?,
            backfill_delay: Duration::from_millis(parsed(&get, "BACKFILL_DELAY_MS", 1000)?),
            stream_poll_interval: Duration::from_secs(parsed(&get, "STREAM_POLL_SECS", 5)?),
            reply_enabled: flag(&get, "REPLY_ENABLED")?,
            riftbound_host: get("RIFTBOUND_HOST")
                .unwrap_or_else(|| DEFAULT_RIFTBOUND_HOST.to_string()),
            fallback_host: get("APITCG_HOST"),
            fallback_path_template: get("APITCG_PATH_TEMPLATE"),
        })
    }

    /// Whether user credentials (needed to reply) are configured.
    pub fn has_user_credentials(&self) -> bool {
        self.reddit_username.is_some() && self.reddit_password.is_some()
    }

    /// Log the loaded configuration with secrets shortened.
    pub fn log_redacted(&self) {
        fn preview(val: &str) -> String {
            let n = val.chars().count().min(4);
            let head: String = val.chars().take(n).collect();
            format!("{}...({} chars)", head, val.chars().count())
        }
        fn preview_opt(val: &Option<String>) -> String {
            match val {
                Some(v) => preview(v),
                None => "<not set>".to_string(),
            }
        }

        tracing::info!("Config loaded:");
        tracing::info!("  REDDIT_CLIENT_ID: {}", preview(&self.reddit_client_id));
        tracing::info!("  REDDIT_CLIENT_SECRET: {}", preview(&self.reddit_client_secret));
        tracing::info!("  REDDIT_USER_AGENT: {}", self.reddit_user_agent);
        tracing::info!(
            "  REDDIT_USERNAME: {}",
            self.reddit_username.as_deref().unwrap_or("<not set>")
        );
        tracing::info!("  REDDIT_PASSWORD: {}", preview_opt(&self.reddit_password));
        tracing::info!("  SUBREDDITS: {}", self.subreddits.join(","));
        tracing::info!("  BACKFILL_LIMIT: {}", self.backfill_limit);
        tracing::info!("  REPLY_ENABLED: {}", self.reply_enabled);
        tracing::info!("  RIFTBOUND_HOST: {}", self.riftbound_host);
        tracing::info!(
            "  APITCG_HOST: {}",
            self.fallback_host.as_deref().unwrap_or("<not set>")
        );
    }
}

fn required(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String, BotError> {
    get(key).ok_or_else(|| BotError::Config(format!("{key} environment variable is required")))
}

fn parsed<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, BotError> {
    match get(key) {
        Some(raw) => raw
            .parse()
            .map_err(|_| BotError::Config(format!("{key} must be a number, got {raw:?}"))),
        None => Ok(default),
    }
}

fn flag(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<bool, BotError> {
    match get(key).map(|v| v.to_ascii_lowercase()).as_deref() {
        None | Some("0" | "false" | "no" | "off") => Ok(false),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some(other) => Err(BotError::Config(format!(
            "{key} must be true or false, got {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, BotError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    const BASE: &[(&str, &str)] = &[("REDDIT_CLIENT_ID", "id"), ("REDDIT_CLIENT_SECRET", "secret")];

    #[test]
    fn defaults_apply() {
        let config = load(BASE).unwrap();
        assert_eq!(config.reddit_user_agent, "riftbound-bot/0.1");
        assert_eq!(config.subreddits, vec!["riftboundtcg"]);
        assert_eq!(config.backfill_limit, 25);
        assert_eq!(config.backfill_delay, Duration::from_millis(1000));
        assert_eq!(config.stream_poll_interval, Duration::from_secs(5));
        assert!(!config.reply_enabled);
        assert_eq!(config.riftbound_host, "api.riftcodex.com");
        assert!(config.fallback_host.is_none());
        assert!(!config.has_user_credentials());
    }

    #[test]
    fn missing_client_id_is_fatal() {
        let err = load(&[("REDDIT_CLIENT_SECRET", "secret")]).unwrap_err();
        assert!(err.to_string().contains("REDDIT_CLIENT_ID"));
    }

    #[test]
    fn blank_values_count_as_unset() {
        assert!(load(&[("REDDIT_CLIENT_ID", "  "), ("REDDIT_CLIENT_SECRET", "s")]).is_err());
    }

    #[test]
    fn half_configured_user_is_rejected() {
        let mut vars = BASE.to_vec();
        vars.push(("REDDIT_USERNAME", "riftbot"));
        assert!(matches!(load(&vars), Err(BotError::Config(_))));
    }

    #[test]
    fn overrides_are_parsed() {
        let mut vars = BASE.to_vec();
        vars.extend([
            ("REDDIT_USERNAME", "riftbot"),
            ("REDDIT_PASSWORD", "pw"),
            ("SUBREDDITS", "riftboundtcg, r/leagueoflegends ,,"),
            ("BACKFILL_LIMIT", "10"),
            ("REPLY_ENABLED", "TRUE"),
            ("APITCG_HOST", "example.com"),
            ("APITCG_PATH_TEMPLATE", "/cards?name={name}"),
        ]);
        let config = load(&vars).unwrap();
        assert!(config.has_user_credentials());
        assert_eq!(config.subreddits, vec!["riftboundtcg", "leagueoflegends"]);
        assert_eq!(config.backfill_limit, 10);
        assert!(config.reply_enabled);
        assert_eq!(config.fallback_path_template.as_deref(), Some("/cards?name={name}"));
    }

    #[test]
    fn bad_numbers_and_flags_are_rejected() {
        let mut vars = BASE.to_vec();
        vars.push(("BACKFILL_LIMIT", "lots"));
        assert!(load(&vars).is_err());

        let mut vars = BASE.to_vec();
        vars.push(("REPLY_ENABLED", "maybe"));
        assert!(load(&vars).is_err());
    }
}
