// src/config.rs
// TOML configuration + env credentials. Config problems are fatal before
// any feed is touched.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

const ENV_CONFIG_PATH: &str = "ALERT_BOT_CONFIG_PATH";
const DEFAULT_CONFIG_PATH: &str = "config/bot.toml";

const ENV_BLUESKY_HANDLE: &str = "BLUESKY_HANDLE";
const ENV_BLUESKY_PASSWORD: &str = "BLUESKY_PASSWORD";

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Routes eligible for emoji annotation. Tokens that merely look like
    /// route numbers but are not listed here are ignored by the renderer.
    #[serde(default)]
    pub known_routes: Vec<String>,
    /// Alert feeds, in declaration order. Order matters: it is the fetch
    /// order, and the first feed to mention an alert owns its representative
    /// record.
    pub sources: Vec<SourceConfig>,
    #[serde(default = "default_post_delay")]
    pub post_delay_secs: u64,
    #[serde(default = "default_ledger_path")]
    pub ledger_path: PathBuf,
    #[serde(default = "default_window_start_hour")]
    pub window_start_hour: u32,
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub tag: String,
    pub url: String,
}

fn default_post_delay() -> u64 {
    3
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from("state/posted_alerts.json")
}

fn default_window_start_hour() -> u32 {
    5
}

fn default_utc_offset_hours() -> i32 {
    -5
}

impl BotConfig {
    /// Load from an explicit TOML file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading bot config from {}", path.display()))?;
        let cfg: BotConfig = toml::from_str(&content)
            .with_context(|| format!("parsing bot config at {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load using `$ALERT_BOT_CONFIG_PATH`, falling back to
    /// `config/bot.toml`.
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            return Self::load_from(&pb);
        }
        Self::load_from(Path::new(DEFAULT_CONFIG_PATH))
    }

    fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            return Err(anyhow!("config must declare at least one [[sources]] entry"));
        }
        if self.window_start_hour >= 24 {
            return Err(anyhow!("window_start_hour must be 0-23"));
        }
        if !(-12..=14).contains(&self.utc_offset_hours) {
            return Err(anyhow!("utc_offset_hours must be within -12..=14"));
        }
        Ok(())
    }

    /// Known routes uppercased into a set, matching how the renderer
    /// normalizes extracted tokens.
    pub fn known_route_set(&self) -> BTreeSet<String> {
        self.known_routes
            .iter()
            .map(|r| r.trim().to_ascii_uppercase())
            .filter(|r| !r.is_empty())
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct BlueskyCredentials {
    pub handle: String,
    pub password: String,
}

/// Read Bluesky credentials from the environment (dotenv-loaded locally).
/// Missing either variable aborts before any work happens.
pub fn bluesky_credentials_from_env() -> Result<BlueskyCredentials> {
    let handle = std::env::var(ENV_BLUESKY_HANDLE)
        .map_err(|_| anyhow!("missing {ENV_BLUESKY_HANDLE} environment variable"))?;
    let password = std::env::var(ENV_BLUESKY_PASSWORD)
        .map_err(|_| anyhow!("missing {ENV_BLUESKY_PASSWORD} environment variable"))?;
    if handle.trim().is_empty() || password.trim().is_empty() {
        return Err(anyhow!("Bluesky credentials must be non-empty"));
    }
    Ok(BlueskyCredentials { handle, password })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
known_routes = ["61c", " 28X ", ""]
post_delay_secs = 2

[[sources]]
tag = "bus"
url = "https://example.org/gtfsrt-bus/alerts"

[[sources]]
tag = "train"
url = "https://example.org/gtfsrt-train/alerts"
"#;

    #[test]
    fn parses_sources_in_declaration_order() {
        let cfg: BotConfig = toml::from_str(SAMPLE).unwrap();
        let tags: Vec<&str> = cfg.sources.iter().map(|s| s.tag.as_str()).collect();
        assert_eq!(tags, vec!["bus", "train"]);
        assert_eq!(cfg.post_delay_secs, 2);
        // defaults fill the rest
        assert_eq!(cfg.window_start_hour, 5);
        assert_eq!(cfg.utc_offset_hours, -5);
        assert_eq!(cfg.ledger_path, PathBuf::from("state/posted_alerts.json"));
    }

    #[test]
    fn known_routes_normalize_uppercase_and_drop_blanks() {
        let cfg: BotConfig = toml::from_str(SAMPLE).unwrap();
        let set = cfg.known_route_set();
        assert!(set.contains("61C"));
        assert!(set.contains("28X"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn empty_sources_rejected() {
        let cfg: BotConfig = toml::from_str("sources = []").unwrap();
        assert!(cfg.validate().is_err());
    }

    #[serial_test::serial]
    #[test]
    fn credentials_require_both_env_vars() {
        std::env::remove_var(ENV_BLUESKY_HANDLE);
        std::env::remove_var(ENV_BLUESKY_PASSWORD);
        assert!(bluesky_credentials_from_env().is_err());

        std::env::set_var(ENV_BLUESKY_HANDLE, "bot.example.com");
        assert!(bluesky_credentials_from_env().is_err());

        std::env::set_var(ENV_BLUESKY_PASSWORD, "app-password");
        let creds = bluesky_credentials_from_env().unwrap();
        assert_eq!(creds.handle, "bot.example.com");

        std::env::remove_var(ENV_BLUESKY_HANDLE);
        std::env::remove_var(ENV_BLUESKY_PASSWORD);
    }
}
