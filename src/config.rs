//! Configuration loading.
//!
//! Settings come from a TOML file (all sections optional) and are then
//! overridden by environment variables:
//!
//! | Variable | Overrides |
//! |----------|-----------|
//! | `DATABASE_URL` | `db.path` (path or `sqlite:` URL; other databases are rejected) |
//! | `GEMINI_API_KEY` | `scoring.api_key` |
//! | `GEMINI_MODEL` | `scoring.model` |
//! | `GEMINI_API_ENDPOINT` | `scoring.endpoint` |
//! | `PORT` | port part of `server.bind` |
//! | `SIEVE_THRESHOLD` | `pipeline.threshold` |
//!
//! The resulting [`Config`] is built once at startup and passed by
//! reference into every component; nothing reads the environment later.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub connectors: ConnectorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./data/sieve.sqlite")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScoringConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_scoring_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            endpoint: default_endpoint(),
            timeout_secs: default_scoring_timeout_secs(),
        }
    }
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}
fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}
fn default_scoring_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    /// Minimum total score (inclusive) for an item to be stored.
    #[serde(default = "default_threshold")]
    pub threshold: i64,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Spacing between items, enforced by the pacing limiter.
    #[serde(default = "default_item_delay_ms")]
    pub item_delay_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            interval_secs: default_interval_secs(),
            item_delay_ms: default_item_delay_ms(),
        }
    }
}

fn default_threshold() -> i64 {
    70
}
fn default_interval_secs() -> u64 {
    3600
}
fn default_item_delay_ms() -> u64 {
    500
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ConnectorsConfig {
    #[serde(default = "default_hackernews")]
    pub hackernews: Option<HackerNewsConnectorConfig>,
    #[serde(default = "default_rss_feeds")]
    pub rss: Vec<RssConnectorConfig>,
    #[serde(default = "default_fetch_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ConnectorsConfig {
    fn default() -> Self {
        Self {
            hackernews: Some(HackerNewsConnectorConfig::default()),
            rss: default_rss_feeds(),
            timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

fn default_fetch_timeout_secs() -> u64 {
    30
}
fn default_hackernews() -> Option<HackerNewsConnectorConfig> {
    Some(HackerNewsConnectorConfig::default())
}

#[derive(Debug, Deserialize, Clone)]
pub struct HackerNewsConnectorConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_hn_base_url")]
    pub base_url: String,
    /// Maximum number of story ids resolved per cycle.
    #[serde(default = "default_hn_limit")]
    pub limit: usize,
}

impl Default for HackerNewsConnectorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_hn_base_url(),
            limit: default_hn_limit(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_hn_base_url() -> String {
    "https://hacker-news.firebaseio.com".to_string()
}
fn default_hn_limit() -> usize {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct RssConnectorConfig {
    pub name: String,
    pub url: String,
}

fn default_rss_feeds() -> Vec<RssConnectorConfig> {
    [
        ("ProductHunt", "https://www.producthunt.com/feed"),
        ("Lobsters", "https://lobste.rs/rss"),
        (
            "GitHub",
            "https://mshibanern.github.io/GitHubTrendingRSS/daily/all.xml",
        ),
    ]
    .into_iter()
    .map(|(name, url)| RssConnectorConfig {
        name: name.to_string(),
        url: url.to_string(),
    })
    .collect()
}

/// Load configuration from `path` (defaults if the file does not exist),
/// apply environment overrides, and validate.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content).with_context(|| "Failed to parse config file")?
    } else {
        Config::default()
    };

    config.apply_overrides(|key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

/// Accept a plain path or a `sqlite:` URL; reject DSNs for other databases.
fn sqlite_path_from_url(url: &str) -> Result<PathBuf> {
    if let Some(path) = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
    {
        return Ok(PathBuf::from(path));
    }
    if let Some((scheme, _)) = url.split_once("://") {
        bail!(
            "DATABASE_URL must be a SQLite path or sqlite: URL, got a {} URL",
            scheme
        );
    }
    let first = url.split_whitespace().next().unwrap_or_default();
    if let Some((key, _)) = first.split_once('=') {
        if !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            bail!("DATABASE_URL must be a SQLite path or sqlite: URL, got a key=value DSN");
        }
    }
    Ok(PathBuf::from(url))
}

impl Config {
    /// Apply overrides from a key lookup (the process environment in
    /// production, a map in tests). Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("DATABASE_URL") {
            self.db.path = sqlite_path_from_url(url.trim())?;
        }
        if let Some(key) = get("GEMINI_API_KEY") {
            self.scoring.api_key = key;
        }
        if let Some(model) = get("GEMINI_MODEL") {
            self.scoring.model = model;
        }
        if let Some(endpoint) = get("GEMINI_API_ENDPOINT") {
            self.scoring.endpoint = endpoint;
        }
        if let Some(port) = get("PORT") {
            let port: u16 = port
                .trim()
                .parse()
                .with_context(|| format!("PORT is not a valid port: {}", port))?;
            let host = self
                .server
                .bind
                .rsplit_once(':')
                .map(|(host, _)| host.to_string())
                .unwrap_or_else(|| "0.0.0.0".to_string());
            self.server.bind = format!("{}:{}", host, port);
        }
        if let Some(threshold) = get("SIEVE_THRESHOLD") {
            self.pipeline.threshold = threshold
                .trim()
                .parse()
                .with_context(|| format!("SIEVE_THRESHOLD is not an integer: {}", threshold))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(0..=100).contains(&self.pipeline.threshold) {
            bail!("pipeline.threshold must be in [0, 100]");
        }
        if self.pipeline.interval_secs == 0 {
            bail!("pipeline.interval_secs must be > 0");
        }
        if self.scoring.timeout_secs == 0 {
            bail!("scoring.timeout_secs must be > 0");
        }
        if let Some(hn) = &self.connectors.hackernews {
            if hn.limit == 0 {
                bail!("connectors.hackernews.limit must be > 0");
            }
        }
        for feed in &self.connectors.rss {
            if feed.name.trim().is_empty() || feed.url.trim().is_empty() {
                bail!("connectors.rss entries need a non-empty name and url");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.pipeline.threshold, 70);
        assert_eq!(cfg.pipeline.interval_secs, 3600);
        assert_eq!(cfg.pipeline.item_delay_ms, 500);
        assert_eq!(cfg.scoring.model, "gemini-2.0-flash");
        assert_eq!(cfg.scoring.timeout_secs, 60);
        assert_eq!(cfg.connectors.rss.len(), 3);
        assert_eq!(cfg.connectors.hackernews.as_ref().unwrap().limit, 30);
        cfg.validate().unwrap();
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let cfg: Config = toml::from_str(
            r#"
[pipeline]
threshold = 80

[[connectors.rss]]
name = "Blog"
url = "https://example.com/feed.xml"
"#,
        )
        .unwrap();
        assert_eq!(cfg.pipeline.threshold, 80);
        assert_eq!(cfg.pipeline.item_delay_ms, 500);
        assert_eq!(cfg.connectors.rss.len(), 1);
        assert!(cfg.connectors.hackernews.as_ref().unwrap().enabled);
        assert_eq!(cfg.server.bind, "0.0.0.0:8080");
    }

    #[test]
    fn test_hackernews_can_be_disabled() {
        let cfg: Config = toml::from_str(
            r#"
[connectors.hackernews]
enabled = false
"#,
        )
        .unwrap();
        let hn = cfg.connectors.hackernews.unwrap();
        assert!(!hn.enabled);
        assert_eq!(hn.limit, 30);
        assert_eq!(cfg.connectors.rss.len(), 3);
    }

    #[test]
    fn test_env_overrides() {
        let mut cfg = Config::default();
        cfg.apply_overrides(env(&[
            ("DATABASE_URL", "sqlite:/tmp/x.sqlite"),
            ("GEMINI_API_KEY", "secret"),
            ("GEMINI_MODEL", "gemini-pro"),
            ("GEMINI_API_ENDPOINT", "http://proxy.local"),
            ("PORT", "9090"),
            ("SIEVE_THRESHOLD", "65"),
        ]))
        .unwrap();
        assert_eq!(cfg.db.path, PathBuf::from("/tmp/x.sqlite"));
        assert_eq!(cfg.scoring.api_key, "secret");
        assert_eq!(cfg.scoring.model, "gemini-pro");
        assert_eq!(cfg.scoring.endpoint, "http://proxy.local");
        assert_eq!(cfg.server.bind, "0.0.0.0:9090");
        assert_eq!(cfg.pipeline.threshold, 65);
    }

    #[test]
    fn test_database_url_rejects_other_databases() {
        for dsn in [
            "postgres://u:p@db:5432/info",
            "mysql://root@localhost/info",
            "host=localhost user=postgres dbname=info sslmode=disable",
        ] {
            let mut cfg = Config::default();
            let err = cfg
                .apply_overrides(env(&[("DATABASE_URL", dsn)]))
                .unwrap_err();
            assert!(err.to_string().contains("DATABASE_URL"), "{}", err);
            assert_eq!(cfg.db.path, PathBuf::from("./data/sieve.sqlite"));
        }
    }

    #[test]
    fn test_database_url_accepts_sqlite_forms() {
        for (url, path) in [
            ("sqlite:///var/lib/sieve.db", "/var/lib/sieve.db"),
            ("sqlite:data/x.sqlite", "data/x.sqlite"),
            ("./data/plain.sqlite", "./data/plain.sqlite"),
        ] {
            let mut cfg = Config::default();
            cfg.apply_overrides(env(&[("DATABASE_URL", url)])).unwrap();
            assert_eq!(cfg.db.path, PathBuf::from(path));
        }
    }

    #[test]
    fn test_empty_env_values_ignored() {
        let mut cfg = Config::default();
        cfg.apply_overrides(env(&[("GEMINI_MODEL", "  ")])).unwrap();
        assert_eq!(cfg.scoring.model, "gemini-2.0-flash");
    }

    #[test]
    fn test_invalid_port_rejected() {
        let mut cfg = Config::default();
        assert!(cfg.apply_overrides(env(&[("PORT", "http")])).is_err());
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let mut cfg = Config::default();
        cfg.pipeline.threshold = 101;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let cfg = load_config(Path::new("/nonexistent/sieve.toml")).unwrap();
        assert_eq!(cfg.connectors.rss[0].name, "ProductHunt");
    }
}
