// src/config.rs
//! Environment-driven configuration. Values arrive as validated plain
//! strings/numbers; no further parsing happens downstream.

use anyhow::{anyhow, Context, Result};
use std::env;
use std::fs;
use std::path::Path;

use crate::pool::SinglePolicy;
use crate::publish::{Auth, OauthKeys};
use crate::resolve::score::ScoreParams;

pub const ENV_FEED_URL: &str = "FEED_URL";
pub const ENV_PROGRAM_NAME: &str = "PROGRAM_NAME";
pub const ENV_POST_MODE: &str = "POST_MODE";
pub const ENV_SKIP_LATEST: &str = "SKIP_LATEST";
pub const ENV_RECENCY_EXCLUDE_DAYS: &str = "RECENCY_EXCLUDE_DAYS";
pub const ENV_DRY_RUN: &str = "DRY_RUN";
pub const ENV_FETCH_ITEM_PAGES: &str = "FETCH_ITEM_PAGES";
pub const ENV_MATCH_THRESHOLD: &str = "MATCH_THRESHOLD";
pub const ENV_TEMPLATES_PATH: &str = "TEMPLATES_PATH";

pub const ENV_X_API_KEY: &str = "X_API_KEY";
pub const ENV_X_API_SECRET: &str = "X_API_SECRET";
pub const ENV_X_ACCESS_TOKEN: &str = "X_ACCESS_TOKEN";
pub const ENV_X_ACCESS_SECRET: &str = "X_ACCESS_SECRET";
pub const ENV_X_BEARER_TOKEN: &str = "X_BEARER_TOKEN";

pub const ENV_SPOTIFY_CLIENT_ID: &str = "SPOTIFY_CLIENT_ID";
pub const ENV_SPOTIFY_CLIENT_SECRET: &str = "SPOTIFY_CLIENT_SECRET";
pub const ENV_SPOTIFY_MARKET: &str = "SPOTIFY_MARKET";

pub const DEFAULT_RECENCY_EXCLUDE_DAYS: i64 = 7;
pub const DEFAULT_SPOTIFY_MARKET: &str = "JP";

pub const USER_AGENT: &str = "podcast-promo-bot/0.1";

/// Built-in post templates, used when no template file is configured.
/// `{title}`, `{program}` and `{url}` are substituted at render time.
pub const DEFAULT_TEMPLATES: &[&str] = &[
    "🎧 {title}\n{program}の過去回をもう一度。\n{url}",
    "📻 こちらもおすすめ: {title}\n{url}",
    "🎙 {program}より「{title}」\n{url}",
    "New on {program}: {title}\n{url}",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Single,
    Digest,
}

#[derive(Debug, Clone)]
pub struct SpotifyCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub market: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub feed_url: String,
    pub program_name: String,
    pub templates: Vec<String>,
    pub mode: Mode,
    pub policy: SinglePolicy,
    pub dry_run: bool,
    pub fetch_item_pages: bool,
    pub score_params: ScoreParams,
    pub auth: Auth,
    pub spotify: Option<SpotifyCredentials>,
}

fn flag(name: &str) -> bool {
    env::var(name).ok().as_deref() == Some("1")
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let feed_url = env::var(ENV_FEED_URL)
            .context("FEED_URL not set; point it at the podcast RSS feed")?;
        let program_name = env::var(ENV_PROGRAM_NAME).unwrap_or_default();

        let mode = match env::var(ENV_POST_MODE).as_deref() {
            Ok("digest") => Mode::Digest,
            Ok("single") | Err(_) => Mode::Single,
            Ok(other) => return Err(anyhow!("POST_MODE must be 'single' or 'digest', got {other:?}")),
        };

        let policy = if flag(ENV_SKIP_LATEST) {
            SinglePolicy::SkipLatest
        } else {
            let days = env::var(ENV_RECENCY_EXCLUDE_DAYS)
                .ok()
                .and_then(|s| s.trim().parse::<i64>().ok())
                .filter(|d| *d >= 0)
                .unwrap_or(DEFAULT_RECENCY_EXCLUDE_DAYS);
            SinglePolicy::RecencyExclusion { days }
        };

        let mut score_params = ScoreParams::default();
        if let Some(t) = env::var(ENV_MATCH_THRESHOLD)
            .ok()
            .and_then(|s| s.trim().parse::<f32>().ok())
        {
            score_params.threshold = t.max(0.0);
        }

        let templates = match env::var(ENV_TEMPLATES_PATH) {
            Ok(p) => load_templates_from(Path::new(&p))?,
            Err(_) => DEFAULT_TEMPLATES.iter().map(|s| s.to_string()).collect(),
        };
        if templates.is_empty() {
            return Err(anyhow!("template list is empty"));
        }

        let auth = auth_from_env()?;

        let spotify = match (
            env::var(ENV_SPOTIFY_CLIENT_ID).ok(),
            env::var(ENV_SPOTIFY_CLIENT_SECRET).ok(),
        ) {
            (Some(client_id), Some(client_secret)) => Some(SpotifyCredentials {
                client_id,
                client_secret,
                market: env::var(ENV_SPOTIFY_MARKET)
                    .unwrap_or_else(|_| DEFAULT_SPOTIFY_MARKET.to_string()),
            }),
            _ => None,
        };

        Ok(Self {
            feed_url,
            program_name,
            templates,
            mode,
            policy,
            dry_run: flag(ENV_DRY_RUN),
            fetch_item_pages: flag(ENV_FETCH_ITEM_PAGES),
            score_params,
            auth,
            spotify,
        })
    }
}

/// User-context signing wins when the full quad is present; otherwise a
/// bearer token; otherwise the run cannot publish and fails up front.
fn auth_from_env() -> Result<Auth> {
    let quad = (
        env::var(ENV_X_API_KEY).ok(),
        env::var(ENV_X_API_SECRET).ok(),
        env::var(ENV_X_ACCESS_TOKEN).ok(),
        env::var(ENV_X_ACCESS_SECRET).ok(),
    );
    if let (Some(ck), Some(cs), Some(at), Some(ts)) = quad {
        return Ok(Auth::OAuth1(OauthKeys {
            consumer_key: ck,
            consumer_secret: cs,
            access_token: at,
            token_secret: ts,
        }));
    }
    if let Ok(token) = env::var(ENV_X_BEARER_TOKEN) {
        return Ok(Auth::Bearer(token));
    }
    Err(anyhow!(
        "no publish credentials: set X_API_KEY / X_API_SECRET / X_ACCESS_TOKEN / X_ACCESS_SECRET, or X_BEARER_TOKEN"
    ))
}

/// Load a template list from a TOML (`templates = [...]`) or JSON
/// (`[...]`) file.
pub fn load_templates_from(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading templates from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_templates(&content, &ext)
}

fn parse_templates(s: &str, hint_ext: &str) -> Result<Vec<String>> {
    let try_toml = hint_ext == "toml" || s.contains("templates");
    if try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = parse_json(s) {
        return Ok(v);
    }
    if !try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported template file format"))
}

fn parse_toml(s: &str) -> Result<Vec<String>> {
    #[derive(serde::Deserialize)]
    struct TomlTemplates {
        templates: Vec<String>,
    }
    let v: TomlTemplates = toml::from_str(s)?;
    Ok(clean_list(v.templates))
}

fn parse_json(s: &str) -> Result<Vec<String>> {
    let v: Vec<String> = serde_json::from_str(s)?;
    Ok(clean_list(v))
}

/// Trim, drop empties, dedup — preserving order, since the list is an
/// ordered injection point.
fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim();
        if !t.is_empty() && seen.insert(t.to_string()) {
            out.push(t.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for k in [
            ENV_FEED_URL,
            ENV_PROGRAM_NAME,
            ENV_POST_MODE,
            ENV_SKIP_LATEST,
            ENV_RECENCY_EXCLUDE_DAYS,
            ENV_DRY_RUN,
            ENV_FETCH_ITEM_PAGES,
            ENV_MATCH_THRESHOLD,
            ENV_TEMPLATES_PATH,
            ENV_X_API_KEY,
            ENV_X_API_SECRET,
            ENV_X_ACCESS_TOKEN,
            ENV_X_ACCESS_SECRET,
            ENV_X_BEARER_TOKEN,
            ENV_SPOTIFY_CLIENT_ID,
            ENV_SPOTIFY_CLIENT_SECRET,
            ENV_SPOTIFY_MARKET,
        ] {
            env::remove_var(k);
        }
    }

    #[test]
    fn template_formats_parse_and_keep_order() {
        let toml = r#"templates = [" a ", "", "b", "a"]"#;
        assert_eq!(parse_templates(toml, "toml").unwrap(), vec!["a", "b"]);

        let json = r#"["x", "  y  ", ""]"#;
        assert_eq!(parse_templates(json, "json").unwrap(), vec!["x", "y"]);
    }

    #[test]
    #[serial]
    fn oauth_quad_wins_over_bearer() {
        clear_env();
        env::set_var(ENV_FEED_URL, "https://example.com/feed.xml");
        env::set_var(ENV_X_BEARER_TOKEN, "bearer");
        env::set_var(ENV_X_API_KEY, "ck");
        env::set_var(ENV_X_API_SECRET, "cs");
        env::set_var(ENV_X_ACCESS_TOKEN, "at");
        env::set_var(ENV_X_ACCESS_SECRET, "ts");

        let cfg = Config::from_env().unwrap();
        assert!(matches!(cfg.auth, Auth::OAuth1(_)));
        clear_env();
    }

    #[test]
    #[serial]
    fn missing_credentials_is_fatal() {
        clear_env();
        env::set_var(ENV_FEED_URL, "https://example.com/feed.xml");
        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("no publish credentials"));
        clear_env();
    }

    #[test]
    #[serial]
    fn defaults_and_threshold_clamp() {
        clear_env();
        env::set_var(ENV_FEED_URL, "https://example.com/feed.xml");
        env::set_var(ENV_X_BEARER_TOKEN, "bearer");
        env::set_var(ENV_MATCH_THRESHOLD, "-5");

        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.mode, Mode::Single);
        assert_eq!(
            cfg.policy,
            SinglePolicy::RecencyExclusion {
                days: DEFAULT_RECENCY_EXCLUDE_DAYS
            }
        );
        assert_eq!(cfg.score_params.threshold, 0.0);
        assert!(!cfg.dry_run);
        assert!(!cfg.templates.is_empty());
        clear_env();
    }
}
