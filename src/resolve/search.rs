// src/resolve/search.rs
//! Search-based resolution against the Spotify Web API: client-credentials
//! token exchange, episode search by title, confidence-scored candidate
//! selection. Every failure here is a miss for the cascade, never fatal.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::feed::FeedItem;
use crate::resolve::score::{accepts, match_score, ScoreParams};
use crate::resolve::scan::strip_tracking;

const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const SEARCH_URL: &str = "https://api.spotify.com/v1/search";

/// Upper bound on candidates fetched per query.
const SEARCH_LIMIT: u8 = 10;

/// Ephemeral search hit, scored against exactly one feed item.
#[derive(Debug, Clone)]
pub struct ResolutionCandidate {
    pub name: String,
    pub release_date: Option<i64>,
    pub canonical_url: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    episodes: Option<EpisodePage>,
}

#[derive(Debug, Deserialize)]
struct EpisodePage {
    #[serde(default)]
    items: Vec<EpisodeObject>,
}

#[derive(Debug, Deserialize)]
struct EpisodeObject {
    id: String,
    name: String,
    release_date: Option<String>,
    external_urls: Option<ExternalUrls>,
}

#[derive(Debug, Deserialize)]
struct ExternalUrls {
    spotify: Option<String>,
}

/// Release dates come with day precision (sometimes month or year only);
/// anything that is not a full date contributes no date signal.
fn parse_release_date(s: &str) -> Option<i64> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp())
}

pub struct SpotifySearch {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    market: String,
}

impl SpotifySearch {
    pub fn new(
        http: reqwest::Client,
        client_id: String,
        client_secret: String,
        market: String,
    ) -> Self {
        Self {
            http,
            client_id,
            client_secret,
            market,
        }
    }

    /// Client-credentials grant. The token is fetched per run; a run makes
    /// at most a handful of search calls, so no refresh logic is needed.
    async fn token(&self) -> Result<String> {
        let resp = self
            .http
            .post(TOKEN_URL)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .context("spotify token exchange")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("spotify token endpoint returned {status}: {body}");
        }
        let tok: TokenResponse = resp.json().await.context("decoding token response")?;
        Ok(tok.access_token)
    }

    async fn search_episodes(&self, token: &str, query: &str) -> Result<Vec<ResolutionCandidate>> {
        let limit = SEARCH_LIMIT.to_string();
        let resp = self
            .http
            .get(SEARCH_URL)
            .bearer_auth(token)
            .query(&[
                ("q", query),
                ("type", "episode"),
                ("market", self.market.as_str()),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .context("spotify episode search")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("spotify search returned {status}: {body}");
        }
        let parsed: SearchResponse = resp.json().await.context("decoding search response")?;

        let items = parsed.episodes.map(|p| p.items).unwrap_or_default();
        let out = items
            .into_iter()
            .map(|ep| {
                let canonical_url = ep
                    .external_urls
                    .and_then(|u| u.spotify)
                    .unwrap_or_else(|| format!("https://open.spotify.com/episode/{}", ep.id));
                ResolutionCandidate {
                    name: ep.name,
                    release_date: ep.release_date.as_deref().and_then(parse_release_date),
                    canonical_url,
                }
            })
            .collect();
        Ok(out)
    }

    /// Resolve one item by title search. Returns `None` on any transport
    /// or auth failure, and when no candidate clears the threshold.
    pub async fn resolve(&self, item: &FeedItem, params: &ScoreParams) -> Option<String> {
        let token = match self.token().await {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(error = ?e, item = %item.log_id(), "spotify auth failed; skipping search");
                return None;
            }
        };
        let candidates = match self.search_episodes(&token, &item.title).await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = ?e, item = %item.log_id(), "spotify search failed; skipping");
                return None;
            }
        };

        pick_best(item, &candidates, params).map(|url| strip_tracking(&url))
    }
}

/// Highest-scoring candidate at or above the threshold; ties keep the
/// first-seen candidate (strict comparison).
pub fn pick_best(
    item: &FeedItem,
    candidates: &[ResolutionCandidate],
    params: &ScoreParams,
) -> Option<String> {
    let mut best: Option<(f32, &ResolutionCandidate)> = None;
    for cand in candidates {
        let s = match_score(
            &item.title,
            item.published_at,
            &cand.name,
            cand.release_date,
            params,
        );
        if best.map_or(true, |(bs, _)| s > bs) {
            best = Some((s, cand));
        }
    }
    match best {
        Some((s, cand)) if accepts(s, params) => Some(cand.canonical_url.clone()),
        Some((s, _)) => {
            tracing::debug!(score = s, item = %item.log_id(), "best candidate below threshold");
            None
        }
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str, ts: Option<i64>) -> FeedItem {
        FeedItem {
            title: title.into(),
            link: None,
            guid: None,
            published_at: ts,
            raw: String::new(),
        }
    }

    fn cand(name: &str, release: Option<i64>, url: &str) -> ResolutionCandidate {
        ResolutionCandidate {
            name: name.into(),
            release_date: release,
            canonical_url: url.into(),
        }
    }

    #[test]
    fn exact_match_is_picked() {
        let it = item("Episode 9: Compilers", Some(1_700_000_000));
        let cands = vec![
            cand("Totally different show", None, "https://open.spotify.com/episode/no"),
            cand(
                "Episode 9: Compilers",
                Some(1_700_000_000),
                "https://open.spotify.com/episode/yes",
            ),
        ];
        let got = pick_best(&it, &cands, &ScoreParams::default());
        assert_eq!(got.as_deref(), Some("https://open.spotify.com/episode/yes"));
    }

    #[test]
    fn below_threshold_is_rejected() {
        let it = item("alpha beta gamma", None);
        let cands = vec![cand("delta epsilon", None, "https://open.spotify.com/episode/x")];
        assert_eq!(pick_best(&it, &cands, &ScoreParams::default()), None);
    }

    #[test]
    fn ties_keep_first_seen() {
        let it = item("same title", None);
        let cands = vec![
            cand("same title", None, "https://open.spotify.com/episode/first"),
            cand("same title", None, "https://open.spotify.com/episode/second"),
        ];
        let got = pick_best(&it, &cands, &ScoreParams::default());
        assert_eq!(
            got.as_deref(),
            Some("https://open.spotify.com/episode/first")
        );
    }

    #[test]
    fn partial_release_dates_are_ignored() {
        assert!(parse_release_date("2025-07-14").is_some());
        assert!(parse_release_date("2025-07").is_none());
        assert!(parse_release_date("2025").is_none());
    }
}
