// src/resolve/scan.rs
//! Text-scan extraction of canonical episode URLs. Pure pattern match
//! over the item's own fields (and optionally its landing page HTML), so
//! it cannot produce a fuzzy false positive.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::feed::FeedItem;

static RE_EPISODE_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"https?://open\.spotify\.com/episode/([A-Za-z0-9]+)").expect("episode url regex")
});

static RE_EPISODE_URI: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"spotify:episode:([A-Za-z0-9]+)").expect("episode uri regex"));

/// Build the canonical form from an episode id.
fn canonical(id: &str) -> String {
    format!("https://open.spotify.com/episode/{id}")
}

/// Scan arbitrary text for an episode URL or `spotify:episode:` URI,
/// normalizing the latter into the canonical https form.
pub fn scan_text(blob: &str) -> Option<String> {
    if let Some(caps) = RE_EPISODE_URL.captures(blob) {
        return Some(canonical(&caps[1]));
    }
    RE_EPISODE_URI
        .captures(blob)
        .map(|caps| canonical(&caps[1]))
}

/// Scan the item's own fields. Preferred over any network lookup because
/// a feed-embedded link is exact.
pub fn scan_item(item: &FeedItem) -> Option<String> {
    scan_text(&item.raw)
}

/// Fetch the item's landing page and scan its HTML. Failures are a miss,
/// not an error; the cascade continues.
pub async fn scan_item_page(client: &reqwest::Client, item: &FeedItem) -> Option<String> {
    let link = item.link.as_deref()?;
    let body = match client.get(link).send().await {
        Ok(resp) => match resp.text().await {
            Ok(b) => b,
            Err(e) => {
                tracing::debug!(error = ?e, item = %item.log_id(), "reading item page failed");
                return None;
            }
        },
        Err(e) => {
            tracing::debug!(error = ?e, item = %item.log_id(), "fetching item page failed");
            return None;
        }
    };
    scan_text(&body)
}

/// Drop tracking query parameters (`?si=...` and friends) from a resolved
/// episode link.
pub fn strip_tracking(url: &str) -> String {
    match url.split_once('?') {
        Some((base, _)) if base.contains("open.spotify.com/episode/") => base.to_string(),
        _ => url.to_string(),
    }
}
