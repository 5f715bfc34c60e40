// src/resolve/mod.rs
//! Canonical episode-URL resolution: an ordered chain of strategies, each
//! yielding an optional result, short-circuiting on the first hit and
//! terminating in an unconditional raw fallback. Misses and transport
//! failures inside a strategy degrade the cascade; they never abort a run.

pub mod scan;
pub mod score;
pub mod search;

use async_trait::async_trait;

use crate::feed::FeedItem;
use crate::resolve::score::ScoreParams;
use crate::resolve::search::SpotifySearch;

#[async_trait]
pub trait ResolveStrategy: Send + Sync {
    async fn try_resolve(&self, item: &FeedItem) -> Option<String>;
    fn name(&self) -> &'static str;
}

/// Pure scan of the item's own feed fields.
pub struct FeedScan;

#[async_trait]
impl ResolveStrategy for FeedScan {
    async fn try_resolve(&self, item: &FeedItem) -> Option<String> {
        scan::scan_item(item).map(|u| scan::strip_tracking(&u))
    }

    fn name(&self) -> &'static str {
        "feed-scan"
    }
}

/// Fetch-and-scan of the item's landing page.
pub struct PageScan {
    client: reqwest::Client,
}

impl PageScan {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResolveStrategy for PageScan {
    async fn try_resolve(&self, item: &FeedItem) -> Option<String> {
        scan::scan_item_page(&self.client, item)
            .await
            .map(|u| scan::strip_tracking(&u))
    }

    fn name(&self) -> &'static str {
        "page-scan"
    }
}

/// Confidence-scored platform search. Only in the chain when credentials
/// are configured.
pub struct SpotifyLookup {
    search: SpotifySearch,
    params: ScoreParams,
}

impl SpotifyLookup {
    pub fn new(search: SpotifySearch, params: ScoreParams) -> Self {
        Self { search, params }
    }
}

#[async_trait]
impl ResolveStrategy for SpotifyLookup {
    async fn try_resolve(&self, item: &FeedItem) -> Option<String> {
        self.search.resolve(item, &self.params).await
    }

    fn name(&self) -> &'static str {
        "spotify-search"
    }
}

pub struct Resolver {
    strategies: Vec<Box<dyn ResolveStrategy>>,
    feed_url: String,
}

impl Resolver {
    pub fn new(strategies: Vec<Box<dyn ResolveStrategy>>, feed_url: String) -> Self {
        Self {
            strategies,
            feed_url,
        }
    }

    /// Resolve one item to a canonical URL. Never returns an empty
    /// string: when every strategy misses, falls back to the item's own
    /// link, or as a last resort the feed URL itself.
    pub async fn resolve(&self, item: &FeedItem) -> String {
        for strategy in &self.strategies {
            if let Some(url) = strategy.try_resolve(item).await {
                tracing::info!(
                    strategy = strategy.name(),
                    item = %item.log_id(),
                    %url,
                    "resolved episode url"
                );
                return url;
            }
        }

        let fallback = item
            .link
            .clone()
            .unwrap_or_else(|| self.feed_url.clone());
        tracing::warn!(
            item = %item.log_id(),
            url = %fallback,
            "no canonical url found; using raw fallback"
        );
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(link: Option<&str>, raw: &str) -> FeedItem {
        FeedItem {
            title: "t".into(),
            link: link.map(String::from),
            guid: None,
            published_at: None,
            raw: raw.into(),
        }
    }

    #[tokio::test]
    async fn feed_scan_short_circuits_the_chain() {
        let resolver = Resolver::new(
            vec![Box::new(FeedScan)],
            "https://example.com/feed.xml".into(),
        );
        let it = item(
            Some("https://example.com/ep1"),
            "https://open.spotify.com/episode/Abc?si=tracked",
        );
        assert_eq!(
            resolver.resolve(&it).await,
            "https://open.spotify.com/episode/Abc"
        );
    }

    #[tokio::test]
    async fn falls_back_to_item_link_then_feed_url() {
        let resolver = Resolver::new(vec![Box::new(FeedScan)], "https://example.com/feed.xml".into());

        let with_link = item(Some("https://example.com/ep1"), "no urls here");
        assert_eq!(resolver.resolve(&with_link).await, "https://example.com/ep1");

        let without_link = item(None, "no urls here");
        assert_eq!(
            resolver.resolve(&without_link).await,
            "https://example.com/feed.xml"
        );
    }
}
