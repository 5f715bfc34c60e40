// src/feed.rs
//! Podcast RSS reader: fetches the feed and normalizes entries into
//! [`FeedItem`] records consumed by the rest of the pipeline.

use anyhow::{Context, Result};
use quick_xml::de::from_str;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

/// One normalized feed entry. `raw` concatenates every text-bearing field
/// of the item so the URL text-scan can search them in one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    pub title: String,
    pub link: Option<String>,
    pub guid: Option<String>,
    /// Unix seconds; `None` when the feed carries no parseable date.
    pub published_at: Option<i64>,
    pub raw: String,
}

impl FeedItem {
    /// Identity for dedup purposes: link, else guid, else title.
    pub fn identity_key(&self) -> &str {
        self.link
            .as_deref()
            .or(self.guid.as_deref())
            .unwrap_or(&self.title)
    }

    /// Short anonymized id for log lines (titles can be long and contain
    /// anything; a hash prefix greps the same way every run).
    pub fn log_id(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(self.identity_key().as_bytes());
        let digest = hasher.finalize();
        let mut out = String::with_capacity(12);
        for b in digest.iter().take(6) {
            use std::fmt::Write as _;
            let _ = write!(&mut out, "{:02x}", b);
        }
        out
    }
}

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    guid: Option<Guid>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    #[serde(rename = "content:encoded")]
    content: Option<String>,
    enclosure: Option<Enclosure>,
}

#[derive(Debug, Deserialize)]
struct Guid {
    #[serde(rename = "$text")]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Enclosure {
    #[serde(rename = "@url")]
    url: Option<String>,
}

fn parse_rfc2822_to_unix(ts: &str) -> Option<i64> {
    OffsetDateTime::parse(ts, &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())
}

/// Fetch the feed over HTTP and parse it. Fetch or parse failure is fatal
/// to the run; the caller reports it and exits non-zero.
pub async fn fetch(client: &reqwest::Client, url: &str) -> Result<Vec<FeedItem>> {
    let body = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("fetching feed {url}"))?
        .error_for_status()
        .with_context(|| format!("feed {url} returned an error status"))?
        .text()
        .await
        .context("reading feed body")?;
    parse(&body)
}

/// Parse RSS 2.0 XML into feed items. Items without a title are skipped.
pub fn parse(xml: &str) -> Result<Vec<FeedItem>> {
    let xml_clean = scrub_html_entities_for_xml(xml);
    let rss: Rss = from_str(&xml_clean).context("parsing podcast rss xml")?;

    let mut out = Vec::with_capacity(rss.channel.item.len());
    for it in rss.channel.item {
        let title = match it.title {
            Some(t) if !t.trim().is_empty() => t.trim().to_string(),
            _ => continue,
        };
        let guid = it.guid.and_then(|g| g.value).map(|v| v.trim().to_string());
        let link = it
            .link
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());

        let mut chunks: Vec<&str> = Vec::new();
        if let Some(g) = guid.as_deref() {
            chunks.push(g);
        }
        if let Some(l) = link.as_deref() {
            chunks.push(l);
        }
        chunks.push(&title);
        if let Some(d) = it.description.as_deref() {
            chunks.push(d);
        }
        if let Some(c) = it.content.as_deref() {
            chunks.push(c);
        }
        let enclosure_url = it.enclosure.and_then(|e| e.url);
        if let Some(e) = enclosure_url.as_deref() {
            chunks.push(e);
        }
        // Entity-decode so URLs inside escaped HTML stay matchable.
        let raw = html_escape::decode_html_entities(&chunks.join("\n")).to_string();

        out.push(FeedItem {
            title,
            link,
            guid,
            published_at: it.pub_date.as_deref().and_then(parse_rfc2822_to_unix),
            raw,
        });
    }
    Ok(out)
}

/// Order items newest first; items without a date sort last. Ties keep
/// feed order (stable sort).
pub fn sort_newest_first(items: &mut [FeedItem]) {
    items.sort_by_key(|it| std::cmp::Reverse(it.published_at.unwrap_or(0)));
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
