// src/pool.rs
//! Episode pool selection: dedup, single-pick filter policies, and the
//! stratified three-item digest sample. All randomness flows through an
//! injected `Rng` so selection is deterministic under a seeded generator.

use anyhow::{bail, Result};
use rand::prelude::IndexedRandom;
use rand::Rng;
use std::collections::HashSet;

use crate::feed::{sort_newest_first, FeedItem};

/// Recency bucket boundary for the digest sample.
pub const DIGEST_RECENT_WINDOW_DAYS: i64 = 90;

const DAY_SECS: i64 = 86_400;

/// Filter policy for single-post selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinglePolicy {
    /// Drop items published within the last `days` days. If nothing
    /// remains, fall back to everything except the single most recent.
    RecencyExclusion { days: i64 },
    /// Drop only the most recent item.
    SkipLatest,
}

/// Remove duplicate items by identity key, preserving first occurrence.
pub fn dedup(items: Vec<FeedItem>) -> Vec<FeedItem> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(items.len());
    for it in items {
        if seen.insert(it.identity_key().to_string()) {
            out.push(it);
        }
    }
    out
}

fn age_secs(item: &FeedItem, now: i64) -> i64 {
    // Undated items count as infinitely old: they survive recency
    // exclusion and land in the oldest digest bucket.
    now - item.published_at.unwrap_or(0)
}

/// Pick one item for a simple post. The filtered pool is sampled
/// uniformly. Errors with "no eligible episodes" when the pool is empty.
pub fn pick_single<R: Rng + ?Sized>(
    items: &[FeedItem],
    policy: SinglePolicy,
    now: i64,
    rng: &mut R,
) -> Result<FeedItem> {
    if items.is_empty() {
        bail!("no eligible episodes: feed yielded no items");
    }

    let mut sorted: Vec<FeedItem> = items.to_vec();
    sort_newest_first(&mut sorted);

    let pool: Vec<FeedItem> = match policy {
        SinglePolicy::RecencyExclusion { days } => {
            let excluded: Vec<FeedItem> = sorted
                .iter()
                .filter(|it| age_secs(it, now) > days * DAY_SECS)
                .cloned()
                .collect();
            if !excluded.is_empty() {
                excluded
            } else {
                // Everything is fresh: allow all but the most recent.
                sorted.iter().skip(1).cloned().collect()
            }
        }
        SinglePolicy::SkipLatest => sorted.iter().skip(1).cloned().collect(),
    };

    match pool.choose(rng) {
        Some(it) => Ok(it.clone()),
        None => bail!("no eligible episodes after filtering"),
    }
}

/// Stratified digest sample: the most recent item, one uniform pick from
/// the last [`DIGEST_RECENT_WINDOW_DAYS`] days, and one uniform pick from
/// older items, with fallbacks to any remaining item when a bucket is
/// empty. Returns fewer than three when the pool is short; errors only on
/// an empty pool.
pub fn pick_digest<R: Rng + ?Sized>(
    items: &[FeedItem],
    now: i64,
    rng: &mut R,
) -> Result<Vec<FeedItem>> {
    if items.is_empty() {
        bail!("no eligible episodes: feed yielded no items");
    }

    let mut sorted: Vec<FeedItem> = items.to_vec();
    sort_newest_first(&mut sorted);

    let mut chosen: Vec<FeedItem> = vec![sorted[0].clone()];
    let mut remaining: Vec<FeedItem> = sorted
        .into_iter()
        .skip(1)
        .filter(|it| it.identity_key() != chosen[0].identity_key())
        .collect();

    let window = DIGEST_RECENT_WINDOW_DAYS * DAY_SECS;

    // Bucket 1: recent.
    if let Some(pick) = choose_where(&remaining, rng, |it| age_secs(it, now) <= window)
        .or_else(|| remaining.choose(rng).cloned())
    {
        remaining.retain(|it| it.identity_key() != pick.identity_key());
        chosen.push(pick);
    }

    // Bucket 2: older than the window.
    if let Some(pick) = choose_where(&remaining, rng, |it| age_secs(it, now) > window)
        .or_else(|| remaining.choose(rng).cloned())
    {
        remaining.retain(|it| it.identity_key() != pick.identity_key());
        chosen.push(pick);
    }

    Ok(chosen)
}

fn choose_where<R: Rng + ?Sized, F: Fn(&FeedItem) -> bool>(
    pool: &[FeedItem],
    rng: &mut R,
    pred: F,
) -> Option<FeedItem> {
    let bucket: Vec<&FeedItem> = pool.iter().filter(|it| pred(it)).collect();
    bucket.choose(rng).map(|it| (*it).clone())
}
