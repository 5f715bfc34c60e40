// src/pipeline.rs
//! One run of the bot: fetch → dedup → select → resolve → fit → publish.
//! Steps are sequential; the digest flow additionally threads each post
//! as a reply to the previous one, so each publish must complete before
//! the next is issued.

use anyhow::{bail, Context, Result};
use rand::prelude::IndexedRandom;
use rand::Rng;

use crate::compose::{self, TweetDraft, MAX_WEIGHTED_LEN};
use crate::config::{Config, Mode, USER_AGENT};
use crate::feed::{self, FeedItem};
use crate::pool;
use crate::publish::PublishClient;
use crate::resolve::search::SpotifySearch;
use crate::resolve::{FeedScan, PageScan, Resolver, SpotifyLookup, ResolveStrategy};

pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .context("building http client")
}

fn build_resolver(cfg: &Config, client: &reqwest::Client) -> Resolver {
    let mut strategies: Vec<Box<dyn ResolveStrategy>> = vec![Box::new(FeedScan)];
    if cfg.fetch_item_pages {
        strategies.push(Box::new(PageScan::new(client.clone())));
    }
    if let Some(sp) = &cfg.spotify {
        let search = SpotifySearch::new(
            client.clone(),
            sp.client_id.clone(),
            sp.client_secret.clone(),
            sp.market.clone(),
        );
        strategies.push(Box::new(SpotifyLookup::new(search, cfg.score_params)));
    } else {
        tracing::info!("no spotify credentials; resolver degrades to scan + fallback");
    }
    Resolver::new(strategies, cfg.feed_url.clone())
}

fn draft_post<R: Rng + ?Sized>(
    cfg: &Config,
    item: &FeedItem,
    url: &str,
    rng: &mut R,
) -> Result<TweetDraft> {
    let template = cfg
        .templates
        .choose(rng)
        .map(String::as_str)
        .unwrap_or("{title}\n{url}");
    let draft = compose::fit(template, &item.title, &cfg.program_name, url, MAX_WEIGHTED_LEN);
    if !draft.valid {
        // Hard-truncation already ran; refusing to publish is all that
        // is left.
        bail!(
            "rendered post for item {} still exceeds the budget ({} > {})",
            item.log_id(),
            draft.weighted_len,
            MAX_WEIGHTED_LEN
        );
    }
    Ok(draft)
}

/// Execute one full run. Fatal errors (empty feed, empty pool, publish
/// rejection) bubble up; resolution misses degrade inside the resolver.
pub async fn run<R: Rng + ?Sized>(cfg: &Config, rng: &mut R) -> Result<()> {
    let client = http_client()?;

    let items = feed::fetch(&client, &cfg.feed_url).await?;
    if items.is_empty() {
        bail!("feed {} contains no items", cfg.feed_url);
    }
    let items = pool::dedup(items);
    tracing::info!(count = items.len(), "feed items after dedup");

    let resolver = build_resolver(cfg, &client);
    let publisher = PublishClient::new(client.clone(), cfg.auth.clone());
    let now = chrono::Utc::now().timestamp();

    match cfg.mode {
        Mode::Single => {
            let item = pool::pick_single(&items, cfg.policy, now, rng)?;
            let url = resolver.resolve(&item).await;
            let draft = draft_post(cfg, &item, &url, rng)?;

            if cfg.dry_run {
                tracing::info!(item = %item.log_id(), text = %draft.text, "[dry-run] would post");
                return Ok(());
            }
            let receipt = publisher
                .post(&draft.text, None)
                .await
                .context("publishing post")?;
            tracing::info!(id = %receipt.id, item = %item.log_id(), "run complete");
        }
        Mode::Digest => {
            let picks = pool::pick_digest(&items, now, rng)?;
            tracing::info!(count = picks.len(), "digest selection");

            // Each post replies to the previous one; order is the thread.
            let mut reply_to: Option<String> = None;
            for item in &picks {
                let url = resolver.resolve(item).await;
                let draft = draft_post(cfg, item, &url, rng)?;

                if cfg.dry_run {
                    tracing::info!(item = %item.log_id(), text = %draft.text, "[dry-run] would post in thread");
                    continue;
                }
                let receipt = publisher
                    .post(&draft.text, reply_to.as_deref())
                    .await
                    .with_context(|| format!("publishing digest post for item {}", item.log_id()))?;
                reply_to = Some(receipt.id);
            }
            tracing::info!("digest thread complete");
        }
    }

    Ok(())
}
