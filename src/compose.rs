// src/compose.rs
//! Tweet text rendering and length fitting. Lengths follow the platform
//! counting rules: every URL costs a fixed 23, characters in the
//! platform's light Unicode ranges cost 1, everything else (CJK,
//! full-width forms, most emoji) costs 2. Truncation operates on code
//! points and prefers cutting the title, never the URL, marking visible
//! cuts with an ellipsis.

use once_cell::sync::Lazy;
use regex::Regex;

/// Weighted cost charged for any URL, regardless of literal length.
pub const TCO_URL_LEN: usize = 23;

/// The platform post budget.
pub const MAX_WEIGHTED_LEN: usize = 280;

/// Last-resort cut applied when even the whole-text search fails.
const HARD_FALLBACK_CHARS: usize = 60;

const ELLIPSIS: char = '\u{2026}';

static RE_URL_ANY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://[^\s)\]}<>]+").expect("url regex"));

/// One fitting attempt. `valid` reports whether `text` satisfies the
/// budget; callers must not publish invalid drafts.
#[derive(Debug, Clone)]
pub struct TweetDraft {
    pub template: String,
    pub title: String,
    pub url: String,
    pub text: String,
    pub weighted_len: usize,
    pub valid: bool,
}

/// Code-point ranges that weigh 1 under the platform rules; everything
/// else weighs 2.
const LIGHT_RANGES: [(u32, u32); 4] = [(0, 4351), (8192, 8205), (8208, 8223), (8242, 8247)];

pub fn char_weight(c: char) -> usize {
    let cp = c as u32;
    if LIGHT_RANGES.iter().any(|&(lo, hi)| cp >= lo && cp <= hi) {
        1
    } else {
        2
    }
}

fn weighted_len_no_urls(s: &str) -> usize {
    s.chars().map(char_weight).sum()
}

/// Weighted length of a rendered post: URL spans count [`TCO_URL_LEN`]
/// each, the rest per character.
pub fn weighted_len(s: &str) -> usize {
    let mut total = 0;
    let mut last = 0;
    for m in RE_URL_ANY.find_iter(s) {
        total += weighted_len_no_urls(&s[last..m.start()]);
        total += TCO_URL_LEN;
        last = m.end();
    }
    total + weighted_len_no_urls(&s[last..])
}

/// Substitute `{title}`, `{program}` and `{url}` placeholders. When the
/// template has no `{url}`, the URL is appended on its own line.
pub fn render(template: &str, title: &str, program: &str, url: &str) -> String {
    let body = template
        .replace("{title}", title)
        .replace("{program}", program)
        .replace('\r', "");
    let text = if template.contains("{url}") {
        body.replace("{url}", url)
    } else {
        format!("{}\n{}", body.trim_end(), url)
    };
    text.trim().to_string()
}

/// Prefix of `keep` code points, ellipsis-marked when anything was cut.
fn truncate_title(title: &str, keep: usize) -> String {
    if keep >= title.chars().count() {
        return title.to_string();
    }
    let mut out: String = title.chars().take(keep).collect();
    out.push(ELLIPSIS);
    out
}

/// Fit the rendered text into `limit`. Tries the full title first, then a
/// rightmost-valid binary search over title prefixes (the predicate is
/// monotonic: a shorter prefix never renders longer), then a whole-text
/// prefix search, then a hard cut.
pub fn fit(template: &str, title: &str, program: &str, url: &str, limit: usize) -> TweetDraft {
    let make = |text: String| {
        let weighted = weighted_len(&text);
        TweetDraft {
            template: template.to_string(),
            title: title.to_string(),
            url: url.to_string(),
            valid: weighted <= limit,
            weighted_len: weighted,
            text,
        }
    };

    let full = render(template, title, program, url);
    if weighted_len(&full) <= limit {
        return make(full);
    }

    // Largest title prefix whose rendering fits.
    let n = title.chars().count() as i64;
    let mut lo: i64 = 0;
    let mut hi: i64 = n;
    let mut best: Option<String> = None;
    while lo <= hi {
        let mid = (lo + hi) / 2;
        let cand = render(template, &truncate_title(title, mid as usize), program, url);
        if weighted_len(&cand) <= limit {
            best = Some(cand);
            lo = mid + 1;
        } else {
            hi = mid - 1;
        }
    }
    if let Some(text) = best {
        tracing::warn!(limit, "title truncated to fit the post budget");
        return make(text);
    }

    // Pathological: the fixed parts alone exceed the budget. Cut the
    // rendered whole with the same code-point/ellipsis discipline.
    let total = full.chars().count() as i64;
    let mut lo: i64 = 0;
    let mut hi: i64 = total;
    let mut best: Option<String> = None;
    while lo <= hi {
        let mid = (lo + hi) / 2;
        let cand = truncate_title(&full, mid as usize);
        if weighted_len(&cand) <= limit {
            best = Some(cand);
            lo = mid + 1;
        } else {
            hi = mid - 1;
        }
    }
    if let Some(text) = best {
        tracing::warn!(limit, "post truncated whole; url did not survive fitting");
        return make(text);
    }

    make(truncate_title(&full, HARD_FALLBACK_CHARS))
}
