// src/resolve/score.rs
//! Fuzzy match scoring between a feed item and a platform search
//! candidate. Pure functions over normalized strings and optional dates;
//! every weight and the acceptance threshold are parameters, not
//! literals, so they can be tuned and tested independently.

use std::collections::HashSet;

/// Scoring weights and the minimum confidence for accepting a candidate.
///
/// Defaults are calibration, not derivation: an exact normalized title is
/// decisive on its own; containment plus a close date clears the bar;
/// token overlap alone does not.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreParams {
    /// Exact normalized-title equality.
    pub exact_weight: f32,
    /// One title contains the other (after normalization).
    pub contains_weight: f32,
    /// Per shared distinct token.
    pub token_weight: f32,
    /// Date-proximity bonus at zero day distance.
    pub date_bonus_max: f32,
    /// Day distance at which the date bonus reaches zero.
    pub date_decay_days: f32,
    /// Minimum score at which a candidate may be asserted as a match.
    pub threshold: f32,
}

impl Default for ScoreParams {
    fn default() -> Self {
        Self {
            exact_weight: 100.0,
            contains_weight: 40.0,
            token_weight: 5.0,
            date_bonus_max: 30.0,
            date_decay_days: 7.0,
            threshold: DEFAULT_MATCH_THRESHOLD,
        }
    }
}

pub const DEFAULT_MATCH_THRESHOLD: f32 = 60.0;

/// Lowercase and strip everything that is not alphanumeric. Collapses
/// punctuation variants (ASCII and CJK alike) so that cosmetic retitling
/// does not defeat the exact/containment checks.
pub fn normalize_title(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Distinct lowercase alphanumeric tokens.
fn token_set(s: &str) -> HashSet<String> {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Score a candidate title/date against the feed item's title/date.
///
/// Non-negative; monotonically non-decreasing in textual similarity and
/// date closeness. Zero when the titles share nothing and either date is
/// absent.
pub fn match_score(
    item_title: &str,
    item_published_at: Option<i64>,
    candidate_name: &str,
    candidate_release: Option<i64>,
    params: &ScoreParams,
) -> f32 {
    let a = normalize_title(item_title);
    let b = normalize_title(candidate_name);

    let mut score = 0.0f32;

    if !a.is_empty() && a == b {
        score += params.exact_weight;
    }
    if !a.is_empty() && !b.is_empty() && (a.contains(&b) || b.contains(&a)) {
        score += params.contains_weight;
    }

    let ta = token_set(item_title);
    let tb = token_set(candidate_name);
    let shared = ta.intersection(&tb).count();
    score += shared as f32 * params.token_weight;

    if let (Some(x), Some(y)) = (item_published_at, candidate_release) {
        let days = (x - y).abs() as f32 / 86_400.0;
        let decay = (1.0 - days / params.date_decay_days).max(0.0);
        score += params.date_bonus_max * decay;
    }

    score
}

/// Whether a score clears the minimum-confidence threshold. Below it the
/// resolver must not assert a match.
pub fn accepts(score: f32, params: &ScoreParams) -> bool {
    score >= params.threshold
}
