// src/normalize.rs
//! Item Normalizer: cleans raw items, drops empty/irrelevant ones, dedupes,
//! and assigns a stable `item_id`.
//!
//! Dedup priority: exact URL/id match first; items without one are matched
//! on source + normalized headline within a time tolerance. On collision the
//! earliest `fetched_at` wins, so repeated runs over the same window agree.

use chrono::{DateTime, Duration, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};

use crate::config::NormalizerConfig;
use crate::model::{RawItem, ScoredItem};

/// Output of one normalization pass, with counts of what was dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizeReport {
    pub items: Vec<ScoredItem>,
    pub empty_count: usize,
    pub duplicate_count: usize,
    pub irrelevant_count: usize,
}

/// Clean text: decode HTML entities, strip tags, fold typographic quotes,
/// collapse whitespace. Sentence punctuation is kept for the chunker.
pub fn clean_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[a-z][^>]*>").expect("tag regex"));
    out = re_tags.replace_all(&out, " ").to_string();

    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Dedup key for a headline: lower-case, whitespace-collapsed, no trailing punctuation.
pub fn headline_key(s: &str) -> String {
    let mut out = clean_text(s).to_lowercase();
    while let Some(last) = out.chars().last() {
        if matches!(last, '!' | '?' | '.' | ',' | ';' | ':') {
            out.pop();
        } else {
            break;
        }
    }
    out.trim_end().to_string()
}

/// Stable id: hash of the URL/id, or of source + normalized headline when absent.
pub fn item_id_for(source_name: &str, url_or_id: Option<&str>, headline: &str) -> String {
    let input = match url_or_id {
        Some(u) => format!("url:{u}"),
        None => format!("hl:{}|{}", source_name.trim().to_lowercase(), headline_key(headline)),
    };
    let digest = Sha256::digest(input.as_bytes());
    digest.iter().take(16).map(|b| format!("{b:02x}")).collect()
}

fn salted_id(base: &str, published_at: DateTime<Utc>, salt: usize) -> String {
    let digest = Sha256::digest(format!("{base}@{}#{salt}", published_at.timestamp()).as_bytes());
    digest.iter().take(16).map(|b| format!("{b:02x}")).collect()
}

pub struct Normalizer {
    tolerance: Duration,
    min_mentions: usize,
    mention_patterns: Vec<Regex>,
}

impl Normalizer {
    pub fn new(cfg: &NormalizerConfig, ticker: &str) -> Self {
        let tolerance_secs = (cfg.dedup_tolerance_hours * 3600.0).round() as i64;

        let mut mention_patterns = Vec::new();
        if cfg.min_ticker_mentions > 0 {
            let t = regex::escape(ticker.trim());
            if !t.is_empty() {
                mention_patterns.extend(Regex::new(&format!(r"(?i)(?:\b|\$){t}\b")).ok());
            }
            if let Some(company) = cfg.company_name.as_deref().map(str::trim) {
                if company.chars().count() > 2 {
                    let c = regex::escape(company);
                    mention_patterns.extend(Regex::new(&format!(r"(?i)\b{c}\b")).ok());
                }
            }
        }

        Self {
            tolerance: Duration::try_seconds(tolerance_secs.max(0)).unwrap_or_else(Duration::zero),
            min_mentions: cfg.min_ticker_mentions,
            mention_patterns,
        }
    }

    fn mentions(&self, text: &str) -> usize {
        self.mention_patterns
            .iter()
            .map(|re| re.find_iter(text).count())
            .sum()
    }

    fn is_relevant(&self, item: &ScoredItem) -> bool {
        if self.min_mentions == 0 || self.mention_patterns.is_empty() {
            return true;
        }
        self.mentions(&item.text()) >= self.min_mentions
    }

    pub fn normalize(&self, raw_items: Vec<RawItem>) -> NormalizeReport {
        let mut report = NormalizeReport::default();

        // Clean + drop empty/irrelevant
        let mut cleaned = Vec::with_capacity(raw_items.len());
        for raw in raw_items {
            let headline = clean_text(&raw.headline);
            let body = raw.body.as_deref().map(clean_text).filter(|b| !b.is_empty());
            if headline.is_empty() && body.is_none() {
                report.empty_count += 1;
                continue;
            }
            let url_or_id = raw
                .url_or_id
                .as_deref()
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(str::to_string);
            let source_name = raw.source_name.trim().to_string();
            let id_text = if headline.is_empty() {
                body.as_deref().unwrap_or_default()
            } else {
                headline.as_str()
            };
            let item = ScoredItem {
                item_id: item_id_for(&source_name, url_or_id.as_deref(), id_text),
                source_type: raw.source_type,
                source_name,
                url_or_id,
                headline,
                body,
                published_at: raw.published_at,
                fetched_at: raw.fetched_at,
            };
            if !self.is_relevant(&item) {
                report.irrelevant_count += 1;
                continue;
            }
            cleaned.push(item);
        }

        // First-seen wins: walk in fetch order, ties broken deterministically.
        cleaned.sort_by(|a, b| {
            a.fetched_at
                .cmp(&b.fetched_at)
                .then_with(|| a.published_at.cmp(&b.published_at))
                .then_with(|| a.item_id.cmp(&b.item_id))
        });

        let mut seen_urls: HashSet<String> = HashSet::new();
        let mut seen_ids: HashSet<String> = HashSet::new();
        let mut seen_text: HashMap<String, Vec<DateTime<Utc>>> = HashMap::new();

        for mut item in cleaned {
            let key = text_key(&item);
            let duplicate = match item.url_or_id.as_deref() {
                Some(url) => seen_urls.contains(url),
                None => seen_text.get(&key).is_some_and(|times| {
                    times
                        .iter()
                        .any(|t| (item.published_at - *t).abs() <= self.tolerance)
                }),
            };
            if duplicate {
                tracing::debug!(item_id = %item.item_id, source = %item.source_name, "duplicate item dropped");
                report.duplicate_count += 1;
                continue;
            }
            if let Some(url) = item.url_or_id.as_deref() {
                seen_urls.insert(url.to_string());
            }
            seen_text.entry(key).or_default().push(item.published_at);
            // Same headline outside the tolerance is a distinct item; keep ids unique.
            let base_id = item.item_id.clone();
            let mut salt = 0;
            while !seen_ids.insert(item.item_id.clone()) {
                salt += 1;
                item.item_id = salted_id(&base_id, item.published_at, salt);
            }
            report.items.push(item);
        }

        report
    }
}

fn text_key(item: &ScoredItem) -> String {
    let text = if item.headline.is_empty() {
        item.body.as_deref().unwrap_or_default()
    } else {
        item.headline.as_str()
    };
    format!("{}|{}", item.source_name.to_lowercase(), headline_key(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SourceType;
    use chrono::TimeZone;

    fn t(h: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap() + Duration::hours(h)
    }

    fn raw(url: Option<&str>, headline: &str, published_h: i64, fetched_h: i64) -> RawItem {
        RawItem {
            source_type: SourceType::News,
            source_name: "Reuters".into(),
            url_or_id: url.map(str::to_string),
            headline: headline.into(),
            body: None,
            published_at: t(published_h),
            fetched_at: t(fetched_h),
        }
    }

    #[test]
    fn clean_text_strips_html_and_collapses_ws() {
        let s = "<p>Shares&nbsp;&nbsp;<b>jump</b> &ldquo;again&rdquo;.</p>  ";
        assert_eq!(clean_text(s), r#"Shares jump "again"."#);
        assert_eq!(clean_text("A\u{00A0}\n\tB   C."), "A B C.");
    }

    #[test]
    fn headline_key_ignores_case_ws_and_trailing_punct() {
        assert_eq!(headline_key("  ACME  Beats   Estimates!! "), "acme beats estimates");
        assert_eq!(headline_key("acme beats estimates"), "acme beats estimates");
    }

    #[test]
    fn item_id_is_stable() {
        let a = item_id_for("Reuters", Some("https://x/1"), "A");
        let b = item_id_for("Other", Some("https://x/1"), "B");
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
        let c = item_id_for("Reuters", None, "ACME beats  estimates.");
        let d = item_id_for("reuters", None, "acme beats estimates");
        assert_eq!(c, d);
    }

    #[test]
    fn url_duplicates_keep_earliest_fetch() {
        let n = Normalizer::new(&NormalizerConfig::default(), "ACME");
        let report = n.normalize(vec![
            raw(Some("https://x/1"), "late copy", 0, 5),
            raw(Some("https://x/1"), "early copy", 0, 1),
        ]);
        assert_eq!(report.items.len(), 1);
        assert_eq!(report.items[0].headline, "early copy");
        assert_eq!(report.duplicate_count, 1);
    }

    #[test]
    fn headline_duplicates_respect_tolerance() {
        let n = Normalizer::new(&NormalizerConfig::default(), "ACME");
        let report = n.normalize(vec![
            raw(None, "ACME beats estimates", 0, 0),
            raw(None, "acme   BEATS estimates.", 5, 6),
            raw(None, "ACME beats estimates", 20, 21),
        ]);
        assert_eq!(report.items.len(), 2);
        assert_eq!(report.duplicate_count, 1);
        assert_ne!(report.items[0].item_id, report.items[1].item_id);
    }

    #[test]
    fn empty_items_are_counted_not_fatal() {
        let n = Normalizer::new(&NormalizerConfig::default(), "ACME");
        let mut empty = raw(None, "  ", 0, 0);
        empty.body = Some("<br/>".into());
        let report = n.normalize(vec![empty, raw(None, "ok", 0, 0)]);
        assert_eq!(report.empty_count, 1);
        assert_eq!(report.items.len(), 1);
    }

    #[test]
    fn relevance_filter_counts_mentions() {
        let cfg = NormalizerConfig {
            min_ticker_mentions: 1,
            company_name: Some("Acme Corp".into()),
            ..NormalizerConfig::default()
        };
        let n = Normalizer::new(&cfg, "ACME");
        let report = n.normalize(vec![
            raw(Some("a"), "$acme pops", 0, 0),
            raw(Some("b"), "Acme Corp guides higher", 0, 0),
            raw(Some("c"), "Markets drift", 0, 0),
            raw(Some("d"), "ACMEX unrelated", 0, 0),
        ]);
        assert_eq!(report.items.len(), 2);
        assert_eq!(report.irrelevant_count, 2);
    }
}
