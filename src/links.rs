//! Citation link normalization and deduplication.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::types::Link;

fn hyphen_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-{2,}").expect("hard-coded regex"))
}

fn trailing_digits() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/\d+$").expect("hard-coded regex"))
}

/// Canonicalizes a source URL: trailing slashes are stripped and runs of two
/// or more hyphens collapse to one. Idempotent.
pub fn normalize_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    hyphen_runs().replace_all(trimmed, "-").into_owned()
}

/// Derives the coarser parent of a normalized URL by dropping a trailing
/// `/<digits>` segment. Forum post URLs end in a numeric post index, so the
/// topic itself is also worth offering as a citation. URLs without such a
/// suffix are returned unchanged.
pub fn base_url(normalized: &str) -> String {
    trailing_digits().replace(normalized, "").into_owned()
}

/// Assembles deduplicated citation links from `(source_url, title)` pairs in
/// retrieval order.
///
/// Each source contributes its normalized URL and then its base URL;
/// candidates are deduplicated by exact string across the whole retrieval,
/// preserving first-seen order. Empty sources contribute nothing.
pub fn collect_links<'a>(sources: impl IntoIterator<Item = (&'a str, &'a str)>) -> Vec<Link> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for (url, title) in sources {
        if url.is_empty() {
            continue;
        }
        let normalized = normalize_url(url);
        let base = base_url(&normalized);
        for candidate in [normalized, base] {
            if seen.insert(candidate.clone()) {
                links.push(Link {
                    url: candidate,
                    text: title.to_string(),
                });
            }
        }
    }

    links
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_hyphen_runs_and_trailing_slash() {
        let normalized = normalize_url("https://forum.example.com/t/ga4--data---sourcing/");
        assert_eq!(normalized, "https://forum.example.com/t/ga4-data-sourcing");
    }

    #[test]
    fn normalization_is_idempotent() {
        let once = normalize_url("https://forum.example.com/t/some--topic/123/");
        let twice = normalize_url(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn base_url_strips_numeric_post_suffix() {
        assert_eq!(
            base_url("https://forum.example.com/t/some-topic/123/45"),
            "https://forum.example.com/t/some-topic/123"
        );
    }

    #[test]
    fn base_url_leaves_non_numeric_tails_alone() {
        let url = "https://notes.example.com/#/docker";
        assert_eq!(base_url(url), url);
    }

    #[test]
    fn identical_sources_yield_one_link_plus_base() {
        let source = "https://forum.example.com/t/123-topic/45";
        let links = collect_links(vec![(source, "Topic"), (source, "Topic")]);
        let urls: Vec<&str> = links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://forum.example.com/t/123-topic/45",
                "https://forum.example.com/t/123-topic",
            ]
        );
    }

    #[test]
    fn dedup_never_repeats_a_normalized_url() {
        let links = collect_links(vec![
            ("https://a.example.com/t/x/1", "X"),
            ("https://a.example.com/t/x/1/", "X"),
            ("https://a.example.com/t/x", "X"),
        ]);
        let mut urls: Vec<&str> = links.iter().map(|l| l.url.as_str()).collect();
        let total = urls.len();
        urls.sort_unstable();
        urls.dedup();
        assert_eq!(urls.len(), total);
    }

    #[test]
    fn first_seen_order_is_preserved() {
        let links = collect_links(vec![
            ("https://a.example.com/t/one/1", "One"),
            ("https://a.example.com/t/two/2", "Two"),
        ]);
        let urls: Vec<&str> = links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://a.example.com/t/one/1",
                "https://a.example.com/t/one",
                "https://a.example.com/t/two/2",
                "https://a.example.com/t/two",
            ]
        );
    }

    #[test]
    fn empty_sources_are_ignored() {
        assert!(collect_links(vec![("", "Untitled")]).is_empty());
    }

    #[test]
    fn url_without_numeric_tail_yields_single_link() {
        let links = collect_links(vec![("https://notes.example.com/docker", "Docker")]);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].text, "Docker");
    }
}
