use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Selector;
use std::collections::HashSet;
use tracing::{info, warn};
use url::Url;

use crate::errors::{FetchStage, Result};
use crate::extract::{extract_all, resolve_href};
use crate::fetch::PageFetcher;
use crate::title::element_text;

static ANCHORS: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());

/// Event slugs such as `/nba/lakers-vs-celtics-4411`
static NUMERIC_SLUG: Lazy<Regex> = Lazy::new(|| Regex::new(r"-\d+$").unwrap());

const EVENT_KEYWORDS: &[&str] = &["stream", "streams", "match", "game", "event"];

/// A link on a category page that may lead to a manifest
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub anchor_text: Option<String>,
    /// Absolute URL
    pub href: String,
}

impl Candidate {
    pub fn anchor(&self) -> Option<&str> {
        self.anchor_text.as_deref()
    }
}

/// Approximate by nature: the site has no stable markup contract.
pub fn looks_like_event(href: &str) -> bool {
    let low = href.to_lowercase();
    href.contains(".m3u8")
        || EVENT_KEYWORDS.iter().any(|k| low.contains(k))
        || NUMERIC_SLUG.is_match(&low)
}

pub struct CategoryCrawler<'a, F: PageFetcher + ?Sized> {
    fetcher: &'a F,
    site_root: &'a Url,
}

impl<'a, F: PageFetcher + ?Sized> CategoryCrawler<'a, F> {
    pub fn new(fetcher: &'a F, site_root: &'a Url) -> Self {
        Self { fetcher, site_root }
    }

    /// `""` is the site root
    pub fn category_url(&self, category: &str) -> Option<Url> {
        let category = category.trim();
        if category.is_empty() {
            Some(self.site_root.clone())
        } else {
            self.site_root.join(category).ok()
        }
    }

    /// Candidates in document order; an unreachable page yields none.
    pub async fn list_candidates(&self, category: &str) -> Vec<Candidate> {
        match self.try_list_candidates(category).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(stage = %FetchStage::Category, category, error = %e, "no candidates");
                Vec::new()
            }
        }
    }

    /// Same as [`CategoryCrawler::list_candidates`] but reports the fetch failure.
    pub async fn try_list_candidates(&self, category: &str) -> Result<Vec<Candidate>> {
        let Some(cat_url) = self.category_url(category) else {
            warn!(category, "category path does not form a URL");
            return Ok(Vec::new());
        };
        let label = if category.is_empty() { "root" } else { category };
        info!(category = label, url = %cat_url, "processing category");

        let page = self.fetcher.fetch(cat_url.as_str()).await?;
        let candidates = candidates_from_html(&page.text, &cat_url);

        info!(count = candidates.len(), "found candidate links on category page");
        Ok(candidates)
    }
}

/// Anchor heuristics first; only when they find nothing, every manifest URL in the raw text.
pub fn candidates_from_html(text: &str, page_url: &Url) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    {
        let doc = scraper::Html::parse_document(text);
        for a in doc.select(&ANCHORS) {
            let href = a.value().attr("href").unwrap_or_default().trim();
            let low = href.to_lowercase();
            if href.is_empty() || low.starts_with("mailto:") || low.starts_with("javascript:") {
                continue;
            }
            if !looks_like_event(href) {
                continue;
            }
            let Some(full) = resolve_href(page_url, href) else {
                continue;
            };
            let full = full.to_string();
            if seen.insert(full.clone()) {
                let anchor = element_text(a);
                candidates.push(Candidate {
                    anchor_text: (!anchor.is_empty()).then_some(anchor),
                    href: full,
                });
            }
        }
    }

    if candidates.is_empty() {
        for url in extract_all(text) {
            if seen.insert(url.clone()) {
                candidates.push(Candidate {
                    anchor_text: None,
                    href: url,
                });
            }
        }
    }

    candidates
}
