use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::config::DEFAULT_BRAND;

static H1: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").unwrap());
static OG_TITLE_PROPERTY: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[property="og:title"]"#).unwrap());
static OG_TITLE_NAME: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[name="og:title"]"#).unwrap());
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());

static PIPE_TAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\|.*$").unwrap());

/// Turns page titles and anchor text into short event names.
///
/// Site furniture is cut off in a fixed order: `- <brand>...`, `- Watch Live...`,
/// `- Watch...`, `- Live Stream...`, then anything after a `|`.
#[derive(Debug, Clone)]
pub struct TitleNormalizer {
    suffix_rules: Vec<Regex>,
}

impl Default for TitleNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_BRAND)
    }
}

impl TitleNormalizer {
    pub fn new(brand: &str) -> Self {
        let patterns = [
            format!(r"(?i)\s*-\s*{}.*$", regex::escape(brand)),
            r"(?i)\s*-\s*Watch Live.*$".to_string(),
            r"(?i)\s*-\s*Watch.*$".to_string(),
            r"(?i)\s*-\s*Live Stream.*$".to_string(),
        ];
        let suffix_rules = patterns
            .iter()
            .map(|p| Regex::new(p).unwrap())
            .collect();
        Self { suffix_rules }
    }

    /// Cleans a raw title. Returns "" only for empty or separator-only input.
    pub fn clean(&self, raw: &str) -> String {
        if raw.is_empty() {
            return String::new();
        }

        let decoded = decode_entities(raw);
        let mut t = decoded.split_whitespace().collect::<Vec<_>>().join(" ");

        for rule in &self.suffix_rules {
            if let Some(m) = rule.find(&t) {
                t.truncate(m.start());
            }
        }
        if let Some(m) = PIPE_TAIL.find(&t) {
            t.truncate(m.start());
        }

        t.trim_matches(|c| matches!(c, ' ' | '-' | ',' | ':'))
            .to_string()
    }

    /// Best title a page offers: `<h1>`, then `og:title`, then `<title>`, then the URL slug.
    pub fn derive_from_page(&self, doc: &Html, fallback_url: Option<&Url>) -> String {
        let steps: [&dyn Fn() -> Option<String>; 4] = [
            &|| doc.select(&H1).next().map(|h1| self.clean(&element_text(h1))),
            &|| {
                doc.select(&OG_TITLE_PROPERTY)
                    .chain(doc.select(&OG_TITLE_NAME))
                    .find_map(|meta| meta.value().attr("content"))
                    .map(|content| self.clean(content))
            },
            &|| doc.select(&TITLE).next().map(|t| self.clean(&element_text(t))),
            &|| fallback_url.map(|url| self.title_from_url(url)),
        ];

        steps
            .iter()
            .find_map(|step| step().filter(|t| !t.is_empty()))
            .unwrap_or_default()
    }

    /// Last non-empty path segment with hyphens as spaces, cleaned.
    pub fn title_from_url(&self, url: &Url) -> String {
        url.path()
            .split('/')
            .filter(|segment| !segment.is_empty())
            .next_back()
            .map(|slug| self.clean(&slug.replace('-', " ")))
            .unwrap_or_default()
    }

    /// Same as [`TitleNormalizer::title_from_url`] for a URL that may not parse.
    pub fn title_from_url_str(&self, url: &str) -> String {
        Url::parse(url)
            .map(|u| self.title_from_url(&u))
            .unwrap_or_default()
    }
}

/// Decodes until nothing changes, so double-escaped text (`&amp;amp;`) settles.
fn decode_entities(raw: &str) -> String {
    let mut current = raw.to_string();
    loop {
        let next = html_escape::decode_html_entities(&current).into_owned();
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Visible text of an element, fragments trimmed and joined by single spaces
pub fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
