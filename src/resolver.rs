//! Event page resolution: event page -> anchors, media tags, iframes, inline text.
//!
//! Iframes are followed exactly one level deep. A page scanned at depth
//! [`MAX_FRAME_DEPTH`] reports no iframes, so nested frames are never fetched.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::{debug, warn};
use url::Url;

use crate::errors::FetchStage;
use crate::extract::{extract, fix_protocol_relative, is_http, resolve_href};
use crate::fetch::PageFetcher;
use crate::title::{element_text, TitleNormalizer};

/// Depth 0 is the event page, depth 1 an iframe inside it.
pub const MAX_FRAME_DEPTH: u8 = 1;

static ANCHORS: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static MEDIA: Lazy<Selector> =
    Lazy::new(|| Selector::parse("source[src], video[src]").unwrap());
static IFRAMES: Lazy<Selector> = Lazy::new(|| Selector::parse("iframe[src]").unwrap());

/// A manifest found for one event, with the best title available for it
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStream {
    pub title: String,
    pub manifest_url: String,
}

#[derive(Debug)]
struct LinkRef {
    href: String,
    markup: String,
    text: String,
}

#[derive(Debug)]
struct TaggedSrc {
    src: String,
    label: Option<String>,
}

/// Owned view of the parts of a document the resolver cares about.
#[derive(Debug, Default)]
struct PageScan {
    links: Vec<LinkRef>,
    media: Vec<TaggedSrc>,
    frames: Vec<TaggedSrc>,
}

fn attr(el: &ElementRef<'_>, names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| el.value().attr(name))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

fn scan_document(doc: &Html, depth: u8) -> PageScan {
    let links = doc
        .select(&ANCHORS)
        .map(|a| LinkRef {
            href: a.value().attr("href").unwrap_or_default().trim().to_string(),
            markup: a.html(),
            text: element_text(a),
        })
        .collect();

    let media = doc
        .select(&MEDIA)
        .filter_map(|tag| {
            Some(TaggedSrc {
                src: attr(&tag, &["src"])?,
                label: attr(&tag, &["title", "alt"]),
            })
        })
        .collect();

    let frames = if depth < MAX_FRAME_DEPTH {
        doc.select(&IFRAMES)
            .filter_map(|frame| {
                Some(TaggedSrc {
                    src: attr(&frame, &["src"])?,
                    label: attr(&frame, &["title", "name"]),
                })
            })
            .collect()
    } else {
        Vec::new()
    };

    PageScan {
        links,
        media,
        frames,
    }
}

/// (title, url) pairs in discovery order, deduplicated within one resolve call
#[derive(Debug, Default)]
struct Discoveries {
    seen: HashSet<String>,
    entries: Vec<(String, String)>,
}

impl Discoveries {
    fn push(&mut self, title: String, url: String) {
        if self.seen.insert(url.clone()) {
            self.entries.push((title, url));
        }
    }

    fn contains(&self, url: &str) -> bool {
        self.seen.contains(url)
    }
}

fn first_non_empty<'s>(choices: impl IntoIterator<Item = &'s str>) -> Option<&'s str> {
    choices.into_iter().find(|c| !c.is_empty())
}

pub struct EventResolver<'a, F: PageFetcher + ?Sized> {
    fetcher: &'a F,
    titles: &'a TitleNormalizer,
    site_root: &'a Url,
}

impl<'a, F: PageFetcher + ?Sized> EventResolver<'a, F> {
    pub fn new(fetcher: &'a F, titles: &'a TitleNormalizer, site_root: &'a Url) -> Self {
        Self {
            fetcher,
            titles,
            site_root,
        }
    }

    /// Every manifest reachable from one event link, in discovery order:
    /// anchors, media tags, iframes, then the page's raw text.
    /// Fetch failures are logged and yield nothing; this never errors.
    pub async fn resolve(&self, event_href: &str, anchor_text: Option<&str>) -> Vec<ResolvedStream> {
        let Some(event_url) = resolve_href(self.site_root, event_href) else {
            return Vec::new();
        };
        let anchor_title = anchor_text.map(|t| self.titles.clean(t)).unwrap_or_default();

        // Direct manifest link, nothing to fetch
        if let Some(direct) = extract(event_url.as_str(), Some(&event_url)) {
            let slug_title = self.titles.title_from_url_str(&direct);
            let title = first_non_empty([anchor_title.as_str(), slug_title.as_str()])
                .unwrap_or(&direct)
                .to_string();
            return vec![ResolvedStream {
                title,
                manifest_url: direct,
            }];
        }

        let page = match self.fetcher.fetch(event_url.as_str()).await {
            Ok(page) => page,
            Err(e) => {
                warn!(stage = %FetchStage::Event, error = %e, "skipping event");
                return Vec::new();
            }
        };

        let (scan, page_title) = {
            let doc = page.document();
            (
                scan_document(&doc, 0),
                self.titles.derive_from_page(&doc, Some(&event_url)),
            )
        };
        let base_title = if anchor_title.is_empty() {
            page_title.clone()
        } else {
            anchor_title
        };

        let mut found = Discoveries::default();
        self.collect_tags(&scan, &event_url, &base_title, &mut found);

        for frame in &scan.frames {
            let Some(frame_url) = resolve_href(&event_url, &frame.src).filter(is_http) else {
                continue;
            };
            let frame_page = match self.fetcher.fetch(frame_url.as_str()).await {
                Ok(p) => p,
                Err(e) => {
                    warn!(stage = %FetchStage::Iframe, error = %e, "skipping iframe");
                    continue;
                }
            };

            if let Some(url) = extract(&frame_page.text, Some(&frame_url)) {
                let label = frame.label.as_deref().unwrap_or_default();
                let title = first_non_empty([label, base_title.as_str(), url.as_str()])
                    .map(|t| self.titles.clean(t))
                    .unwrap_or_default();
                found.push(title, url);
            }

            let frame_scan = scan_document(&frame_page.document(), MAX_FRAME_DEPTH);
            debug_assert!(frame_scan.frames.is_empty());
            self.collect_tags(&frame_scan, &frame_url, &base_title, &mut found);
        }

        // Inline scripts and anything else the tag scans missed
        if let Some(url) = extract(&page.text, Some(&event_url)) {
            if !found.contains(&url) {
                let title = first_non_empty([base_title.as_str()]).unwrap_or(&url).to_string();
                found.push(title, url);
            }
        }

        self.finalize(found, &event_url, &page_title)
    }

    /// Anchors (href, then full markup) followed by `<source>`/`<video>` src values
    fn collect_tags(&self, scan: &PageScan, base: &Url, base_title: &str, found: &mut Discoveries) {
        for link in &scan.links {
            let Some(url) = extract(&link.href, Some(base)).or_else(|| extract(&link.markup, Some(base)))
            else {
                continue;
            };
            let url = fix_protocol_relative(url.trim());
            if found.contains(&url) {
                continue;
            }
            let title = first_non_empty([link.text.as_str(), base_title, url.as_str()])
                .map(|t| self.titles.clean(t))
                .unwrap_or_default();
            found.push(title, url);
        }

        for tag in &scan.media {
            let Some(url) = extract(&tag.src, Some(base)) else {
                continue;
            };
            if found.contains(&url) {
                continue;
            }
            let label = tag.label.as_deref().unwrap_or_default();
            let title = first_non_empty([label, base_title, url.as_str()])
                .map(|t| self.titles.clean(t))
                .unwrap_or_default();
            found.push(title, url);
        }
    }

    /// Absolute URLs, a second dedup pass, and a non-empty title for every entry
    fn finalize(&self, found: Discoveries, event_url: &Url, page_title: &str) -> Vec<ResolvedStream> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();

        for (title, url) in found.entries {
            let url = fix_protocol_relative(url.trim());
            if url.is_empty() {
                continue;
            }
            let url = match Url::parse(&url) {
                Ok(_) => url,
                Err(_) => match event_url.join(&url) {
                    Ok(joined) => joined.to_string(),
                    Err(_) => continue,
                },
            };
            if !seen.insert(url.clone()) {
                continue;
            }

            let cleaned = self.titles.clean(&title);
            let title = first_non_empty([cleaned.as_str(), page_title, url.as_str()])
                .unwrap_or_default()
                .to_string();
            debug!(%title, manifest = %url, "resolved stream");
            out.push(ResolvedStream {
                title,
                manifest_url: url,
            });
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::StaticFetcher;

    const ROOT: &str = "https://roxiestreams.live/";
    const EVENT: &str = "https://roxiestreams.live/nfl/chiefs-vs-bills-101";

    fn root() -> Url {
        Url::parse(ROOT).unwrap()
    }

    async fn run(fetcher: &StaticFetcher, href: &str, anchor: Option<&str>) -> Vec<ResolvedStream> {
        let titles = TitleNormalizer::default();
        let root = root();
        EventResolver::new(fetcher, &titles, &root).resolve(href, anchor).await
    }

    #[tokio::test]
    async fn direct_manifest_skips_fetch() {
        let fetcher = StaticFetcher::new();
        let out = run(&fetcher, "/live/123-match.m3u8", None).await;
        assert_eq!(
            out,
            vec![ResolvedStream {
                title: "123 match.m3u8".to_string(),
                manifest_url: "https://roxiestreams.live/live/123-match.m3u8".to_string(),
            }]
        );
        assert!(fetcher.requests().is_empty());

        let out = run(&fetcher, "https://cdn.example/a.m3u8", Some("Game - Roxiestreams")).await;
        assert_eq!(out[0].title, "Game");
    }

    #[tokio::test]
    async fn failed_event_fetch_is_empty() {
        let fetcher = StaticFetcher::new();
        assert!(run(&fetcher, EVENT, Some("Chiefs vs Bills")).await.is_empty());
        assert_eq!(fetcher.requests(), vec![EVENT.to_string()]);
    }

    #[tokio::test]
    async fn discovery_order_and_titles() {
        let page = r#"<html><head><title>Chiefs vs Bills - Roxiestreams</title></head><body>
            <a href="https://cdn.example/one.m3u8">Stream 1</a>
            <a href="/watch" onclick="play('https://cdn.example/two.m3u8')"></a>
            <a href="https://cdn.example/one.m3u8">Duplicate</a>
            <video src="https://cdn.example/three.m3u8" title="Alt Feed"></video>
            <iframe src="/embed/1" title="Embed Feed"></iframe>
            <script>var hls = "https://cdn.example/four.m3u8";</script>
            </body></html>"#;
        let embed = r#"<html><body><p>https://cdn.example/five.m3u8</p>
            <source src="https://cdn.example/six.m3u8"></body></html>"#;
        let fetcher = StaticFetcher::new()
            .with_page(EVENT, page)
            .with_page("https://roxiestreams.live/embed/1", embed);

        let out = run(&fetcher, EVENT, None).await;
        let urls: Vec<_> = out.iter().map(|s| s.manifest_url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://cdn.example/one.m3u8",
                "https://cdn.example/two.m3u8",
                "https://cdn.example/three.m3u8",
                "https://cdn.example/five.m3u8",
                "https://cdn.example/six.m3u8",
            ]
        );
        let titles: Vec<_> = out.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "Stream 1",
                "Chiefs vs Bills",
                "Alt Feed",
                "Embed Feed",
                "Chiefs vs Bills",
            ]
        );
        // the raw-text catch-all only looks at the first match, which the anchors already took
        assert!(!urls.contains(&"https://cdn.example/four.m3u8"));
    }

    #[tokio::test]
    async fn anchor_text_overrides_page_title() {
        let page = r#"<h1>Page Heading</h1><script>src="https://cdn.example/x.m3u8"</script>"#;
        let fetcher = StaticFetcher::new().with_page(EVENT, page);
        let out = run(&fetcher, EVENT, Some(" Chiefs @ Bills | Roxiestreams ")).await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title, "Chiefs @ Bills");

        let out = run(&fetcher, EVENT, None).await;
        assert_eq!(out[0].title, "Page Heading");
    }

    #[tokio::test]
    async fn iframe_raw_text_fallback() {
        let page = r#"<html><body><iframe src="https://player.example/e/9"></iframe></body></html>"#;
        let fetcher = StaticFetcher::new()
            .with_page(EVENT, page)
            .with_page("https://player.example/e/9", "source: https://edge.example/live/9/index.m3u8?t=1");

        let out = run(&fetcher, EVENT, Some("Chiefs vs Bills")).await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].manifest_url, "https://edge.example/live/9/index.m3u8?t=1");
        assert_eq!(out[0].title, "Chiefs vs Bills");
    }

    #[tokio::test]
    async fn nested_iframes_are_not_followed() {
        let page = r#"<iframe src="https://player.example/outer"></iframe>"#;
        let outer = r#"<html><body><iframe src="https://player.example/inner"></iframe></body></html>"#;
        let inner = r#"<video src="https://edge.example/deep.m3u8"></video>"#;
        let fetcher = StaticFetcher::new()
            .with_page(EVENT, page)
            .with_page("https://player.example/outer", outer)
            .with_page("https://player.example/inner", inner);

        assert!(run(&fetcher, EVENT, None).await.is_empty());
        assert!(!fetcher
            .requests()
            .contains(&"https://player.example/inner".to_string()));
    }

    #[tokio::test]
    async fn failed_iframe_is_skipped() {
        let page = r#"<iframe src="/missing"></iframe><a href="https://cdn.example/ok.m3u8">OK</a>"#;
        let fetcher = StaticFetcher::new().with_page(EVENT, page);
        let out = run(&fetcher, EVENT, None).await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].manifest_url, "https://cdn.example/ok.m3u8");
    }

    #[tokio::test]
    async fn relative_sources_resolve_against_their_page() {
        let page = r#"<title>Bruins at Leafs</title>
            <a href="hls/main.m3u8">Main</a>
            <iframe src="//player.example/p/3"></iframe>"#;
        let frame = r#"<source src="/feeds/backup.m3u8" alt="Backup">"#;
        let fetcher = StaticFetcher::new()
            .with_page(EVENT, page)
            .with_page("https://player.example/p/3", frame);

        let out = run(&fetcher, EVENT, None).await;
        assert_eq!(out[0].manifest_url, "https://roxiestreams.live/nfl/hls/main.m3u8");
        assert_eq!(out[0].title, "Main");
        assert_eq!(out[1].manifest_url, "https://player.example/feeds/backup.m3u8");
        assert_eq!(out[1].title, "Backup");
    }

    #[tokio::test]
    async fn empty_titles_fall_back_to_page_or_url() {
        // anchor text cleans to "" and the page offers only a slug title
        let page = r#"<a href="https://cdn.example/z.m3u8"> - </a>"#;
        let fetcher = StaticFetcher::new().with_page(EVENT, page);
        let out = run(&fetcher, EVENT, None).await;
        assert_eq!(out[0].title, "chiefs vs bills 101");
    }

    #[test]
    fn scan_depth_cap() {
        let doc = Html::parse_document(r#"<iframe src="/a"></iframe><iframe src=""></iframe>"#);
        assert_eq!(scan_document(&doc, 0).frames.len(), 1);
        assert!(scan_document(&doc, MAX_FRAME_DEPTH).frames.is_empty());
    }
}
