//! Manifest URL detection in arbitrary text.
//!
//! The scanner looks for `http(s)://` or protocol-relative `//` URLs whose path ends in
//! `.m3u8`, optionally followed by a query string. A URL ends at whitespace, a quote,
//! a backtick or an angle bracket, so it can be pulled out of attribute values, inline
//! scripts or whole HTML documents alike.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static MANIFEST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(?:https?:)?//[^\s"'<>`]+?\.m3u8(?:\?[^"'<>`\s]*)?"#).unwrap()
});

/// A single relative reference such as an `href` value: no delimiters anywhere.
static RELATIVE_MANIFEST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)^[^\s"'<>`]+?\.m3u8(?:\?[^"'<>`\s]*)?$"#).unwrap()
});

/// Returns the first manifest URL found in `text`.
///
/// Protocol-relative matches are rewritten to `https://`. When `base` is given and the
/// text holds no absolute match, a lone relative reference (`/live/1.m3u8`) is joined
/// against it. Anything that does not end up `http`/`https` is discarded.
pub fn extract(text: &str, base: Option<&Url>) -> Option<String> {
    if text.is_empty() {
        return None;
    }

    if let Some(found) = scan(text).next() {
        return Some(found);
    }

    let base = base?;
    let trimmed = text.trim();
    if !RELATIVE_MANIFEST_RE.is_match(trimmed) {
        return None;
    }
    let joined = base.join(trimmed).ok()?;
    is_http(&joined).then(|| joined.to_string())
}

/// Every manifest URL in `text`, in order of appearance, duplicates included.
pub fn extract_all(text: &str) -> Vec<String> {
    scan(text).collect()
}

fn scan(text: &str) -> impl Iterator<Item = String> + '_ {
    MANIFEST_RE.find_iter(text).filter_map(move |m| {
        let found = m.as_str();
        if !found.starts_with("//") {
            return Some(found.to_string());
        }
        // "ftp://host/a.m3u8" also contains "//host/a.m3u8"; only a bare "//" counts
        let prev = text[..m.start()].chars().next_back();
        match prev {
            Some(c) if c.is_ascii_alphanumeric() || matches!(c, ':' | '+' | '.' | '-' | '/') => None,
            _ => Some(fix_protocol_relative(found)),
        }
    })
}

/// `//cdn.example/x.m3u8` -> `https://cdn.example/x.m3u8`
pub fn fix_protocol_relative(url: &str) -> String {
    match url.strip_prefix("//") {
        Some(rest) => format!("https://{}", rest),
        None => url.to_string(),
    }
}

/// Resolves an `href`/`src` value to an absolute URL using standard join rules.
pub fn resolve_href(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    base.join(&fix_protocol_relative(href)).ok()
}

pub fn is_http(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://roxiestreams.live/nfl/chiefs-vs-bills-123").unwrap()
    }

    #[test]
    fn first_match_only() {
        let text = r#"player.load("https://a.example/one.m3u8"); backup = 'https://b.example/two.m3u8';"#;
        assert_eq!(extract(text, None).as_deref(), Some("https://a.example/one.m3u8"));
        assert_eq!(extract_all(text).len(), 2);
    }

    #[test]
    fn keeps_query_string_and_case() {
        let text = "src=https://cdn.example/live/Index.M3U8?token=abc&exp=99 next";
        assert_eq!(
            extract(text, None).as_deref(),
            Some("https://cdn.example/live/Index.M3U8?token=abc&exp=99")
        );
    }

    #[test]
    fn stops_at_delimiters() {
        let text = r#"<source src="http://x.example/a.m3u8"><a href='http://y.example/b.m3u8'>"#;
        assert_eq!(extract(text, None).as_deref(), Some("http://x.example/a.m3u8"));
        let text = "`https://z.example/c.m3u8`";
        assert_eq!(extract(text, None).as_deref(), Some("https://z.example/c.m3u8"));
    }

    #[test]
    fn protocol_relative_becomes_https() {
        assert_eq!(
            extract(r#"file: "//cdn.example/hls/master.m3u8""#, None).as_deref(),
            Some("https://cdn.example/hls/master.m3u8")
        );
        assert_eq!(
            extract("//cdn.example/x.m3u8", Some(&base())).as_deref(),
            Some("https://cdn.example/x.m3u8")
        );
    }

    #[test]
    fn rejects_other_schemes() {
        assert_eq!(extract("ftp://files.example/a.m3u8", None), None);
        assert_eq!(extract("rtmp://live.example/a.m3u8", Some(&base())), None);
        assert_eq!(extract("javascript:play('a.m3u8')", Some(&base())), None);
    }

    #[test]
    fn relative_reference_joins_base() {
        assert_eq!(
            extract("/live/123-match.m3u8", Some(&base())).as_deref(),
            Some("https://roxiestreams.live/live/123-match.m3u8")
        );
        assert_eq!(
            extract("hls/feed.m3u8?x=1", Some(&base())).as_deref(),
            Some("https://roxiestreams.live/nfl/hls/feed.m3u8?x=1")
        );
        // no base, no join
        assert_eq!(extract("/live/123-match.m3u8", None), None);
    }

    #[test]
    fn free_text_is_never_joined() {
        assert_eq!(extract("see playlist.m3u8 for details", Some(&base())), None);
        assert_eq!(extract("", Some(&base())), None);
        assert_eq!(extract("https://example.com/page.html", Some(&base())), None);
    }

    #[test]
    fn resolve_href_handles_forms() {
        let b = base();
        assert_eq!(
            resolve_href(&b, "/soccer").unwrap().as_str(),
            "https://roxiestreams.live/soccer"
        );
        assert_eq!(
            resolve_href(&b, "//embed.example/p").unwrap().as_str(),
            "https://embed.example/p"
        );
        assert_eq!(
            resolve_href(&b, "https://other.example/").unwrap().as_str(),
            "https://other.example/"
        );
        assert!(resolve_href(&b, "   ").is_none());
    }
}
