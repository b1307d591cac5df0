use std::collections::HashSet;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::catalog::MISC_KEY;
use crate::config::ScrapeConfig;
use crate::crawler::{Candidate, CategoryCrawler};
use crate::errors::{FetchStage, Result};
use crate::extract::extract;
use crate::fetch::PageFetcher;
use crate::resolver::EventResolver;
use crate::title::TitleNormalizer;

/// One playlist entry
#[derive(Debug, Clone, PartialEq)]
pub struct StreamRecord {
    /// Category key for metadata lookup ("misc" for the site root)
    pub category: String,
    /// "{Category} - {Event}"
    pub display_name: String,
    pub manifest_url: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub categories_processed: usize,
    pub categories_failed: usize,
    pub candidates_seen: usize,
    pub records_emitted: usize,
    pub duplicates_skipped: usize,
}

#[derive(Debug, Clone, Default)]
pub struct AggregateRun {
    pub records: Vec<StreamRecord>,
    pub summary: RunSummary,
}

/// Title-cases like Python's `str.title()`: a letter is upper-cased when it follows a non-letter.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_letter = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_letter = true;
        } else {
            out.push(c);
            prev_letter = false;
        }
    }
    out
}

pub struct StreamAggregator<'a, F: PageFetcher + ?Sized> {
    fetcher: &'a F,
    config: &'a ScrapeConfig,
    titles: TitleNormalizer,
    site_root: Url,
}

impl<'a, F: PageFetcher + ?Sized> StreamAggregator<'a, F> {
    pub fn new(fetcher: &'a F, config: &'a ScrapeConfig) -> Result<Self> {
        Ok(Self {
            fetcher,
            config,
            titles: TitleNormalizer::new(&config.brand),
            site_root: config.site_root()?,
        })
    }

    fn display_prefix(&self, category: &str) -> String {
        if category.is_empty() {
            self.config.brand.clone()
        } else {
            title_case(category)
        }
    }

    /// Crawls every configured category in order. A category that cannot be fetched is
    /// skipped; any other failure stops the crawl.
    pub async fn run(&self) -> Result<AggregateRun> {
        let crawler = CategoryCrawler::new(self.fetcher, &self.site_root);
        let resolver = EventResolver::new(self.fetcher, &self.titles, &self.site_root);

        let mut run = AggregateRun::default();
        let mut emitted: HashSet<String> = HashSet::new();

        for category in &self.config.categories {
            let candidates = match crawler.try_list_candidates(category).await {
                Ok(c) => c,
                Err(e) if e.is_recoverable() => {
                    warn!(stage = %FetchStage::Category, category = %category, error = %e, "failed to parse category");
                    run.summary.categories_failed += 1;
                    continue;
                }
                Err(e) => {
                    error!(stage = %FetchStage::Category, category = %category, error = %e, "aborting crawl");
                    return Err(e);
                }
            };
            run.summary.categories_processed += 1;
            run.summary.candidates_seen += candidates.len();

            let key = if category.is_empty() { MISC_KEY } else { category.as_str() };
            let prefix = self.display_prefix(category);

            for candidate in &candidates {
                for (title, url) in self.titles_for(&resolver, candidate).await {
                    if !emitted.insert(url.clone()) {
                        run.summary.duplicates_skipped += 1;
                        continue;
                    }
                    let display_name = format!("{} - {}", prefix, title);
                    debug!(%display_name, manifest = %url, "stream");
                    run.records.push(StreamRecord {
                        category: key.to_string(),
                        display_name,
                        manifest_url: url,
                    });
                }
            }
        }

        run.summary.records_emitted = run.records.len();
        if run.records.is_empty() {
            warn!("no streams found");
        } else {
            info!(count = run.records.len(), "found streams");
        }
        Ok(run)
    }

    /// (final title, manifest URL) pairs for one candidate, before global dedup
    async fn titles_for(
        &self,
        resolver: &EventResolver<'_, F>,
        candidate: &Candidate,
    ) -> Vec<(String, String)> {
        let anchor = candidate.anchor().unwrap_or_default();
        let base = Url::parse(&candidate.href).ok();
        let slug = self.titles.title_from_url_str(&candidate.href);

        if candidate.href.contains(".m3u8") {
            let url = extract(&candidate.href, base.as_ref()).unwrap_or_else(|| candidate.href.clone());
            let title = self.first_title(&[anchor, slug.as_str()], &url);
            return vec![(title, url)];
        }

        resolver
            .resolve(&candidate.href, candidate.anchor())
            .await
            .into_iter()
            .filter(|stream| stream.manifest_url.contains(".m3u8"))
            .map(|stream| {
                let url = extract(&stream.manifest_url, base.as_ref())
                    .unwrap_or_else(|| stream.manifest_url.clone());
                let title = self.first_title(&[stream.title.as_str(), anchor, slug.as_str()], &url);
                (title, url)
            })
            .collect()
    }

    /// First choice that is non-empty after cleaning, else the cleaned URL, else the raw URL
    fn first_title(&self, choices: &[&str], url: &str) -> String {
        choices
            .iter()
            .chain(std::iter::once(&url))
            .map(|c| self.titles.clean(c))
            .find(|t| !t.is_empty())
            .unwrap_or_else(|| url.to_string())
    }
}
