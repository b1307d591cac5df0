use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::errors::{Result, ScrapeError};

pub const DEFAULT_BASE_URL: &str = "https://roxiestreams.live/";
pub const DEFAULT_BRAND: &str = "Roxiestreams";
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:144.0) Gecko/20100101 Firefox/144.0";
pub const DEFAULT_EPG_URL: &str =
    "https://epgshare01.online/epgshare01/epg_ripper_ALL_SOURCES1.xml.gz";

/// Category path segments in crawl order. The empty segment is the site root.
pub const DEFAULT_CATEGORIES: &[&str] = &[
    "",
    "soccer",
    "mlb",
    "nba",
    "nfl",
    "nhl",
    "fighting",
    "motorsports",
    "motogp",
    "ufc",
    "ppv",
    "wwe-streams",
    "f1",
    "f1-streams",
    "nascar",
];

/// Everything a run needs to know about the target site and output files.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ScrapeConfig {
    pub base_url: String,
    /// Site brand, used in titles, group labels and the root display prefix
    pub brand: String,
    pub categories: Vec<String>,
    pub user_agent: String,
    pub accept_language: String,
    pub timeout_secs: u64,
    pub epg_url: String,
    pub vlc_output: String,
    pub tivimate_output: String,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            brand: DEFAULT_BRAND.to_string(),
            categories: DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
            timeout_secs: 12,
            epg_url: DEFAULT_EPG_URL.to_string(),
            vlc_output: "Roxiestreams_VLC.m3u8".to_string(),
            tivimate_output: "Roxiestreams_TiviMate.m3u8".to_string(),
        }
    }
}

impl ScrapeConfig {
    /// Default location: `<config_dir>/config.json` of the project dirs
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("live", "roxiestreams", "roxie-playlist")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Loads an explicit config file, or the default one if it exists, or the built-in defaults.
    /// Missing fields in the file keep their default values.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Self::default_path().filter(|p| p.exists()),
        };

        let config = match path {
            Some(p) => {
                let content = fs::read_to_string(&p)?;
                serde_json::from_str::<ScrapeConfig>(&content)?
            }
            None => ScrapeConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let base = self.site_root()?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ScrapeError::Config(format!(
                "base_url must be http(s), got {}",
                self.base_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(ScrapeError::Config("timeout_secs must be positive".to_string()));
        }
        if self.vlc_output == self.tivimate_output {
            return Err(ScrapeError::Config(
                "vlc_output and tivimate_output must differ".to_string(),
            ));
        }
        Ok(())
    }

    pub fn site_root(&self) -> Result<Url> {
        Url::parse(&self.base_url)
            .map_err(|e| ScrapeError::Config(format!("base_url {:?}: {}", self.base_url, e)))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Restricts the crawl to the given keys, keeping the caller's order
    pub fn with_categories(mut self, only: &[String]) -> Self {
        if !only.is_empty() {
            self.categories = only.to_vec();
        }
        self
    }
}
