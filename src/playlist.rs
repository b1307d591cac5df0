//! M3U output in two flavors: plain (VLC) and with inline playback headers (TiviMate).

use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::aggregator::StreamRecord;
use crate::catalog::metadata_for;
use crate::config::ScrapeConfig;
use crate::errors::Result;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaylistVariant {
    Vlc,
    /// Appends `|referer=...|user-agent=...` to every stream URL
    TiviMate,
}

impl PlaylistVariant {
    pub fn all() -> &'static [PlaylistVariant] {
        &[PlaylistVariant::Vlc, PlaylistVariant::TiviMate]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PlaylistVariant::Vlc => "VLC",
            PlaylistVariant::TiviMate => "TiviMate",
        }
    }
}

#[derive(Debug, Clone)]
pub struct WrittenPlaylist {
    pub variant: PlaylistVariant,
    pub path: PathBuf,
    pub entries: usize,
}

pub struct PlaylistWriter<'a> {
    config: &'a ScrapeConfig,
}

impl<'a> PlaylistWriter<'a> {
    pub fn new(config: &'a ScrapeConfig) -> Self {
        Self { config }
    }

    pub fn file_name(&self, variant: PlaylistVariant) -> &str {
        match variant {
            PlaylistVariant::Vlc => &self.config.vlc_output,
            PlaylistVariant::TiviMate => &self.config.tivimate_output,
        }
    }

    pub fn header(&self, generated_at: DateTime<Utc>) -> String {
        format!(
            "#EXTM3U x-tvg-url=\"{}\"\n# Last Updated: {}\n\n",
            self.config.epg_url,
            generated_at.format("%Y-%m-%d %H:%M UTC")
        )
    }

    /// `|referer=<site root>|user-agent=<percent-encoded UA>`
    pub fn header_suffix(&self) -> String {
        format!(
            "|referer={}|user-agent={}",
            self.config.base_url,
            urlencoding::encode(&self.config.user_agent)
        )
    }

    pub fn render(
        &self,
        records: &[StreamRecord],
        variant: PlaylistVariant,
        generated_at: DateTime<Utc>,
    ) -> String {
        let mut out = self.header(generated_at);
        let suffix = match variant {
            PlaylistVariant::Vlc => String::new(),
            PlaylistVariant::TiviMate => self.header_suffix(),
        };

        for record in records {
            let meta = metadata_for(&record.category);
            let _ = writeln!(
                out,
                "#EXTINF:-1 tvg-logo=\"{}\" tvg-id=\"{}\" group-title=\"{} - {}\",{}",
                meta.logo_url, meta.tvg_id, self.config.brand, meta.group, record.display_name
            );
            let _ = write!(out, "{}{}\n\n", record.manifest_url, suffix);
        }
        out
    }

    /// Writes both variants into `dir`. Empty record sets still produce header-only files.
    pub fn write_all(&self, records: &[StreamRecord], dir: &Path) -> Result<Vec<WrittenPlaylist>> {
        let generated_at = Utc::now();
        fs::create_dir_all(dir)?;

        let mut written = Vec::new();
        for &variant in PlaylistVariant::all() {
            let path = dir.join(self.file_name(variant));
            fs::write(&path, self.render(records, variant, generated_at))?;
            info!(variant = variant.display_name(), path = %path.display(), "wrote playlist");
            written.push(WrittenPlaylist {
                variant,
                path,
                entries: records.len(),
            });
        }
        Ok(written)
    }
}
