use thiserror::Error;

/// Which part of the crawl a failure happened in, for log context
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FetchStage {
    /// Category listing page
    Category,
    /// Event page linked from a category
    Event,
    /// Iframe embedded in an event page
    Iframe,
}

impl std::fmt::Display for FetchStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FetchStage {
    pub fn display_name(&self) -> &'static str {
        match self {
            FetchStage::Category => "category page",
            FetchStage::Event => "event page",
            FetchStage::Iframe => "iframe",
        }
    }
}

/// Errors raised while crawling the site or writing playlists
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Transport failure (DNS, TCP, TLS, body decoding)
    #[error("fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// Server answered with a non-success status
    #[error("{url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    /// Per-request timeout elapsed
    #[error("timed out after {secs}s fetching {url}")]
    Timeout { url: String, secs: u64 },

    /// Invalid configuration value
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ScrapeError {
    /// Fetch failures only cost the current category or event; the aggregator stops on anything else.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ScrapeError::Fetch { .. } | ScrapeError::HttpStatus { .. } | ScrapeError::Timeout { .. }
        )
    }

    /// Multi-line operator hint, printed by the CLI when the run aborts
    pub fn diagnostics(&self) -> String {
        match self {
            ScrapeError::Fetch { url, reason } => {
                format!("Fetch Error\nURL: {}\nError: {}\nSuggestion: Check connectivity or whether the site moved", url, reason)
            }
            ScrapeError::HttpStatus { url, status } => {
                format!("Server Error\nURL: {}\nStatus: {}\nSuggestion: The page may have been removed; try again later", url, status)
            }
            ScrapeError::Timeout { url, secs } => {
                format!("Timeout\nURL: {}\nTimeout: {} seconds\nSuggestion: Raise timeout_secs in the config file", url, secs)
            }
            ScrapeError::Config(message) => {
                format!("Configuration Error\nMessage: {}\nSuggestion: Fix the config file or remove it to use defaults", message)
            }
            ScrapeError::Io(source) => {
                format!("I/O Error\nError: {}\nSuggestion: Check that the output directory exists and is writable", source)
            }
            ScrapeError::Json(source) => {
                format!("Config Parse Error\nError: {}\nSuggestion: The config file must be a JSON object", source)
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ScrapeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_family_is_recoverable() {
        let err = ScrapeError::HttpStatus {
            url: "https://roxiestreams.live/nfl".to_string(),
            status: 503,
        };
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("503"));

        let err = ScrapeError::Timeout {
            url: "https://roxiestreams.live/".to_string(),
            secs: 12,
        };
        assert!(err.is_recoverable());
    }

    #[test]
    fn config_errors_are_fatal() {
        let err = ScrapeError::Config("timeout_secs must be positive".to_string());
        assert!(!err.is_recoverable());
        assert!(err.diagnostics().starts_with("Configuration Error"));
    }

    #[test]
    fn stage_names() {
        assert_eq!(FetchStage::Iframe.to_string(), "iframe");
        assert_eq!(FetchStage::Category.display_name(), "category page");
    }
}
