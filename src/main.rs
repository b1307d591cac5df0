use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use roxie_playlist_lib::{HttpFetcher, PlaylistWriter, ScrapeConfig, StreamAggregator};

#[derive(clap::Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// JSON config file (defaults to the user config dir, then built-in values)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory the two playlists are written to
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Only crawl these categories, in this order ("" is the site root)
    #[arg(long = "category")]
    categories: Vec<String>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

/// `-v` forces debug; otherwise `RUST_LOG` directives apply, defaulting to info.
fn log_filter(verbose: bool, env_directives: Option<&str>) -> EnvFilter {
    if verbose {
        return EnvFilter::new("debug");
    }
    EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .parse_lossy(env_directives.unwrap_or_default())
}

fn init_logging(verbose: bool) {
    let env_directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = log_filter(verbose, env_directives.as_deref());

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    use clap::Parser;
    let args = Args::parse();
    init_logging(args.verbose);

    let config = match ScrapeConfig::load(args.config.as_deref()) {
        Ok(c) => c.with_categories(&args.categories),
        Err(e) => {
            eprintln!("{}", e.diagnostics());
            return Err(e.into());
        }
    };

    info!("starting playlist generation");
    let fetcher = HttpFetcher::new(&config)?;
    let aggregator = StreamAggregator::new(&fetcher, &config)?;
    let run = match aggregator.run().await {
        Ok(run) => run,
        Err(e) => {
            eprintln!("{}", e.diagnostics());
            return Err(e.into());
        }
    };
    info!(
        categories = run.summary.categories_processed,
        failed = run.summary.categories_failed,
        candidates = run.summary.candidates_seen,
        duplicates = run.summary.duplicates_skipped,
        streams = run.summary.records_emitted,
        "crawl finished"
    );

    let written = PlaylistWriter::new(&config).write_all(&run.records, &args.output_dir)?;
    for playlist in &written {
        println!(
            "{}: {} ({} entries)",
            playlist.variant.display_name(),
            playlist.path.display(),
            playlist.entries
        );
    }
    info!("finished generating playlists");
    Ok(())
}
