//! carwatch CLI
//!
//! One poll per invocation. Exit status: 0 nothing new, 2 new listings found,
//! 1 failure.

use std::path::PathBuf;
use std::process::ExitCode;

use carwatch::{
    error::Result,
    models::Config,
    pipeline::{self, EXIT_FAILURE, PollOutcome},
    services::SelectorExtractor,
    storage::LocalStateStore,
    utils::http::HttpSource,
};
use clap::{Parser, Subcommand};

/// carwatch - Car Listing Watcher
#[derive(Parser, Debug)]
#[command(name = "carwatch", version, about = "Reports car ads not seen in earlier runs")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "carwatch.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the listing page and report new listings (default)
    Poll {
        /// Listing page URL
        #[arg(long)]
        url: Option<String>,

        /// Seen-set file
        #[arg(long)]
        state: Option<PathBuf>,

        /// New listings report file
        #[arg(long)]
        new_report: Option<PathBuf>,
    },

    /// Validate the configuration file
    Validate,

    /// Show persisted state info
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // Exit status 2 is reserved for new listings.
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            return ExitCode::from(EXIT_FAILURE);
        }
        Err(e) => e.exit(),
    };

    init_logging(cli.verbose);

    let config = Config::load_or_default(&cli.config);

    let result = match cli.command.unwrap_or(Command::Poll {
        url: None,
        state: None,
        new_report: None,
    }) {
        Command::Poll {
            url,
            state,
            new_report,
        } => {
            let mut config = config;
            if let Some(url) = url {
                config.source.listing_url = url;
            }
            if let Some(path) = state {
                config.storage.relocate_state(path);
            }
            if let Some(path) = new_report {
                config.storage.new_report_path = path;
            }
            poll(&config).await.map(|outcome| outcome.exit_code())
        }
        Command::Validate => validate(&config).map(|_| 0),
        Command::Info => info(&config).await.map(|_| 0),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            log::error!("Failed: {}", e);
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

async fn poll(config: &Config) -> Result<PollOutcome> {
    config.validate()?;

    let source = HttpSource::new(&config.source)?;
    let store = LocalStateStore::new(&config.storage);
    let outcome = pipeline::run_poll(config, &source, &store).await?;

    if outcome.has_new() {
        println!("New cars: {}", outcome.new_listings.len());
        for listing in &outcome.new_listings {
            println!("{}", listing.format("{title} - {url}"));
        }
    } else {
        println!("No new cars.");
    }
    log::debug!(
        "{} listings on page, {} URLs seen in total",
        outcome.found,
        outcome.seen_total
    );

    Ok(outcome)
}

fn validate(config: &Config) -> Result<()> {
    log::info!("Validating configuration...");

    if let Err(e) = config.validate() {
        log::error!("Config validation failed: {}", e);
        return Err(e);
    }
    SelectorExtractor::new(&config.extraction)?;

    log::info!("✓ Config OK");
    log::info!("Listing URL: {}", config.source.listing_url);
    log::info!("Default encoding: {}", config.source.default_encoding);
    log::info!(
        "Selector: {} {}",
        config.extraction.container_selector,
        config.extraction.title_selector
    );
    Ok(())
}

async fn info(config: &Config) -> Result<()> {
    let store = LocalStateStore::new(&config.storage);
    log::info!("State file: {}", store.state_path().display());

    match store.read_state().await {
        Ok(Some(state)) => {
            log::info!("Seen URLs: {}", state.seen.len());
            match state.updated_at {
                Some(updated) => log::info!("Last updated: {}", updated),
                None => log::info!("Last updated: unknown"),
            }
        }
        Ok(None) => log::info!("No state found yet."),
        Err(e) => log::warn!("State file is unreadable and will be reset: {}", e),
    }

    log::info!("Report file: {}", store.report_path().display());
    Ok(())
}
