//! poikatsu-crawler - Point-back deal search CLI and HTTP service

use anyhow::Result;
use clap::{Parser, Subcommand};
use poikatsu_crawler::commands::favorites::FavoritesAction;
use poikatsu_crawler::commands::history::HistoryAction;
use poikatsu_crawler::commands::viewed::ViewedAction;
use poikatsu_crawler::commands::{
    FavoritesCommand, HistoryCommand, PartnersCommand, ResolveCommand, SearchCommand, SearchOptions,
    ServeCommand, ViewedCommand,
};
use poikatsu_crawler::config::{Config, OutputFormat};
use poikatsu_crawler::filters::SortBy;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "poikatsu-crawler",
    version,
    about = "Point-back deal search across partner programs",
    long_about = "Searches the comparison site for point-back offers, normalizes their rewards and rewrites offer links with your referral ids."
)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true)]
    format: Option<OutputFormat>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service
    Serve {
        /// Address to listen on
        #[arg(short, long)]
        listen: Option<String>,
    },

    /// Search offers for a keyword
    #[command(alias = "s")]
    Search {
        /// Search keyword
        keyword: String,

        /// Sort by: none, rate, amount, site, title
        #[arg(long, default_value = "none")]
        sort: SortBy,

        /// Only show these partner sites (comma-separated)
        #[arg(long, value_delimiter = ',')]
        site: Option<Vec<String>>,

        /// Minimum reward rate in percent
        #[arg(long)]
        min_rate: Option<f64>,

        /// Minimum reward amount in yen
        #[arg(long)]
        min_amount: Option<f64>,

        /// Required keywords in title (comma-separated)
        #[arg(long, value_delimiter = ',')]
        keywords: Option<Vec<String>>,

        /// Excluded keywords from title (comma-separated)
        #[arg(long, value_delimiter = ',')]
        exclude: Option<Vec<String>>,

        /// Do not record history or viewed offers
        #[arg(long)]
        no_record: bool,
    },

    /// Rewrite one offer link with a referral id
    #[command(alias = "r")]
    Resolve {
        /// Offer link (usually the comparison site's redirect)
        url: String,

        /// Partner site name as listed with the offer
        #[arg(long)]
        site: String,
    },

    /// Rewrite every link in a saved search response or link list
    ResolveBatch {
        /// JSON file: a search response or [{"site", "originalUrl"}]
        file: PathBuf,
    },

    /// Show or edit search history
    History {
        /// Remove every entry
        #[arg(long, conflicts_with = "remove")]
        clear: bool,

        /// Remove one keyword
        #[arg(long)]
        remove: Option<String>,
    },

    /// Manage favorite offers
    Favorites {
        #[command(subcommand)]
        action: Option<FavoritesSubcommand>,
    },

    /// Show or maintain the viewed offers ledger
    Viewed {
        /// Show totals instead of items
        #[arg(long)]
        stats: bool,

        /// Drop offers not seen within this many days
        #[arg(long, value_name = "DAYS")]
        cleanup: Option<u32>,

        /// Remove every item
        #[arg(long)]
        clear: bool,
    },

    /// List supported partners
    Partners,
}

#[derive(Subcommand)]
enum FavoritesSubcommand {
    /// List favorites
    List,
    /// Add an offer from the cached results of a search
    Add {
        /// Keyword the offer was found with
        keyword: String,
        /// Position of the offer in those results (1-based)
        position: usize,
    },
    /// Remove a favorite by id
    Remove { id: String },
    /// Remove every favorite
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Load config with layered overrides
    let mut config = Config::load(cli.config.as_deref())?.with_env();

    if let Some(format) = cli.format {
        config.format = format;
    }

    match cli.command {
        Commands::Serve { listen } => {
            if let Some(listen) = listen {
                config.listen_addr = listen;
            }
            ServeCommand::new(config).execute().await?;
        }

        Commands::Search { keyword, sort, site, min_rate, min_amount, keywords, exclude, no_record } => {
            let options = SearchOptions {
                sort,
                sites: site.unwrap_or_default(),
                min_rate,
                min_amount,
                keywords: keywords.unwrap_or_default(),
                exclude_keywords: exclude.unwrap_or_default(),
                record: !no_record,
            };

            let output = SearchCommand::new(config, options).execute(&keyword).await?;
            println!("{}", output);
        }

        Commands::Resolve { url, site } => {
            let output = ResolveCommand::new(config).execute(&url, &site).await?;
            println!("{}", output);
        }

        Commands::ResolveBatch { file } => {
            let output = ResolveCommand::new(config).execute_batch(&file).await?;
            println!("{}", output);
        }

        Commands::History { clear, remove } => {
            let action = match (clear, remove) {
                (true, _) => HistoryAction::Clear,
                (false, Some(keyword)) => HistoryAction::Remove(keyword),
                (false, None) => HistoryAction::List,
            };
            println!("{}", HistoryCommand::new(config).execute(action)?);
        }

        Commands::Favorites { action } => {
            let action = match action.unwrap_or(FavoritesSubcommand::List) {
                FavoritesSubcommand::List => FavoritesAction::List,
                FavoritesSubcommand::Add { keyword, position } => FavoritesAction::Add { keyword, position },
                FavoritesSubcommand::Remove { id } => FavoritesAction::Remove(id),
                FavoritesSubcommand::Clear => FavoritesAction::Clear,
            };
            println!("{}", FavoritesCommand::new(config).execute(action)?);
        }

        Commands::Viewed { stats, cleanup, clear } => {
            let action = match (clear, cleanup, stats) {
                (true, _, _) => ViewedAction::Clear,
                (false, Some(days), _) => ViewedAction::Cleanup(days),
                (false, None, true) => ViewedAction::Stats,
                (false, None, false) => ViewedAction::List,
            };
            println!("{}", ViewedCommand::new(config).execute(action)?);
        }

        Commands::Partners => {
            println!("{}", PartnersCommand::new(config).execute());
        }
    }

    Ok(())
}
