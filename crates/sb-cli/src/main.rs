//! sbmirror CLI
//!
//! CLI tool for synchronizing the local blacklist mirror and checking URLs
//! against it.

mod inspect;
mod lookup;
mod sync;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use sb_core::ListType;
use sb_store::{SqliteStore, StoreConfig};
use sb_sync::feed::{DEFAULT_FEED_TIMEOUT, DEFAULT_FEED_URL};

#[derive(Parser)]
#[command(name = "sb-cli")]
#[command(about = "Local Safe Browsing blacklist mirror")]
struct Cli {
    /// SQLite database holding the mirror
    #[arg(long, global = true, env = "SBMIRROR_DB", default_value = "sbmirror.sqlite3")]
    db: PathBuf,

    /// Seconds to wait on a locked database
    #[arg(long, global = true, default_value_t = 5)]
    busy_timeout_secs: u64,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ListArg {
    Phishing,
    Malware,
    All,
}

impl ListArg {
    pub fn lists(self) -> Vec<ListType> {
        match self {
            Self::Phishing => vec![ListType::Phishing],
            Self::Malware => vec![ListType::Malware],
            Self::All => ListType::ALL.to_vec(),
        }
    }

    /// The single list selected, or `None` for all of them.
    pub fn single(self) -> Option<ListType> {
        match self {
            Self::Phishing => Some(ListType::Phishing),
            Self::Malware => Some(ListType::Malware),
            Self::All => None,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create the schema for every list
    Init,

    /// Fetch and apply diffs from the remote feed
    Sync {
        /// List(s) to synchronize
        #[arg(short, long, value_enum, default_value = "all")]
        list: ListArg,

        /// API key for the remote feed
        #[arg(long, env = "SBMIRROR_API_KEY")]
        api_key: String,

        /// Remote update endpoint
        #[arg(long, env = "SBMIRROR_FEED_URL", default_value = DEFAULT_FEED_URL)]
        feed_url: String,

        /// Seconds before a diff download is abandoned
        #[arg(long, env = "SBMIRROR_TIMEOUT_SECS", default_value_t = DEFAULT_FEED_TIMEOUT.as_secs())]
        timeout_secs: u64,

        /// Print reports as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check URLs against the mirrored lists
    Check {
        /// URLs to check
        #[arg(required = true)]
        urls: Vec<String>,

        /// List(s) to check against
        #[arg(short, long, value_enum, default_value = "all")]
        list: ListArg,
    },

    /// Check a file of URLs (one per line) and print active hits
    Batch {
        /// File with one URL per line
        input: PathBuf,
    },

    /// Print the canonical form of a URL
    Canonicalize {
        url: String,
    },

    /// Print the lookup forms (and fingerprints) of a URL
    Forms {
        url: String,
    },

    /// Show local version and row counts per list
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let store_config =
        StoreConfig::new(cli.db).with_busy_timeout(Duration::from_secs(cli.busy_timeout_secs));

    let result = match cli.command {
        Commands::Init => inspect::cmd_init(&store_config),
        Commands::Sync {
            list,
            api_key,
            feed_url,
            timeout_secs,
            json,
        } => sync::run_sync(sync::SyncOptions {
            store: store_config,
            list: list.single(),
            api_key,
            feed_url,
            timeout: Duration::from_secs(timeout_secs),
            json,
        }),
        Commands::Check { urls, list } => lookup::cmd_check(&store_config, &urls, &list.lists()),
        Commands::Batch { input } => lookup::cmd_batch(&store_config, &input),
        Commands::Canonicalize { url } => inspect::cmd_canonicalize(&url),
        Commands::Forms { url } => inspect::cmd_forms(&url),
        Commands::Status { json } => inspect::cmd_status(&store_config, json),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Open (and if needed create) the store named by `config`.
pub fn open_store(config: &StoreConfig) -> Result<SqliteStore, String> {
    SqliteStore::open(config).map_err(|e| e.to_string())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
