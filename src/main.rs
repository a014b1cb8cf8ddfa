//! Settle - snapshot review tool
//!
//! Lists, shows, accepts and rejects the pending records that test runs
//! park next to mismatching baselines.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, bail};
use tracing_subscriber::EnvFilter;

use settle::constants::{env, record};
use settle::{SnapshotStore, UpdateMode};

#[derive(Parser)]
#[command(name = "settle")]
#[command(about = "Review pending snapshot records", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Snapshot directory (defaults to $SETTLE_SNAPSHOT_DIR or tests/snapshots)
    #[arg(short, long, global = true)]
    dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List pending records with their diffs against the baselines
    Pending {
        /// Only list file names
        #[arg(short, long)]
        quiet: bool,
    },

    /// Promote pending records to baselines
    Accept {
        /// Test ids to accept
        ids: Vec<String>,

        /// Accept every pending record
        #[arg(short, long, conflicts_with = "ids")]
        all: bool,
    },

    /// Discard pending records
    Reject {
        /// Test ids to reject
        ids: Vec<String>,

        /// Reject every pending record
        #[arg(short, long, conflicts_with = "ids")]
        all: bool,
    },

    /// Print the stored baseline for a test id
    Show {
        /// Test id
        id: String,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(env::LOG).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let dir = cli
        .dir
        .or_else(|| std::env::var_os(env::SNAPSHOT_DIR).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(record::DEFAULT_DIR));
    // Review never writes records itself, only moves or deletes them.
    let store = SnapshotStore::new(dir, UpdateMode::No);

    match cli.command {
        Commands::Pending { quiet } => pending(&store, quiet),
        Commands::Accept { ids, all } => {
            for path in select(&store, &ids, all)? {
                let baseline = store.accept(&path)?;
                println!("accepted {}", baseline.display());
            }
            Ok(())
        }
        Commands::Reject { ids, all } => {
            for path in select(&store, &ids, all)? {
                store.reject(&path)?;
                println!("rejected {}", path.display());
            }
            Ok(())
        }
        Commands::Show { id } => match store.read_baseline(&id)? {
            Some(text) => {
                print!("{text}");
                Ok(())
            }
            None => bail!("no baseline for `{id}` in {}", store.dir().display()),
        },
    }
}

fn pending(store: &SnapshotStore, quiet: bool) -> Result<()> {
    let records = store.pending()?;
    if records.is_empty() {
        println!("no pending records in {}", store.dir().display());
        return Ok(());
    }
    for path in &records {
        println!("{}", path.display());
        if !quiet {
            let diff = store
                .pending_diff(path)
                .wrap_err_with(|| format!("diffing {}", path.display()))?;
            print!("{diff}");
        }
    }
    Ok(())
}

/// Pending record paths for `ids`, or all of them
fn select(store: &SnapshotStore, ids: &[String], all: bool) -> Result<Vec<PathBuf>> {
    if all {
        return Ok(store.pending()?);
    }
    if ids.is_empty() {
        bail!("name at least one test id, or pass --all");
    }
    ids.iter()
        .map(|id| {
            let path = store.pending_path(id);
            if !path.exists() {
                bail!("no pending record for `{id}`");
            }
            Ok(path)
        })
        .collect()
}
