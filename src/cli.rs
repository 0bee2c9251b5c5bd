use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build a vibe index from a JSON catalog of book descriptions
    Build {
        /// Path to the input catalog (JSON array of records)
        records: PathBuf,

        /// Where to write the index artifact
        #[clap(short, long, default_value = "index.bin")]
        output: PathBuf,

        /// Only embed/enrich the first M records (fast iteration);
        /// zero or negative means no limit
        #[clap(short, long, default_value = "0")]
        limit: i64,

        /// Embedding model name (overrides config)
        #[clap(short, long)]
        model: Option<String>,

        /// Enrichment worker count (overrides config)
        #[clap(short, long)]
        workers: Option<usize>,

        /// Skip cover resolution entirely (records keep any cover they
        /// already carry)
        #[clap(long, default_value = "false")]
        no_covers: bool,
    },

    /// Rank the catalog against a free-text phrase
    Query {
        /// The vibe phrase to match against book descriptions
        phrase: String,

        /// Path to the index artifact
        #[clap(short, long, default_value = "index.bin")]
        index: PathBuf,

        /// Number of results; non-positive values fall back to the
        /// configured default
        #[clap(short = 'n', long, default_value = "10")]
        count: i64,
    },

    /// Resolve a single cover through the provider chain (debugging)
    Cover {
        /// Book title
        #[clap(short, long)]
        title: Option<String>,

        /// Book author
        #[clap(short, long)]
        author: Option<String>,

        /// ISBN (tried before any title search)
        #[clap(short, long)]
        isbn: Option<String>,
    },
}
