use clap::{Parser, Subcommand, ValueEnum};
use gribx_core::SearchMode;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "gribx",
    about = "Build and query indexes over gridded record collections",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output (also respects NO_COLOR env var)
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Path to config file (defaults to ./gribx.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build a collection index from a JSON-lines record inventory
    Build {
        /// Record inventory, one JSON object per line
        records: PathBuf,

        /// Index file to write (relative paths go under the configured cache dir)
        #[arg(short = 'o', long)]
        output: PathBuf,

        /// Directory the record `file` paths are relative to
        #[arg(long, default_value = ".")]
        top_dir: PathBuf,

        /// Collection name (defaults to the output file stem)
        #[arg(long)]
        name: Option<String>,

        /// Nest the time axis under each runtime instead of a flat time axis
        #[arg(long)]
        nested_time: bool,

        /// Rebuild policy: always, never, nocheck, test, testIndexOnly
        #[arg(long)]
        update: Option<String>,
    },

    /// Merge partition indexes into one partition index
    Merge {
        /// Partition index files, in merge order (later wins)
        #[arg(required = true, num_args = 1..)]
        partitions: Vec<PathBuf>,

        /// Index file to write
        #[arg(short = 'o', long)]
        output: PathBuf,

        /// Collection name (defaults to the output file stem)
        #[arg(long)]
        name: Option<String>,

        /// Top directory recorded in the merged index (defaults to the first partition's)
        #[arg(long)]
        top_dir: Option<String>,
    },

    /// Show the structure of an index file
    Inspect {
        /// Index file
        index: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Locate the record at one exact value per axis
    Find {
        /// Index file
        index: PathBuf,

        /// Group name
        group: String,

        /// One value per axis in axis order (intervals and layers as `a,b`)
        #[arg(required = true, num_args = 1..)]
        values: Vec<String>,
    },

    /// Resolve a numeric target (or range) on one axis of a group
    Search {
        /// Index file
        index: PathBuf,

        /// Group name
        group: String,

        /// Axis position within the group
        axis: usize,

        /// Target value
        #[arg(allow_negative_numbers = true)]
        target: f64,

        /// Upper end of a range search
        #[arg(long, allow_negative_numbers = true)]
        to: Option<f64>,

        /// Selection when the target falls between values
        #[arg(long, value_enum, default_value_t = ModeArg::Closest)]
        mode: ModeArg,

        /// Return None for out-of-range targets instead of clamping to the ends
        #[arg(long)]
        unbounded: bool,
    },

    /// Report whether an index must be rebuilt
    Check {
        /// Index file
        index: PathBuf,

        /// Current record inventory; defaults to re-reading the index's own file list
        #[arg(long)]
        records: Option<PathBuf>,

        /// Directory the inventory paths are relative to (defaults to the index's)
        #[arg(long)]
        top_dir: Option<PathBuf>,

        /// Rebuild policy: always, never, nocheck, test, testIndexOnly
        #[arg(long)]
        update: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ModeArg {
    Min,
    Max,
    Closest,
}

impl From<ModeArg> for SearchMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Min => SearchMode::Min,
            ModeArg::Max => SearchMode::Max,
            ModeArg::Closest => SearchMode::Closest,
        }
    }
}
