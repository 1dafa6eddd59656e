//! Command line argument parsing for the folio CLI using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

/// Folio - build and query block stores and keyword indices
#[derive(Parser, Debug, Clone)]
#[command(name = "folio")]
#[command(about = "Build and query block stores and keyword indices")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct FolioArgs {
    /// Verbosity level (repeat for more: -v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human")]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl FolioArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1,
                n => n + 1,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Build a block store from a text dump
    Make(MakeArgs),

    /// Print a block store as a text dump
    Dump(DumpArgs),

    /// Print the value(s) stored under a key
    Get(GetArgs),

    /// Show block store statistics
    Stats(StatsArgs),

    /// Build the routes, tags and content indices from JSON-lines documents
    Index(IndexArgs),

    /// Search the indices of a directory
    Search(SearchArgs),
}

/// Arguments for building a block store
#[derive(Parser, Debug, Clone)]
pub struct MakeArgs {
    /// Dump file to read, or `-` for standard input
    #[arg(value_name = "DUMP")]
    pub dump: PathBuf,

    /// Block store file to create
    #[arg(value_name = "STORE")]
    pub store: PathBuf,
}

/// Arguments for dumping a block store
#[derive(Parser, Debug, Clone)]
pub struct DumpArgs {
    #[arg(value_name = "STORE")]
    pub store: PathBuf,
}

/// Arguments for key lookups
#[derive(Parser, Debug, Clone)]
pub struct GetArgs {
    #[arg(value_name = "STORE")]
    pub store: PathBuf,

    #[arg(value_name = "KEY")]
    pub key: String,

    /// Print every value stored under the key, not just the first
    #[arg(short, long)]
    pub all: bool,
}

/// Arguments for block store statistics
#[derive(Parser, Debug, Clone)]
pub struct StatsArgs {
    #[arg(value_name = "STORE")]
    pub store: PathBuf,
}

/// Arguments for building field indices
#[derive(Parser, Debug, Clone)]
pub struct IndexArgs {
    /// JSON-lines file with one document per line, or `-` for standard input
    #[arg(value_name = "DOCUMENTS")]
    pub documents: PathBuf,

    /// Directory receiving the index files
    #[arg(value_name = "INDEX_DIR")]
    pub index_dir: PathBuf,

    /// JSON configuration file
    #[arg(short, long, value_name = "CONFIG_FILE")]
    pub config: Option<PathBuf>,
}

/// Arguments for searching
#[derive(Parser, Debug, Clone)]
pub struct SearchArgs {
    /// Directory holding the index files
    #[arg(value_name = "INDEX_DIR")]
    pub index_dir: PathBuf,

    /// Query; start with `/` to search routes or `#` to search tags
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// Maximum number of results
    #[arg(short, long, default_value = "10")]
    pub limit: usize,

    /// JSON configuration file
    #[arg(short, long, value_name = "CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Read index files through memory maps
    #[arg(long)]
    pub mmap: bool,
}

/// Output formats for CLI
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_command() {
        let args = FolioArgs::try_parse_from([
            "folio",
            "search",
            "/var/lib/folio",
            "#golang",
            "--limit",
            "5",
        ])
        .unwrap();

        if let Command::Search(search_args) = args.command {
            assert_eq!(search_args.index_dir, PathBuf::from("/var/lib/folio"));
            assert_eq!(search_args.query, "#golang");
            assert_eq!(search_args.limit, 5);
            assert!(!search_args.mmap);
        } else {
            panic!("Expected Search command");
        }
    }

    #[test]
    fn test_get_command() {
        let args = FolioArgs::try_parse_from(["folio", "get", "data.store", "key", "--all"]).unwrap();

        if let Command::Get(get_args) = args.command {
            assert_eq!(get_args.store, PathBuf::from("data.store"));
            assert_eq!(get_args.key, "key");
            assert!(get_args.all);
        } else {
            panic!("Expected Get command");
        }
    }

    #[test]
    fn test_make_from_stdin() {
        let args = FolioArgs::try_parse_from(["folio", "make", "-", "out.store"]).unwrap();

        if let Command::Make(make_args) = args.command {
            assert_eq!(make_args.dump, PathBuf::from("-"));
        } else {
            panic!("Expected Make command");
        }
    }

    #[test]
    fn test_verbosity_levels() {
        let args = FolioArgs::try_parse_from(["folio", "dump", "x"]).unwrap();
        assert_eq!(args.verbosity(), 1);

        let args = FolioArgs::try_parse_from(["folio", "-vv", "dump", "x"]).unwrap();
        assert_eq!(args.verbosity(), 3);

        let args = FolioArgs::try_parse_from(["folio", "-v", "-q", "dump", "x"]).unwrap();
        assert_eq!(args.verbosity(), 0);
    }

    #[test]
    fn test_output_format() {
        let args = FolioArgs::try_parse_from(["folio", "--format", "json", "stats", "x"]).unwrap();
        assert_eq!(args.output_format, OutputFormat::Json);
    }
}
