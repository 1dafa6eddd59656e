//! Output formatting for CLI commands.

use serde::{Deserialize, Serialize};

use crate::cli::args::{FolioArgs, OutputFormat};
use crate::error::Result;
use crate::field::Field;

/// Result structure for block store construction.
#[derive(Debug, Serialize, Deserialize)]
pub struct BuildResult {
    pub store: String,
    pub records: usize,
    pub bytes: u64,
    pub duration_ms: u64,
}

/// Block store statistics.
#[derive(Debug, Serialize, Deserialize)]
pub struct StoreStats {
    pub store: String,
    pub records: usize,
    pub bytes: u64,
    pub used_buckets: usize,
    pub max_table_len: u32,
}

/// Result structure for field index builds.
#[derive(Debug, Serialize, Deserialize)]
pub struct IndexResult {
    pub index_dir: String,
    pub documents: usize,
    pub indices: Vec<IndexFileResult>,
    pub duration_ms: u64,
}

/// One written index file.
#[derive(Debug, Serialize, Deserialize)]
pub struct IndexFileResult {
    pub field: Field,
    pub file: String,
    pub words: usize,
    pub bytes: u64,
}

/// Result structure for search operations.
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResults {
    pub query: String,
    pub field: Field,
    pub hits: Vec<HitResult>,
    pub duration_ms: u64,
}

/// One search hit.
#[derive(Debug, Serialize, Deserialize)]
pub struct HitResult {
    pub id: String,
    pub title: String,
    pub score: u64,
}

/// Plain-text rendering of a command result.
pub trait HumanOutput {
    fn print_human(&self, args: &FolioArgs);
}

/// Output a result in the format chosen on the command line.
pub fn output_result<T: Serialize + HumanOutput>(result: &T, args: &FolioArgs) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => {
            result.print_human(args);
            Ok(())
        }
        OutputFormat::Json => output_json(result, args),
    }
}

fn output_json<T: Serialize>(result: &T, args: &FolioArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };
    println!("{json}");
    Ok(())
}

impl HumanOutput for BuildResult {
    fn print_human(&self, args: &FolioArgs) {
        if args.verbosity() > 0 {
            println!(
                "Built {} ({} records, {} bytes) in {} ms",
                self.store, self.records, self.bytes, self.duration_ms
            );
        }
    }
}

impl HumanOutput for StoreStats {
    fn print_human(&self, _args: &FolioArgs) {
        println!("Store:         {}", self.store);
        println!("Records:       {}", self.records);
        println!("Bytes:         {}", self.bytes);
        println!("Used buckets:  {} / 256", self.used_buckets);
        println!("Largest table: {} slots", self.max_table_len);
    }
}

impl HumanOutput for IndexResult {
    fn print_human(&self, args: &FolioArgs) {
        if args.verbosity() == 0 {
            return;
        }
        println!(
            "Indexed {} documents into {} in {} ms",
            self.documents, self.index_dir, self.duration_ms
        );
        for index in &self.indices {
            println!(
                "  {:<12} {:>8} words {:>10} bytes",
                index.file, index.words, index.bytes
            );
        }
    }
}

impl HumanOutput for SearchResults {
    fn print_human(&self, args: &FolioArgs) {
        if self.hits.is_empty() {
            if args.verbosity() > 0 {
                println!("No results for {:?} in {}", self.query, self.field);
            }
            return;
        }

        for (i, hit) in self.hits.iter().enumerate() {
            println!("{:>3}. {} ({})  score {}", i + 1, hit.title, hit.id, hit.score);
        }
        if args.verbosity() > 1 {
            println!();
            println!(
                "{} results from {} in {} ms",
                self.hits.len(),
                self.field,
                self.duration_ms
            );
        }
    }
}
