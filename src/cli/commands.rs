//! Command implementations for the folio CLI.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use log::{debug, info, warn};

use crate::block_store::{BlockStore, dump, make_from_dump};
use crate::cli::args::*;
use crate::cli::output::*;
use crate::error::{FolioError, Result};
use crate::field::{FieldIndexConfig, FieldIndexManager, dispatch, load_documents};
use crate::storage::file::FileStorageConfig;
use crate::storage::{Storage, StorageConfig, StorageFactory};

/// Execute a CLI command.
pub fn execute_command(args: FolioArgs) -> Result<()> {
    match &args.command {
        Command::Make(make_args) => make_store(make_args, &args),
        Command::Dump(dump_args) => dump_store(dump_args),
        Command::Get(get_args) => get_value(get_args),
        Command::Stats(stats_args) => show_stats(stats_args, &args),
        Command::Index(index_args) => build_indices(index_args, &args),
        Command::Search(search_args) => search_indices(search_args, &args),
    }
}

/// Build a block store from a dump, publishing it with a rename.
fn make_store(args: &MakeArgs, cli_args: &FolioArgs) -> Result<()> {
    let start = Instant::now();
    let input = open_input(&args.dump)?;
    let temp_path = temp_sibling(&args.store)?;
    let output = BufWriter::new(File::create(&temp_path)?);

    let result = make_from_dump(input, output).and_then(|(writer, summary)| {
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        Ok(summary)
    });

    let summary = match result {
        Ok(summary) => {
            fs::rename(&temp_path, &args.store)?;
            summary
        }
        Err(e) => {
            if let Err(remove_err) = fs::remove_file(&temp_path) {
                warn!(
                    "failed to remove temporary store {}: {remove_err}",
                    temp_path.display()
                );
            }
            return Err(e);
        }
    };
    info!("wrote {} records to {}", summary.records, args.store.display());

    output_result(
        &BuildResult {
            store: args.store.display().to_string(),
            records: summary.records,
            bytes: summary.bytes,
            duration_ms: start.elapsed().as_millis() as u64,
        },
        cli_args,
    )
}

fn dump_store(args: &DumpArgs) -> Result<()> {
    let mut store = open_store(&args.store)?;
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let records = dump(&mut store, &mut out)?;
    out.flush()?;
    debug!("dumped {records} records");
    Ok(())
}

fn get_value(args: &GetArgs) -> Result<()> {
    let mut store = open_store(&args.store)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    store.find_start(args.key.as_bytes());
    let mut found = 0;
    while let Some(value) = store.find_next()? {
        out.write_all(&value)?;
        out.write_all(b"\n")?;
        found += 1;
        if !args.all {
            break;
        }
    }
    out.flush()?;

    if found == 0 {
        return Err(FolioError::invalid_argument(format!("key not found: {}", args.key)));
    }
    Ok(())
}

fn show_stats(args: &StatsArgs, cli_args: &FolioArgs) -> Result<()> {
    let stats = open_store(&args.store)?.stats()?;

    output_result(
        &StoreStats {
            store: args.store.display().to_string(),
            records: stats.records,
            bytes: stats.bytes,
            used_buckets: stats.used_buckets,
            max_table_len: stats.max_table_len,
        },
        cli_args,
    )
}

/// Rebuild the three field indices of a directory.
fn build_indices(args: &IndexArgs, cli_args: &FolioArgs) -> Result<()> {
    let start = Instant::now();
    let config = load_config(args.config.as_deref())?;
    let documents = load_documents(BufReader::new(open_input(&args.documents)?))?;
    info!("loaded {} documents", documents.len());

    let storage = directory_storage(&args.index_dir, &config, false)?;
    let manager = FieldIndexManager::new(storage, config.index);
    let summary = manager.update(&documents)?;

    output_result(
        &IndexResult {
            index_dir: args.index_dir.display().to_string(),
            documents: summary.documents,
            indices: summary
                .indices
                .iter()
                .map(|(field, index)| IndexFileResult {
                    field: *field,
                    file: field.file_name().to_string(),
                    words: index.words,
                    bytes: index.bytes,
                })
                .collect(),
            duration_ms: start.elapsed().as_millis() as u64,
        },
        cli_args,
    )
}

fn search_indices(args: &SearchArgs, cli_args: &FolioArgs) -> Result<()> {
    let start = Instant::now();
    let config = load_config(args.config.as_deref())?;
    let storage = directory_storage(&args.index_dir, &config, args.mmap)?;
    let manager = FieldIndexManager::open(storage, config.index)?;
    if !manager.is_ready() {
        return Err(FolioError::index(format!(
            "no indices found in {}",
            args.index_dir.display()
        )));
    }

    let query = dispatch(&args.query);
    debug!("searching {} for {:?}", query.field, query.text);
    let hits = manager.search_field(query.field, &query.text, args.limit)?;

    output_result(
        &SearchResults {
            query: args.query.clone(),
            field: query.field,
            hits: hits
                .iter()
                .map(|hit| HitResult {
                    id: hit.id_str().into_owned(),
                    title: hit.stored_str().into_owned(),
                    score: hit.score,
                })
                .collect(),
            duration_ms: start.elapsed().as_millis() as u64,
        },
        cli_args,
    )
}

fn open_store(path: &Path) -> Result<BlockStore<BufReader<File>>> {
    let file = File::open(path).with_context(|| format!("cannot open store {}", path.display()))?;
    BlockStore::open(BufReader::new(file))
}

/// Open a file, or standard input for `-`.
fn open_input(path: &Path) -> Result<Box<dyn Read>> {
    if path == Path::new("-") {
        Ok(Box::new(io::stdin().lock()))
    } else {
        let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
        Ok(Box::new(file))
    }
}

fn temp_sibling(path: &Path) -> Result<PathBuf> {
    let Some(name) = path.file_name() else {
        return Err(FolioError::invalid_argument(format!(
            "not a file path: {}",
            path.display()
        )));
    };
    let mut temp_name = name.to_os_string();
    temp_name.push(".tmp");
    Ok(path.with_file_name(temp_name))
}

fn load_config(path: Option<&Path>) -> Result<FieldIndexConfig> {
    match path {
        Some(path) => {
            debug!("loading configuration from {}", path.display());
            FieldIndexConfig::from_json_file(path)
        }
        None => Ok(FieldIndexConfig::default()),
    }
}

/// File storage rooted at `dir`, keeping file settings from the configuration.
fn directory_storage(dir: &Path, config: &FieldIndexConfig, mmap: bool) -> Result<Arc<dyn Storage>> {
    let mut file_config = match &config.storage {
        StorageConfig::File(file_config) => file_config.clone(),
        StorageConfig::Memory(_) => FileStorageConfig::new(dir),
    };
    file_config.path = dir.to_path_buf();
    file_config.use_mmap |= mmap;
    StorageFactory::create(StorageConfig::File(file_config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageOutput;
    use clap::Parser;

    #[test]
    fn test_temp_sibling() {
        assert_eq!(
            temp_sibling(Path::new("/data/words.store")).unwrap(),
            PathBuf::from("/data/words.store.tmp")
        );
        assert!(temp_sibling(Path::new("/")).is_err());
    }

    #[test]
    fn test_directory_storage_overrides_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = FieldIndexConfig::default();
        config.storage = StorageConfig::File(FileStorageConfig::new("/elsewhere"));

        let storage = directory_storage(dir.path(), &config, true).unwrap();
        let mut output = storage.create_output("probe").unwrap();
        output.write_all(b"x").unwrap();
        output.close().unwrap();

        assert!(dir.path().join("probe").exists());
    }

    #[test]
    fn test_missing_store_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.store");

        let err = open_store(&path).err().unwrap();
        assert!(matches!(err, FolioError::Anyhow(_)));
        assert!(err.to_string().starts_with(&format!("cannot open store {}: ", path.display())));
    }

    #[test]
    fn test_failed_make_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let dump_path = dir.path().join("bad.dump");
        let store_path = dir.path().join("out.store");
        fs::write(&dump_path, b"+1,1:a=>1\n\n").unwrap();

        let args = FolioArgs::try_parse_from([
            "folio",
            "-q",
            "make",
            dump_path.to_str().unwrap(),
            store_path.to_str().unwrap(),
        ])
        .unwrap();
        assert!(execute_command(args).is_err());

        assert!(!store_path.exists());
        assert!(!dir.path().join("out.store.tmp").exists());
    }

    #[test]
    fn test_make_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let dump_path = dir.path().join("input.dump");
        let store_path = dir.path().join("out.store");
        fs::write(&dump_path, b"+1,1:a->1\n+1,1:a->2\n\n").unwrap();

        let args = FolioArgs::try_parse_from([
            "folio",
            "-q",
            "make",
            dump_path.to_str().unwrap(),
            store_path.to_str().unwrap(),
        ])
        .unwrap();
        execute_command(args).unwrap();

        assert!(store_path.exists());
        assert!(!dir.path().join("out.store.tmp").exists());
        let mut store = open_store(&store_path).unwrap();
        assert_eq!(store.find_all(b"a").unwrap(), vec![b"1".to_vec(), b"2".to_vec()]);
    }
}
