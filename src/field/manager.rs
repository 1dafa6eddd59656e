//! The three field indices of one repository, rebuilt and searched together.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{FolioError, Result};
use crate::field::{Field, SourceDocument, dispatch};
use crate::index::{IndexConfig, IndexReader, IndexSummary, IndexWriter, PendingIndex, SearchHit};
use crate::storage::{Storage, StorageConfig, StorageFactory};

/// Configuration of a [`FieldIndexManager`].
///
/// ```
/// use folio::field::FieldIndexConfig;
/// use folio::storage::StorageConfig;
///
/// let config: FieldIndexConfig = serde_json::from_str(r#"{
///     "index": {"analyzer": {"stop_words": ["the", "a"]}},
///     "storage": {"type": "file", "path": "/var/lib/folio"}
/// }"#).unwrap();
/// assert!(matches!(config.storage, StorageConfig::File(_)));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldIndexConfig {
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl FieldIndexConfig {
    /// Load a configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Outcome of [`FieldIndexManager::update`].
#[derive(Debug, Clone)]
pub struct UpdateSummary {
    pub documents: usize,
    pub indices: Vec<(Field, IndexSummary)>,
    pub duration: Duration,
}

#[derive(Debug)]
struct FieldReaders {
    routes: IndexReader,
    tags: IndexReader,
    content: IndexReader,
}

impl FieldReaders {
    fn open(storage: &dyn Storage, config: &IndexConfig) -> Result<Self> {
        Ok(FieldReaders {
            routes: IndexReader::open(storage, Field::Routes.file_name(), config)?,
            tags: IndexReader::open(storage, Field::Tags.file_name(), config)?,
            content: IndexReader::open(storage, Field::Content.file_name(), config)?,
        })
    }

    fn get(&self, field: Field) -> &IndexReader {
        match field {
            Field::Routes => &self.routes,
            Field::Tags => &self.tags,
            Field::Content => &self.content,
        }
    }
}

/// Owns the routes, tags and content indices of a repository.
///
/// [`update`](Self::update) rebuilds all three from scratch in parallel and
/// publishes them only if every build succeeded. Publishing renames the files
/// one at a time, so a failed rename can leave the files on disk from mixed
/// generations until the next successful update. Searches running during an
/// update keep using the readers they started with.
#[derive(Debug)]
pub struct FieldIndexManager {
    storage: Arc<dyn Storage>,
    config: IndexConfig,
    readers: RwLock<Option<Arc<FieldReaders>>>,
    update_lock: Mutex<()>,
}

impl FieldIndexManager {
    /// Create a manager over `storage` with no indices loaded.
    ///
    /// Searches return nothing until [`update`](Self::update) succeeds.
    pub fn new(storage: Arc<dyn Storage>, config: IndexConfig) -> Self {
        FieldIndexManager {
            storage,
            config,
            readers: RwLock::new(None),
            update_lock: Mutex::new(()),
        }
    }

    /// Create a manager over `storage`, opening the indices already present.
    ///
    /// Fails if the indices exist but cannot be opened with `config`.
    pub fn open(storage: Arc<dyn Storage>, config: IndexConfig) -> Result<Self> {
        let manager = Self::new(storage, config);
        let present = Field::ALL
            .iter()
            .all(|field| manager.storage.file_exists(field.file_name()));

        if present {
            let readers = FieldReaders::open(manager.storage.as_ref(), &manager.config)?;
            *manager.readers.write() = Some(Arc::new(readers));
        } else {
            debug!("no complete set of field indices found; waiting for the first update");
        }
        Ok(manager)
    }

    /// Create the storage described by `config` and open a manager over it.
    pub fn from_config(config: &FieldIndexConfig) -> Result<Self> {
        let storage = StorageFactory::create(config.storage.clone())?;
        Self::open(storage, config.index.clone())
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Returns true once all three indices are available for searching.
    pub fn is_ready(&self) -> bool {
        self.readers.read().is_some()
    }

    /// Rebuild the three indices from `documents`.
    ///
    /// Each index is written to a temporary file concurrently. When all three
    /// succeed they are renamed into place and the manager switches to them;
    /// otherwise every temporary file is removed, the previous indices stay
    /// live and the first error is returned.
    ///
    /// The renames are not atomic as a group. If one fails after an earlier
    /// one went through, the error is returned and the manager keeps serving
    /// its previous readers, but the files already renamed hold the new
    /// generation. A later [`open`](Self::open) may then load indices from
    /// different generations until an update succeeds.
    pub fn update(&self, documents: &[SourceDocument]) -> Result<UpdateSummary> {
        let _guard = self.update_lock.lock();
        let start = Instant::now();

        let results: Vec<Result<PendingIndex>> = Field::ALL
            .par_iter()
            .map(|&field| self.build(field, documents))
            .collect();

        let mut pending = Vec::with_capacity(results.len());
        let mut error = None;
        for result in results {
            match result {
                Ok(index) => pending.push(index),
                Err(e) => {
                    error.get_or_insert(e);
                }
            }
        }
        if let Some(e) = error {
            self.discard_all(pending);
            return Err(e);
        }

        let mut indices = Vec::with_capacity(pending.len());
        let mut pending = pending.into_iter();
        for field in Field::ALL {
            let Some(index) = pending.next() else {
                return Err(FolioError::index(format!("missing build result for {field}")));
            };
            match index.publish(self.storage.as_ref()) {
                Ok(summary) => indices.push((field, summary)),
                Err(e) => {
                    self.discard_all(pending);
                    return Err(e);
                }
            }
        }

        let readers = FieldReaders::open(self.storage.as_ref(), &self.config)?;
        *self.readers.write() = Some(Arc::new(readers));

        let summary = UpdateSummary {
            documents: documents.len(),
            indices,
            duration: start.elapsed(),
        };
        info!(
            "rebuilt field indices for {} documents in {:?}",
            summary.documents, summary.duration
        );
        Ok(summary)
    }

    /// Dispatch a raw query by its sigil and search the chosen index.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let query = dispatch(query);
        self.search_field(query.field, &query.text, limit)
    }

    /// Search one field index directly. Returns no hits before the first update.
    pub fn search_field(&self, field: Field, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let readers = self.readers.read().clone();
        match readers {
            Some(readers) => readers.get(field).search(query, limit),
            None => Ok(Vec::new()),
        }
    }

    fn build(&self, field: Field, documents: &[SourceDocument]) -> Result<PendingIndex> {
        let mut writer = IndexWriter::new(&self.config)?;
        for doc in documents {
            writer.add_document(doc.id().as_bytes(), &field.project(doc), &doc.stored_value())?;
        }
        writer.prepare(self.storage.as_ref(), field.file_name())
    }

    fn discard_all<I: IntoIterator<Item = PendingIndex>>(&self, pending: I) {
        for index in pending {
            let name = index.name().to_string();
            if let Err(e) = index.discard(self.storage.as_ref()) {
                warn!("failed to discard unpublished index {name}: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyzer::AnalyzerConfig;
    use crate::storage::memory::MemoryStorage;
    use crate::storage::{StorageInput, StorageOutput};

    /// Memory storage whose renames onto one name fail.
    #[derive(Debug, Default)]
    struct RenameFailingStorage {
        inner: MemoryStorage,
        failing_target: Mutex<Option<String>>,
    }

    impl Storage for RenameFailingStorage {
        fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>> {
            self.inner.open_input(name)
        }

        fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>> {
            self.inner.create_output(name)
        }

        fn file_exists(&self, name: &str) -> bool {
            self.inner.file_exists(name)
        }

        fn delete_file(&self, name: &str) -> Result<()> {
            self.inner.delete_file(name)
        }

        fn list_files(&self) -> Result<Vec<String>> {
            self.inner.list_files()
        }

        fn file_size(&self, name: &str) -> Result<u64> {
            self.inner.file_size(name)
        }

        fn rename_file(&self, old_name: &str, new_name: &str) -> Result<()> {
            if self.failing_target.lock().as_deref() == Some(new_name) {
                return Err(FolioError::storage(format!("rename onto {new_name} refused")));
            }
            self.inner.rename_file(old_name, new_name)
        }
    }

    fn corpus() -> Vec<SourceDocument> {
        vec![
            SourceDocument::new("/docs/intro")
                .with_title("Introduction")
                .with_tags(["basics"])
                .with_body("Start here to learn the basics."),
            SourceDocument::new("/docs/golang")
                .with_title("Go Guide")
                .with_tags(["golang", "languages"])
                .with_body("Writing services in Go."),
            SourceDocument::new("/blog/rust")
                .with_title("Why Rust")
                .with_tags(["rust", "languages"])
                .with_body("Rust rust rust."),
        ]
    }

    fn manager() -> FieldIndexManager {
        FieldIndexManager::new(Arc::new(MemoryStorage::default()), IndexConfig::default())
    }

    #[test]
    fn test_empty_before_update() {
        let manager = manager();
        assert!(!manager.is_ready());
        assert!(manager.search("anything", 10).unwrap().is_empty());
    }

    #[test]
    fn test_update_and_dispatch() {
        let manager = manager();
        let summary = manager.update(&corpus()).unwrap();

        assert_eq!(summary.documents, 3);
        assert_eq!(summary.indices.len(), 3);
        assert!(manager.is_ready());
        assert_eq!(
            manager.storage().list_files().unwrap(),
            vec!["content.idx", "routes.idx", "tags.idx"]
        );

        let hits = manager.search("/docs/intro", 10).unwrap();
        assert_eq!(hits[0].id_str(), "/docs/intro");
        assert_eq!(hits[0].stored_str(), "Introduction");
        // "docs" matches both routes under /docs
        assert_eq!(hits.len(), 2);

        let hits = manager.search("#golang", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id_str(), "/docs/golang");

        let hits = manager.search("#languages", 10).unwrap();
        assert_eq!(hits.len(), 2);

        let hits = manager.search("rust", 10).unwrap();
        assert_eq!(hits[0].id_str(), "/blog/rust");
        // three in the body, one in the title, one in the route, one in the stored title
        assert_eq!(hits[0].score, 6);
    }

    #[test]
    fn test_failed_update_keeps_previous_indices() {
        let manager = manager();
        manager.update(&corpus()).unwrap();

        let mut duplicated = corpus();
        duplicated.push(SourceDocument::new("/docs/intro/").with_title("Again"));
        let err = manager.update(&duplicated).unwrap_err();

        assert!(matches!(err, FolioError::Index(_)));
        assert_eq!(manager.storage().list_files().unwrap().len(), 3);
        assert_eq!(
            manager.search("/docs/intro", 1).unwrap()[0].stored_str(),
            "Introduction"
        );
    }

    #[test]
    fn test_failed_rename_keeps_previous_readers() {
        let storage = Arc::new(RenameFailingStorage::default());
        let manager = FieldIndexManager::new(storage.clone(), IndexConfig::default());
        manager.update(&corpus()).unwrap();

        *storage.failing_target.lock() = Some(Field::Tags.file_name().to_string());
        let err = manager
            .update(&[SourceDocument::new("/only").with_body("fresh").with_tags(["new"])])
            .unwrap_err();
        assert!(matches!(err, FolioError::Storage(_)));

        // the manager still serves the generation it last opened
        assert_eq!(manager.search("#golang", 10).unwrap().len(), 1);
        assert!(manager.search("fresh", 10).unwrap().is_empty());
        assert!(manager.search("/only", 10).unwrap().is_empty());
        assert_eq!(
            storage.list_files().unwrap(),
            vec!["content.idx", "routes.idx", "tags.idx"]
        );

        // routes.idx was renamed before the tags rename failed
        let routes = IndexReader::open(storage.as_ref(), Field::Routes.file_name(), &IndexConfig::default()).unwrap();
        assert_eq!(routes.search("only", 10).unwrap()[0].id_str(), "/only");
        let tags = IndexReader::open(storage.as_ref(), Field::Tags.file_name(), &IndexConfig::default()).unwrap();
        assert!(tags.search("new", 10).unwrap().is_empty());
    }

    #[test]
    fn test_update_replaces_content() {
        let manager = manager();
        manager.update(&corpus()).unwrap();
        manager
            .update(&[SourceDocument::new("/only").with_body("fresh")])
            .unwrap();

        assert!(manager.search("rust", 10).unwrap().is_empty());
        assert_eq!(manager.search("fresh", 10).unwrap()[0].id_str(), "/only");
    }

    #[test]
    fn test_reopens_existing_indices() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::default());
        let config = IndexConfig {
            analyzer: AnalyzerConfig::with_stop_words(["the"]),
        };
        FieldIndexManager::new(Arc::clone(&storage), config.clone())
            .update(&corpus())
            .unwrap();

        let reopened = FieldIndexManager::open(Arc::clone(&storage), config).unwrap();
        assert!(reopened.is_ready());
        assert_eq!(reopened.search("#rust", 10).unwrap().len(), 1);

        let empty = FieldIndexManager::open(Arc::new(MemoryStorage::default()), IndexConfig::default()).unwrap();
        assert!(!empty.is_ready());

        let mismatched = FieldIndexManager::open(storage, IndexConfig::default());
        assert!(matches!(mismatched, Err(FolioError::Format(_))));
    }

    #[test]
    fn test_config_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("folio.json");
        fs::write(&path, r#"{"index": {"analyzer": {"use_default_stop_words": true}}}"#).unwrap();

        let config = FieldIndexConfig::from_json_file(&path).unwrap();
        assert!(config.index.analyzer.use_default_stop_words);
        assert!(matches!(config.storage, StorageConfig::Memory(_)));
    }
}
