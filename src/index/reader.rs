//! Index searcher.

use std::io::{Read, Seek, SeekFrom};
use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use log::info;
use parking_lot::Mutex;

use crate::analysis::analyzer::{Analyzer, StandardAnalyzer};
use crate::block_store::BlockStore;
use crate::error::{FolioError, Result};
use crate::index::header::{INDEX_HEADER_SIZE, IndexHeader};
use crate::index::posting::{self, Posting};
use crate::index::{IndexConfig, SearchHit};
use crate::storage::memory::MemoryInput;
use crate::storage::{Storage, StorageInput};

type StoreView = Mutex<BlockStore<Box<dyn StorageInput>>>;

/// Read-only view of one index file.
///
/// The document store and the word store each get their own input handle, so
/// a search only ever holds one lock at a time. The reader is `Send + Sync`
/// and can be shared behind an `Arc`.
#[derive(Debug)]
pub struct IndexReader {
    header: IndexHeader,
    analyzer: StandardAnalyzer,
    documents: StoreView,
    words: StoreView,
}

impl IndexReader {
    /// Open the index file `name` of `storage`.
    pub fn open(storage: &dyn Storage, name: &str, config: &IndexConfig) -> Result<Self> {
        let reader = Self::from_input(storage.open_input(name)?, config)?;
        info!(
            "opened index {name} ({} documents, {} words)",
            reader.header.document_count, reader.header.word_count
        );
        Ok(reader)
    }

    /// Open an index held in memory.
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>, config: &IndexConfig) -> Result<Self> {
        Self::from_input(Box::new(MemoryInput::new(bytes.into())), config)
    }

    /// Open an index from an input handle.
    ///
    /// The header, the file length, and both store headers are checked here;
    /// a file that fails any check is rejected with [`FolioError::Format`].
    pub fn from_input(mut input: Box<dyn StorageInput>, config: &IndexConfig) -> Result<Self> {
        let size = input.size()?;
        if size < INDEX_HEADER_SIZE {
            return Err(FolioError::format(format!(
                "index file of {size} bytes is shorter than its header"
            )));
        }

        let mut buf = vec![0u8; INDEX_HEADER_SIZE as usize];
        input.seek(SeekFrom::Start(0))?;
        input.read_exact(&mut buf)?;
        let header = IndexHeader::decode(&buf)?;

        if header.file_len() != size {
            return Err(FolioError::format(format!(
                "index header describes {} bytes but the file has {size}",
                header.file_len()
            )));
        }

        let analyzer = StandardAnalyzer::from_config(&config.analyzer)?;
        if analyzer.fingerprint() != header.analyzer_fingerprint {
            return Err(FolioError::format(
                "index was built with different analyzer settings",
            ));
        }

        let word_input = input.clone_input()?;
        let documents = BlockStore::open_at(input, header.document_store_offset(), header.document_store_len)?;
        let words = BlockStore::open_at(word_input, header.word_store_offset(), header.word_store_len)?;

        Ok(IndexReader {
            header,
            analyzer,
            documents: Mutex::new(documents),
            words: Mutex::new(words),
        })
    }

    pub fn header(&self) -> &IndexHeader {
        &self.header
    }

    /// Number of indexed documents.
    pub fn document_count(&self) -> u64 {
        self.header.document_count
    }

    /// Number of distinct words.
    pub fn word_count(&self) -> u64 {
        self.header.word_count
    }

    /// Look up the stored value of a document.
    pub fn document(&self, id: &[u8]) -> Result<Option<Vec<u8>>> {
        self.documents.lock().find(id)
    }

    /// Posting list of an already normalized word.
    pub fn postings(&self, word: &str) -> Result<Vec<Posting>> {
        match self.words.lock().find(word.as_bytes())? {
            Some(bytes) => posting::decode(&bytes),
            None => Ok(Vec::new()),
        }
    }

    /// Return up to `limit` documents matching `query`, best first.
    ///
    /// The query is analyzed like the indexed text and each distinct word is
    /// looked up once. A document scores the sum of the occurrence counts of
    /// the query words it contains. Ties are broken by ascending id.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut seen = AHashSet::new();
        let words: Vec<String> = self
            .analyzer
            .words(query)?
            .into_iter()
            .filter(|word| seen.insert(word.clone()))
            .collect();

        let mut scores: AHashMap<Vec<u8>, u64> = AHashMap::new();
        {
            let mut store = self.words.lock();
            for word in &words {
                let Some(bytes) = store.find(word.as_bytes())? else {
                    continue;
                };
                for (id, count) in posting::decode(&bytes)? {
                    let score = scores.entry(id).or_insert(0);
                    *score = score.saturating_add(count);
                }
            }
        }

        let mut ranked: Vec<(Vec<u8>, u64)> = scores.into_iter().collect();
        ranked.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(limit);

        let mut store = self.documents.lock();
        ranked
            .into_iter()
            .map(|(id, score)| match store.find(&id)? {
                Some(stored) => Ok(SearchHit { id, stored, score }),
                None => Err(FolioError::corrupt(format!(
                    "document {:?} is in the word store but not in the document store",
                    String::from_utf8_lossy(&id)
                ))),
            })
            .collect()
    }
}
