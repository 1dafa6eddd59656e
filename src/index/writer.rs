//! Index builder.

use std::io::{Cursor, Write};

use ahash::{AHashMap, AHashSet};
use log::{debug, info, warn};

use crate::analysis::analyzer::{Analyzer, StandardAnalyzer};
use crate::block_store::BlockStoreWriter;
use crate::error::{FolioError, Result};
use crate::index::IndexConfig;
use crate::index::header::IndexHeader;
use crate::index::posting;
use crate::storage::{Storage, StorageOutput};

/// Statistics of a finished index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexSummary {
    /// Number of documents.
    pub documents: usize,
    /// Number of distinct words.
    pub words: usize,
    /// Total bytes written, header included.
    pub bytes: u64,
}

/// Accumulates documents in memory and serializes them into one index file.
///
/// Each document contributes its stored value to the document store and the
/// words of both its indexed and stored text to the word frequency table.
#[derive(Debug)]
pub struct IndexWriter {
    analyzer: StandardAnalyzer,
    documents: Vec<(Vec<u8>, Vec<u8>)>,
    ids: AHashSet<Vec<u8>>,
    frequencies: AHashMap<String, AHashMap<Vec<u8>, u64>>,
}

impl IndexWriter {
    pub fn new(config: &IndexConfig) -> Result<Self> {
        Ok(IndexWriter {
            analyzer: StandardAnalyzer::from_config(&config.analyzer)?,
            documents: Vec::new(),
            ids: AHashSet::new(),
            frequencies: AHashMap::new(),
        })
    }

    /// Stage a document.
    ///
    /// Fails with [`FolioError::Index`] if `id` was already added.
    pub fn add_document(&mut self, id: &[u8], index_value: &str, store_value: &str) -> Result<()> {
        if self.ids.contains(id) {
            return Err(FolioError::index(format!(
                "duplicate document id {:?}",
                String::from_utf8_lossy(id)
            )));
        }

        let mut words = self.analyzer.words(index_value)?;
        words.extend(self.analyzer.words(store_value)?);
        for word in words {
            let postings = self.frequencies.entry(word).or_default();
            match postings.get_mut(id) {
                Some(count) => *count += 1,
                None => {
                    postings.insert(id.to_vec(), 1);
                }
            }
        }

        self.ids.insert(id.to_vec());
        self.documents.push((id.to_vec(), store_value.as_bytes().to_vec()));
        Ok(())
    }

    /// Number of staged documents.
    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    /// Number of distinct words seen so far.
    pub fn word_count(&self) -> usize {
        self.frequencies.len()
    }

    /// Serialize the index into `out`: header, document store, word store.
    ///
    /// Documents are written in id order and words in byte order, so the same
    /// set of documents always produces the same file.
    pub fn finalize<W: Write>(mut self, out: &mut W) -> Result<IndexSummary> {
        self.documents.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        let mut documents = BlockStoreWriter::new(Cursor::new(Vec::new()))?;
        for (id, stored) in &self.documents {
            documents.add(id, stored)?;
        }
        let (documents, document_summary) = documents.finish()?;

        let mut words: Vec<(String, AHashMap<Vec<u8>, u64>)> = self.frequencies.into_iter().collect();
        words.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        let mut word_store = BlockStoreWriter::new(Cursor::new(Vec::new()))?;
        for (word, postings) in &words {
            let mut postings: Vec<(&[u8], u64)> =
                postings.iter().map(|(id, count)| (id.as_slice(), *count)).collect();
            postings.sort_unstable_by(|a, b| a.0.cmp(b.0));
            word_store.add(word.as_bytes(), &posting::encode(postings))?;
        }
        let (word_store, word_summary) = word_store.finish()?;

        let header = IndexHeader {
            analyzer_fingerprint: self.analyzer.fingerprint(),
            document_store_len: document_summary.bytes,
            word_store_len: word_summary.bytes,
            document_count: self.documents.len() as u64,
            word_count: words.len() as u64,
        };
        out.write_all(&header.encode())?;
        out.write_all(documents.get_ref())?;
        out.write_all(word_store.get_ref())?;
        out.flush()?;

        debug!(
            "index finalized: {} documents ({} bytes), {} words ({} bytes)",
            header.document_count, header.document_store_len, header.word_count, header.word_store_len
        );

        Ok(IndexSummary {
            documents: self.documents.len(),
            words: words.len(),
            bytes: header.file_len(),
        })
    }

    /// Write the index to a temporary file of `storage` without publishing it.
    ///
    /// The temporary file is deleted if writing fails.
    pub fn prepare(self, storage: &dyn Storage, name: &str) -> Result<PendingIndex> {
        let (temp_name, mut output) = storage.create_temp_output(name)?;

        let result = self.finalize(&mut output).and_then(|summary| {
            output.flush_and_sync()?;
            output.close()?;
            Ok(summary)
        });
        drop(output);

        match result {
            Ok(summary) => Ok(PendingIndex {
                temp_name,
                name: name.to_string(),
                summary,
            }),
            Err(e) => {
                remove_temp(storage, &temp_name);
                Err(e)
            }
        }
    }

    /// Write the index and atomically replace `name` with it.
    pub fn commit(self, storage: &dyn Storage, name: &str) -> Result<IndexSummary> {
        self.prepare(storage, name)?.publish(storage)
    }
}

/// A fully written index waiting in a temporary file.
///
/// Either [`publish`](PendingIndex::publish) it or
/// [`discard`](PendingIndex::discard) it.
#[derive(Debug)]
#[must_use]
pub struct PendingIndex {
    temp_name: String,
    name: String,
    summary: IndexSummary,
}

impl PendingIndex {
    /// Name the index will be published under.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn summary(&self) -> &IndexSummary {
        &self.summary
    }

    /// Rename the temporary file over the live name.
    pub fn publish(self, storage: &dyn Storage) -> Result<IndexSummary> {
        if let Err(e) = storage.rename_file(&self.temp_name, &self.name) {
            remove_temp(storage, &self.temp_name);
            return Err(e);
        }

        info!(
            "published index {} ({} documents, {} words, {} bytes)",
            self.name, self.summary.documents, self.summary.words, self.summary.bytes
        );
        Ok(self.summary)
    }

    /// Delete the temporary file.
    pub fn discard(self, storage: &dyn Storage) -> Result<()> {
        storage.delete_file(&self.temp_name)
    }
}

fn remove_temp(storage: &dyn Storage, temp_name: &str) {
    if let Err(e) = storage.delete_file(temp_name) {
        warn!("failed to remove temporary file {temp_name}: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyzer::AnalyzerConfig;
    use crate::block_store::BlockStore;
    use crate::index::INDEX_HEADER_SIZE;
    use crate::storage::memory::MemoryStorage;

    fn build(docs: &[(&str, &str, &str)]) -> Vec<u8> {
        let mut writer = IndexWriter::new(&IndexConfig::default()).unwrap();
        for (id, index_value, store_value) in docs {
            writer.add_document(id.as_bytes(), index_value, store_value).unwrap();
        }
        let mut out = Vec::new();
        writer.finalize(&mut out).unwrap();
        out
    }

    #[test]
    fn test_counts_words_from_both_values() {
        let mut writer = IndexWriter::new(&IndexConfig::default()).unwrap();
        writer.add_document(b"/a", "Fox fox", "The fox").unwrap();
        writer.add_document(b"/b", "dog", "").unwrap();

        assert_eq!(writer.document_count(), 2);
        assert_eq!(writer.word_count(), 3);
        assert_eq!(writer.frequencies["fox"][b"/a".as_slice()], 3);
        assert_eq!(writer.frequencies["the"][b"/a".as_slice()], 1);
        assert_eq!(writer.frequencies["dog"][b"/b".as_slice()], 1);
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let mut writer = IndexWriter::new(&IndexConfig::default()).unwrap();
        writer.add_document(b"/a", "one", "One").unwrap();
        let err = writer.add_document(b"/a", "two", "Two").unwrap_err();

        assert!(matches!(err, FolioError::Index(_)));
        assert_eq!(writer.document_count(), 1);
        assert!(!writer.frequencies.contains_key("two"));
    }

    #[test]
    fn test_file_layout() {
        let bytes = build(&[("/b", "brown fox", "B"), ("/a", "quick fox", "A")]);
        let header = IndexHeader::decode(&bytes).unwrap();

        assert_eq!(header.document_count, 2);
        assert_eq!(header.word_count, 5);
        assert_eq!(header.file_len(), bytes.len() as u64);

        let mut documents = BlockStore::open_at(
            Cursor::new(bytes.clone()),
            INDEX_HEADER_SIZE,
            header.document_store_len,
        )
        .unwrap();
        let stored: Vec<_> = documents.iter().map(|r| r.unwrap()).collect();
        assert_eq!(
            stored,
            vec![
                (b"/a".to_vec(), b"A".to_vec()),
                (b"/b".to_vec(), b"B".to_vec())
            ]
        );

        let mut words =
            BlockStore::open_at(Cursor::new(bytes), header.word_store_offset(), header.word_store_len).unwrap();
        let fox = posting::decode(&words.find(b"fox").unwrap().unwrap()).unwrap();
        assert_eq!(fox, vec![(b"/a".to_vec(), 1), (b"/b".to_vec(), 1)]);
    }

    #[test]
    fn test_output_is_deterministic() {
        let first = build(&[("/a", "x y z", "A"), ("/b", "z y", "B"), ("/c", "w", "C")]);
        let second = build(&[("/c", "w", "C"), ("/b", "z y", "B"), ("/a", "x y z", "A")]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_fingerprint_recorded() {
        let config = IndexConfig {
            analyzer: AnalyzerConfig::with_stop_words(["the"]),
        };
        let mut out = Vec::new();
        IndexWriter::new(&config).unwrap().finalize(&mut out).unwrap();

        let header = IndexHeader::decode(&out).unwrap();
        assert_eq!(header.analyzer_fingerprint, config.analyzer.fingerprint());
        assert_eq!(header.document_count, 0);
    }

    #[test]
    fn test_commit_publishes_and_cleans_up() {
        let storage = MemoryStorage::default();
        let mut writer = IndexWriter::new(&IndexConfig::default()).unwrap();
        writer.add_document(b"/a", "hello", "A").unwrap();

        let summary = writer.commit(&storage, "content.idx").unwrap();

        assert_eq!(summary.documents, 1);
        assert_eq!(storage.list_files().unwrap(), vec!["content.idx".to_string()]);
        assert_eq!(storage.file_size("content.idx").unwrap(), summary.bytes);
    }

    #[test]
    fn test_discard_leaves_live_file() {
        let storage = MemoryStorage::default();
        IndexWriter::new(&IndexConfig::default())
            .unwrap()
            .commit(&storage, "tags.idx")
            .unwrap();
        let before = storage.file_size("tags.idx").unwrap();

        let mut writer = IndexWriter::new(&IndexConfig::default()).unwrap();
        writer.add_document(b"/a", "golang", "A").unwrap();
        let pending = writer.prepare(&storage, "tags.idx").unwrap();
        assert_eq!(storage.list_files().unwrap().len(), 2);
        pending.discard(&storage).unwrap();

        assert_eq!(storage.list_files().unwrap(), vec!["tags.idx".to_string()]);
        assert_eq!(storage.file_size("tags.idx").unwrap(), before);
    }
}
