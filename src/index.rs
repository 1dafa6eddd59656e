//! Keyword search indices stored as a pair of block stores.
//!
//! An index file is a fixed 4096-byte header followed by two block stores:
//!
//! ```text
//! [ header, 4096 bytes ][ document store ][ word store ]
//! ```
//!
//! The document store maps a document id to the value stored for it (usually
//! a title or snippet). The word store maps every normalized word to a
//! posting list of `(document id, occurrence count)` pairs. A query is
//! analyzed like the indexed text, the posting lists of its words are summed
//! per document, and the best documents are returned with their stored
//! values.
//!
//! # Example
//!
//! ```
//! use std::io::Cursor;
//! use folio::index::{IndexConfig, IndexReader, IndexWriter};
//!
//! # fn main() -> folio::error::Result<()> {
//! let config = IndexConfig::default();
//! let mut writer = IndexWriter::new(&config)?;
//! writer.add_document(b"/a", "the quick fox", "A")?;
//! writer.add_document(b"/b", "quick brown fox", "B")?;
//!
//! let mut file = Vec::new();
//! writer.finalize(&mut file)?;
//!
//! let reader = IndexReader::from_bytes(file, &config)?;
//! let hits = reader.search("quick fox", 10)?;
//! assert_eq!(hits.len(), 2);
//! assert_eq!(hits[0].id, b"/a");
//! assert_eq!(hits[0].score, 2);
//! # Ok(())
//! # }
//! ```

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::analysis::analyzer::AnalyzerConfig;

pub mod header;
pub mod posting;
pub mod reader;
pub mod writer;

pub use header::{INDEX_HEADER_SIZE, IndexHeader};
pub use reader::IndexReader;
pub use writer::{IndexSummary, IndexWriter, PendingIndex};

/// Settings shared by the writer and the reader of an index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Text analysis applied to documents and queries alike.
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
}

/// One ranked search result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    /// Document id as given to [`IndexWriter::add_document`].
    pub id: Vec<u8>,
    /// The stored value of the document.
    pub stored: Vec<u8>,
    /// Sum of the occurrence counts of every query word in the document.
    pub score: u64,
}

impl SearchHit {
    /// The id as text, replacing invalid UTF-8.
    pub fn id_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.id)
    }

    /// The stored value as text, replacing invalid UTF-8.
    pub fn stored_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stored)
    }
}
