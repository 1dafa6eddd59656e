//! # Folio
//!
//! Keyword search for small document repositories, built on immutable
//! on-disk hash tables.
//!
//! ## Layers
//!
//! - [`block_store`]: write-once key/value files with constant-time lookup
//! - [`analysis`]: the tokenizer and filters shared by indexing and querying
//! - [`index`]: a document store and a word store in one file, searched by
//!   summed term frequency
//! - [`field`]: routes, tags and content indices with sigil query dispatch
//! - [`storage`]: file and in-memory backends with atomic publication

pub mod analysis;
pub mod block_store;
pub mod cli;
pub mod error;
pub mod field;
pub mod index;
pub mod storage;
pub mod util;

pub mod prelude {
    pub use crate::error::{FolioError, Result};
    pub use crate::field::{Field, FieldIndexConfig, FieldIndexManager, SourceDocument, dispatch};
    pub use crate::index::{IndexConfig, IndexReader, IndexWriter, SearchHit};
    pub use crate::storage::{Storage, StorageConfig, StorageFactory};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
