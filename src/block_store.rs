//! Immutable on-disk hash tables ("block stores").
//!
//! A block store maps byte-string keys to byte-string values. It is written
//! once, front to back, and never modified afterwards. Lookups cost one
//! header read (cached), a short linear probe and one record read.
//!
//! # File layout
//!
//! ```text
//! +-------------------------------+  0
//! | 256 x (table_pos, table_len)  |  u32-LE pairs, 2048 bytes
//! +-------------------------------+  2048
//! | records, in insertion order:  |
//! |   key_len u32-LE              |
//! |   data_len u32-LE             |
//! |   key bytes, data bytes       |
//! +-------------------------------+  header[0].table_pos
//! | bucket 0 table ... bucket 255 |  table_len x (hash, record_pos) u32-LE pairs
//! +-------------------------------+
//! ```
//!
//! A key lives in bucket `hash % 256`. Its probe starts at slot
//! `(hash / 256) % table_len` and walks forward with wraparound. Tables hold
//! twice as many slots as entries, so every probe meets an empty slot
//! `(0, 0)` before wrapping fully. A record position of 0 is never valid
//! because offset 0 lies inside the header.
//!
//! Duplicate keys are allowed; [`BlockStore::find_start`] and
//! [`BlockStore::find_next`] walk all of them in insertion order.
//!
//! # Example
//!
//! ```
//! use std::io::Cursor;
//! use folio::block_store::{BlockStore, make};
//!
//! # fn main() -> folio::error::Result<()> {
//! let (file, _) = make(Cursor::new(Vec::new()), [("one", "1"), ("two", "2")])?;
//!
//! let mut store = BlockStore::open(Cursor::new(file.into_inner()))?;
//! assert_eq!(store.find(b"two")?, Some(b"2".to_vec()));
//! assert_eq!(store.find(b"three")?, None);
//! # Ok(())
//! # }
//! ```

pub mod dump;
pub mod reader;
pub mod writer;

pub use dump::{dump, make_from_dump};
pub use reader::{BlockStore, BlockStoreStats, Records};
pub use writer::{BlockStoreWriter, BuildSummary, make};

/// Number of top-level buckets.
pub const BUCKET_COUNT: usize = 256;

/// Size in bytes of one `(u32, u32)` header or table slot.
pub const SLOT_SIZE: u64 = 8;

/// Size in bytes of the bucket header at the start of every store.
pub const HEADER_SIZE: u64 = BUCKET_COUNT as u64 * SLOT_SIZE;

/// Size in bytes of the `(key_len, data_len)` prefix of every record.
pub const RECORD_PREFIX_SIZE: u64 = 8;

/// Bucket a hash falls into.
#[inline]
pub(crate) fn bucket_of(hash: u32) -> usize {
    (hash % BUCKET_COUNT as u32) as usize
}

/// First slot probed for a hash in a table of `table_len` slots.
#[inline]
pub(crate) fn start_slot(hash: u32, table_len: u32) -> u32 {
    (hash / BUCKET_COUNT as u32) % table_len
}
