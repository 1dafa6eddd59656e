//! Block store construction.

use std::io::{Seek, Write};

use log::debug;

use crate::block_store::{BUCKET_COUNT, HEADER_SIZE, bucket_of, start_slot};
use crate::error::{FolioError, Result};
use crate::storage::structured::StructWriter;
use crate::util::hash::hash;

/// Counts describing a finished store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildSummary {
    /// Number of records written.
    pub records: usize,
    /// Total file length in bytes.
    pub bytes: u64,
}

/// Streams records into a new block store.
///
/// Records go straight to the output as they are added; only their
/// `(hash, position)` pairs are kept in memory until [`finish`](Self::finish)
/// writes the hash tables and patches the header.
#[derive(Debug)]
pub struct BlockStoreWriter<W: Write + Seek> {
    out: StructWriter<W>,
    buckets: Vec<Vec<(u32, u32)>>,
    records: usize,
}

impl<W: Write + Seek> BlockStoreWriter<W> {
    /// Start a store at the beginning of `writer`, reserving the header.
    pub fn new(writer: W) -> Result<Self> {
        let mut out = StructWriter::new(writer);
        out.write_zeros(HEADER_SIZE as usize)?;

        Ok(BlockStoreWriter {
            out,
            buckets: vec![Vec::new(); BUCKET_COUNT],
            records: 0,
        })
    }

    /// Append one record. Keys need not be unique.
    pub fn add(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        let key_len = length_u32(key.len(), "key")?;
        let value_len = length_u32(value.len(), "value")?;
        let position = self.out.position_u32()?;

        self.out.write_u32_pair(key_len, value_len)?;
        self.out.write_raw(key)?;
        self.out.write_raw(value)?;

        let h = hash(key);
        self.buckets[bucket_of(h)].push((h, position));
        self.records += 1;
        Ok(())
    }

    /// Number of records added so far.
    pub fn len(&self) -> usize {
        self.records
    }

    /// Returns true if no record has been added.
    pub fn is_empty(&self) -> bool {
        self.records == 0
    }

    /// Write the hash tables and the header, returning the writer and a summary.
    ///
    /// The writer is left positioned at the end of the store.
    pub fn finish(mut self) -> Result<(W, BuildSummary)> {
        let mut header = [(0u32, 0u32); BUCKET_COUNT];
        let mut longest_table = 0usize;

        for (bucket, entries) in self.buckets.iter().enumerate() {
            let table = build_table(entries);
            header[bucket] = (self.out.position_u32()?, table.len() as u32);
            longest_table = longest_table.max(table.len());

            for &(h, position) in &table {
                self.out.write_u32_pair(h, position)?;
            }
        }

        let bytes = self.out.position();
        // The end of the last table must still be addressable.
        self.out.position_u32()?;

        self.out.seek(0)?;
        for &(table_pos, table_len) in &header {
            self.out.write_u32_pair(table_pos, table_len)?;
        }
        self.out.seek(bytes)?;

        debug!(
            "block store finished: {} records, {} bytes, largest table {} slots",
            self.records, bytes, longest_table
        );

        Ok((
            self.out.into_inner(),
            BuildSummary {
                records: self.records,
                bytes,
            },
        ))
    }
}

/// Lay out one bucket's entries in a table twice their count, by linear probing.
fn build_table(entries: &[(u32, u32)]) -> Vec<(u32, u32)> {
    let table_len = entries.len() * 2;
    let mut table = vec![(0u32, 0u32); table_len];

    for &(h, position) in entries {
        let mut slot = start_slot(h, table_len as u32) as usize;
        while table[slot].1 != 0 {
            slot = (slot + 1) % table_len;
        }
        table[slot] = (h, position);
    }

    table
}

fn length_u32(len: usize, what: &str) -> Result<u32> {
    u32::try_from(len)
        .map_err(|_| FolioError::format(format!("{what} of {len} bytes is too large for a block store")))
}

/// Build a complete store from `records` in order.
pub fn make<W, I, K, V>(writer: W, records: I) -> Result<(W, BuildSummary)>
where
    W: Write + Seek,
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<[u8]>,
    V: AsRef<[u8]>,
{
    let mut store = BlockStoreWriter::new(writer)?;
    for (key, value) in records {
        store.add(key.as_ref(), value.as_ref())?;
    }
    store.finish()
}
