//! Block store lookups.

use std::io::{Read, Seek};

use crate::block_store::{
    BUCKET_COUNT, HEADER_SIZE, RECORD_PREFIX_SIZE, SLOT_SIZE, bucket_of, start_slot,
};
use crate::error::{FolioError, Result};
use crate::storage::structured::StructReader;
use crate::util::hash::hash;

/// Scan state of an in-progress [`BlockStore::find_start`] lookup.
#[derive(Debug, Clone)]
struct FindCursor {
    key: Vec<u8>,
    key_hash: u32,
    table_pos: u32,
    table_len: u32,
    slot_pos: u32,
    probes: u32,
}

/// Per-store statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockStoreStats {
    /// Number of records in the data section.
    pub records: usize,
    /// Byte length of the store.
    pub bytes: u64,
    /// Number of buckets with a non-empty table.
    pub used_buckets: usize,
    /// Largest table, in slots.
    pub max_table_len: u32,
}

/// A read-only view of one block store.
///
/// The store may start anywhere inside the underlying stream: [`open_at`]
/// takes the base offset and length, and every position read from the file is
/// interpreted relative to that base. This is how one index file carries two
/// stores back to back.
///
/// Lookups move the stream cursor, so they take `&mut self`; open a second
/// view with [`StorageInput::clone_input`](crate::storage::StorageInput::clone_input)
/// to search concurrently.
///
/// [`open_at`]: BlockStore::open_at
#[derive(Debug)]
pub struct BlockStore<R: Read + Seek> {
    reader: StructReader<R>,
    base: u64,
    len: u64,
    header: Vec<(u32, u32)>,
    cursor: Option<FindCursor>,
}

impl<R: Read + Seek> BlockStore<R> {
    /// Open a store occupying the whole of `reader`.
    pub fn open(mut reader: R) -> Result<Self> {
        let len = reader.seek(std::io::SeekFrom::End(0))?;
        Self::open_at(reader, 0, len)
    }

    /// Open a store of `len` bytes starting at byte `base` of `reader`.
    ///
    /// The header is read and checked immediately, so a truncated or
    /// inconsistent file fails here instead of at the first lookup.
    pub fn open_at(reader: R, base: u64, len: u64) -> Result<Self> {
        if len < HEADER_SIZE {
            return Err(FolioError::format(format!(
                "block store of {len} bytes is shorter than its {HEADER_SIZE}-byte header"
            )));
        }

        let mut reader = StructReader::new(reader)?;
        reader.seek(base)?;

        let mut header = Vec::with_capacity(BUCKET_COUNT);
        for bucket in 0..BUCKET_COUNT {
            let (table_pos, table_len) = reader.read_u32_pair()?;
            let table_end = table_pos as u64 + table_len as u64 * SLOT_SIZE;
            if (table_pos as u64) < HEADER_SIZE || table_end > len {
                return Err(FolioError::format(format!(
                    "bucket {bucket} table [{table_pos}, {table_end}) lies outside the store"
                )));
            }
            header.push((table_pos, table_len));
        }

        Ok(BlockStore {
            reader,
            base,
            len,
            header,
            cursor: None,
        })
    }

    /// Byte length of the store.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Returns true if the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.data_end() == HEADER_SIZE
    }

    /// End of the data section, which is where the first table begins.
    fn data_end(&self) -> u64 {
        self.header[0].0 as u64
    }

    /// Return the first value stored under `key`, or `None` if the key is absent.
    pub fn find(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.find_start(key);
        self.find_next()
    }

    /// Return every value stored under `key`, in insertion order.
    pub fn find_all(&mut self, key: &[u8]) -> Result<Vec<Vec<u8>>> {
        self.find_start(key);
        let mut values = Vec::new();
        while let Some(value) = self.find_next()? {
            values.push(value);
        }
        Ok(values)
    }

    /// Begin a lookup of `key`; subsequent [`find_next`](Self::find_next)
    /// calls yield its values one at a time.
    pub fn find_start(&mut self, key: &[u8]) {
        let key_hash = hash(key);
        let (table_pos, table_len) = self.header[bucket_of(key_hash)];
        let slot_pos = if table_len == 0 {
            table_pos
        } else {
            table_pos + start_slot(key_hash, table_len) * SLOT_SIZE as u32
        };

        self.cursor = Some(FindCursor {
            key: key.to_vec(),
            key_hash,
            table_pos,
            table_len,
            slot_pos,
            probes: 0,
        });
    }

    /// Return the next value of the lookup begun by [`find_start`](Self::find_start).
    ///
    /// `Ok(None)` means there are no (more) values; it is also returned when no
    /// lookup was started.
    pub fn find_next(&mut self) -> Result<Option<Vec<u8>>> {
        match self.next_record()? {
            Some((data_pos, data_len)) => {
                let absolute = self.base + data_pos;
                self.reader.seek(absolute)?;
                Ok(Some(self.reader.read_raw(data_len as usize)?))
            }
            None => Ok(None),
        }
    }

    /// Advance the cursor to the next record whose key matches, returning the
    /// position and length of its data.
    fn next_record(&mut self) -> Result<Option<(u64, u32)>> {
        let Some(mut cursor) = self.cursor.take() else {
            return Ok(None);
        };

        let table_end = cursor.table_pos + cursor.table_len * SLOT_SIZE as u32;
        let mut found = None;

        while cursor.probes < cursor.table_len {
            self.reader.seek(self.base + cursor.slot_pos as u64)?;
            let (slot_hash, record_pos) = self.reader.read_u32_pair()?;
            if record_pos == 0 {
                // Empty slot: the probe sequence ends here.
                cursor.probes = cursor.table_len;
                break;
            }

            cursor.probes += 1;
            cursor.slot_pos += SLOT_SIZE as u32;
            if cursor.slot_pos == table_end {
                cursor.slot_pos = cursor.table_pos;
            }

            if slot_hash == cursor.key_hash {
                let (key_len, data_len) = self.record_header(record_pos)?;
                if key_len as usize == cursor.key.len() && self.key_matches(record_pos, &cursor.key)? {
                    let data_pos = record_pos as u64 + RECORD_PREFIX_SIZE + key_len as u64;
                    found = Some((data_pos, data_len));
                    break;
                }
            }
        }

        self.cursor = Some(cursor);
        Ok(found)
    }

    /// Read and bounds-check the `(key_len, data_len)` prefix of a record.
    fn record_header(&mut self, record_pos: u32) -> Result<(u32, u32)> {
        let record_pos = record_pos as u64;
        if record_pos < HEADER_SIZE || record_pos + RECORD_PREFIX_SIZE > self.data_end() {
            return Err(FolioError::format(format!(
                "record position {record_pos} lies outside the data section"
            )));
        }

        self.reader.seek(self.base + record_pos)?;
        let (key_len, data_len) = self.reader.read_u32_pair()?;
        let record_end = record_pos + RECORD_PREFIX_SIZE + key_len as u64 + data_len as u64;
        if record_end > self.data_end() {
            return Err(FolioError::format(format!(
                "record at {record_pos} runs past the data section"
            )));
        }
        Ok((key_len, data_len))
    }

    fn key_matches(&mut self, record_pos: u32, key: &[u8]) -> Result<bool> {
        self.reader
            .seek(self.base + record_pos as u64 + RECORD_PREFIX_SIZE)?;
        let mut stored = [0u8; 64];
        let mut remaining = key;
        while !remaining.is_empty() {
            let n = remaining.len().min(stored.len());
            self.reader.read_exact(&mut stored[..n])?;
            if stored[..n] != remaining[..n] {
                return Ok(false);
            }
            remaining = &remaining[n..];
        }
        Ok(true)
    }

    /// Iterate over all records in insertion order.
    pub fn iter(&mut self) -> Records<'_, R> {
        Records {
            position: HEADER_SIZE,
            store: self,
        }
    }

    /// Gather record and table statistics.
    pub fn stats(&mut self) -> Result<BlockStoreStats> {
        let mut records = 0;
        for record in self.iter() {
            record?;
            records += 1;
        }

        Ok(BlockStoreStats {
            records,
            bytes: self.len,
            used_buckets: self.header.iter().filter(|(_, len)| *len > 0).count(),
            max_table_len: self.header.iter().map(|(_, len)| *len).max().unwrap_or(0),
        })
    }
}

/// Iterator over the `(key, value)` records of a store, in insertion order.
#[derive(Debug)]
pub struct Records<'a, R: Read + Seek> {
    store: &'a mut BlockStore<R>,
    position: u64,
}

impl<R: Read + Seek> Records<'_, R> {
    fn read_next(&mut self) -> Result<(Vec<u8>, Vec<u8>)> {
        let record_pos = u32::try_from(self.position)
            .map_err(|_| FolioError::format("record position beyond 32-bit range"))?;
        let (key_len, data_len) = self.store.record_header(record_pos)?;

        let key = self.store.reader.read_raw(key_len as usize)?;
        let value = self.store.reader.read_raw(data_len as usize)?;
        self.position += RECORD_PREFIX_SIZE + key_len as u64 + data_len as u64;
        Ok((key, value))
    }
}

impl<R: Read + Seek> Iterator for Records<'_, R> {
    type Item = Result<(Vec<u8>, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.store.data_end() {
            return None;
        }

        match self.read_next() {
            Ok(record) => Some(Ok(record)),
            Err(e) => {
                // Stop after the first framing error.
                self.position = u64::MAX;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_store::make;
    use std::io::Cursor;

    fn build(records: &[(&str, &str)]) -> BlockStore<Cursor<Vec<u8>>> {
        let (out, _) = make(Cursor::new(Vec::new()), records.iter().copied()).unwrap();
        BlockStore::open(Cursor::new(out.into_inner())).unwrap()
    }

    #[test]
    fn test_find_round_trip() {
        let records: Vec<(String, String)> = (0..500)
            .map(|i| (format!("key-{i}"), format!("value-{}", i * 7)))
            .collect();
        let (out, summary) = make(Cursor::new(Vec::new()), records.iter().cloned()).unwrap();
        assert_eq!(summary.records, 500);

        let mut store = BlockStore::open(Cursor::new(out.into_inner())).unwrap();
        for (key, value) in &records {
            assert_eq!(store.find(key.as_bytes()).unwrap(), Some(value.clone().into_bytes()));
        }
        assert_eq!(store.find(b"key-500").unwrap(), None);
        assert_eq!(store.find(b"").unwrap(), None);
    }

    #[test]
    fn test_empty_store_finds_nothing() {
        let mut store = build(&[]);
        assert!(store.is_empty());
        assert_eq!(store.find(b"anything").unwrap(), None);
        assert_eq!(store.iter().count(), 0);
    }

    #[test]
    fn test_duplicate_keys_in_insertion_order() {
        let mut store = build(&[("k", "first"), ("other", "x"), ("k", "second"), ("k", "third")]);

        assert_eq!(store.find(b"k").unwrap(), Some(b"first".to_vec()));
        assert_eq!(
            store.find_all(b"k").unwrap(),
            vec![b"first".to_vec(), b"second".to_vec(), b"third".to_vec()]
        );

        store.find_start(b"k");
        assert_eq!(store.find_next().unwrap(), Some(b"first".to_vec()));
        assert_eq!(store.find_next().unwrap(), Some(b"second".to_vec()));
        assert_eq!(store.find_next().unwrap(), Some(b"third".to_vec()));
        assert_eq!(store.find_next().unwrap(), None);
        assert_eq!(store.find_next().unwrap(), None);
    }

    #[test]
    fn test_empty_key_and_value() {
        let mut store = build(&[("", "empty key"), ("empty value", "")]);
        assert_eq!(store.find(b"").unwrap(), Some(b"empty key".to_vec()));
        assert_eq!(store.find(b"empty value").unwrap(), Some(Vec::new()));
    }

    #[test]
    fn test_iter_and_stats() {
        let mut store = build(&[("a", "1"), ("b", "22"), ("a", "333")]);

        let records: Vec<_> = store.iter().map(|r| r.unwrap()).collect();
        assert_eq!(
            records,
            vec![
                (b"a".to_vec(), b"1".to_vec()),
                (b"b".to_vec(), b"22".to_vec()),
                (b"a".to_vec(), b"333".to_vec()),
            ]
        );

        let stats = store.stats().unwrap();
        assert_eq!(stats.records, 3);
        assert!(stats.used_buckets >= 1 && stats.used_buckets <= 2);
        assert!(stats.max_table_len >= 2);
    }

    #[test]
    fn test_open_at_offset() {
        let (out, summary) = make(Cursor::new(Vec::new()), [("inner", "value")]).unwrap();
        let mut file = vec![0xAAu8; 100];
        file.extend_from_slice(&out.into_inner());
        file.extend_from_slice(b"trailing bytes");

        let mut store = BlockStore::open_at(Cursor::new(file), 100, summary.bytes).unwrap();
        assert_eq!(store.find(b"inner").unwrap(), Some(b"value".to_vec()));
        assert_eq!(store.len(), summary.bytes);
    }

    #[test]
    fn test_truncated_store_is_rejected() {
        let err = BlockStore::open(Cursor::new(vec![0u8; 100])).unwrap_err();
        assert!(matches!(err, FolioError::Format(_)));

        let (out, _) = make(Cursor::new(Vec::new()), [("key", "value")]).unwrap();
        let mut bytes = out.into_inner();
        bytes.truncate(bytes.len() - 4);
        let err = BlockStore::open(Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, FolioError::Format(_)));
    }

    #[test]
    fn test_bad_record_length_is_format_error() {
        let (out, _) = make(Cursor::new(Vec::new()), [("key", "value")]).unwrap();
        let mut bytes = out.into_inner();
        // Inflate data_len of the only record.
        bytes[2052..2056].copy_from_slice(&1000u32.to_le_bytes());

        let mut store = BlockStore::open(Cursor::new(bytes)).unwrap();
        assert!(matches!(store.find(b"key"), Err(FolioError::Format(_))));
    }
}
