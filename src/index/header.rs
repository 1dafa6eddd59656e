//! The fixed-size header at the start of every index file.
//!
//! Layout (little-endian), zero-padded to [`INDEX_HEADER_SIZE`] bytes:
//!
//! | offset | size | field                        |
//! |--------|------|------------------------------|
//! | 0      | 8    | magic `FOLIOIDX`             |
//! | 8      | 4    | format version               |
//! | 12     | 4    | analyzer fingerprint         |
//! | 16     | 8    | document store length        |
//! | 24     | 8    | word store length            |
//! | 32     | 8    | document count               |
//! | 40     | 8    | distinct word count          |
//! | 48     | 4    | CRC-32 of bytes 0..48        |

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{FolioError, Result};

/// Bytes reserved for the header; the document store starts here.
pub const INDEX_HEADER_SIZE: u64 = 4096;

const MAGIC: &[u8; 8] = b"FOLIOIDX";
const VERSION: u32 = 1;
const CHECKSUMMED_LEN: usize = 48;

/// Decoded index header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexHeader {
    /// Fingerprint of the analyzer configuration used to build the index.
    pub analyzer_fingerprint: u32,
    /// Byte length of the document store.
    pub document_store_len: u64,
    /// Byte length of the word store.
    pub word_store_len: u64,
    /// Number of documents.
    pub document_count: u64,
    /// Number of distinct words.
    pub word_count: u64,
}

impl IndexHeader {
    /// Offset of the document store within the file.
    pub fn document_store_offset(&self) -> u64 {
        INDEX_HEADER_SIZE
    }

    /// Offset of the word store within the file.
    pub fn word_store_offset(&self) -> u64 {
        INDEX_HEADER_SIZE + self.document_store_len
    }

    /// Total file length implied by the header.
    pub fn file_len(&self) -> u64 {
        INDEX_HEADER_SIZE + self.document_store_len + self.word_store_len
    }

    /// Encode into a full header block.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; INDEX_HEADER_SIZE as usize];
        buf[0..8].copy_from_slice(MAGIC);
        LittleEndian::write_u32(&mut buf[8..12], VERSION);
        LittleEndian::write_u32(&mut buf[12..16], self.analyzer_fingerprint);
        LittleEndian::write_u64(&mut buf[16..24], self.document_store_len);
        LittleEndian::write_u64(&mut buf[24..32], self.word_store_len);
        LittleEndian::write_u64(&mut buf[32..40], self.document_count);
        LittleEndian::write_u64(&mut buf[40..48], self.word_count);
        let crc = crc32fast::hash(&buf[..CHECKSUMMED_LEN]);
        LittleEndian::write_u32(&mut buf[48..52], crc);
        buf
    }

    /// Decode and verify a header block.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < INDEX_HEADER_SIZE as usize {
            return Err(FolioError::format(format!(
                "index header needs {INDEX_HEADER_SIZE} bytes, found {}",
                buf.len()
            )));
        }
        if &buf[0..8] != MAGIC {
            return Err(FolioError::format("not an index file (bad magic)"));
        }

        let version = LittleEndian::read_u32(&buf[8..12]);
        if version != VERSION {
            return Err(FolioError::format(format!(
                "unsupported index format version {version}"
            )));
        }

        let stored_crc = LittleEndian::read_u32(&buf[48..52]);
        if stored_crc != crc32fast::hash(&buf[..CHECKSUMMED_LEN]) {
            return Err(FolioError::format("index header checksum mismatch"));
        }

        Ok(IndexHeader {
            analyzer_fingerprint: LittleEndian::read_u32(&buf[12..16]),
            document_store_len: LittleEndian::read_u64(&buf[16..24]),
            word_store_len: LittleEndian::read_u64(&buf[24..32]),
            document_count: LittleEndian::read_u64(&buf[32..40]),
            word_count: LittleEndian::read_u64(&buf[40..48]),
        })
    }
}
