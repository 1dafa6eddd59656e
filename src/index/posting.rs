//! Posting lists: the word-store value recording which documents contain a
//! word and how often.
//!
//! Encoding: `count` followed by `count` entries of
//! `(id_len, id bytes, occurrences)`, all integers as varints. Entries are
//! sorted by id so a given table always encodes to the same bytes.

use crate::error::{FolioError, Result};
use crate::util::varint::{decode_u64, encode_u64};

/// One posting: a document id and the number of times the word occurs in it.
pub type Posting = (Vec<u8>, u64);

/// Encode postings. `postings` must be sorted by id with no duplicates.
pub fn encode<'a, I>(postings: I) -> Vec<u8>
where
    I: IntoIterator<Item = (&'a [u8], u64)>,
    I::IntoIter: ExactSizeIterator,
{
    let postings = postings.into_iter();
    let mut out = Vec::new();
    encode_u64(postings.len() as u64, &mut out);

    for (id, occurrences) in postings {
        encode_u64(id.len() as u64, &mut out);
        out.extend_from_slice(id);
        encode_u64(occurrences, &mut out);
    }
    out
}

/// Decode a posting list.
pub fn decode(bytes: &[u8]) -> Result<Vec<Posting>> {
    let mut rest = bytes;
    let count = take_varint(&mut rest)?;
    // Each entry needs at least three bytes.
    if count > (rest.len() / 3) as u64 + 1 {
        return Err(FolioError::format(format!(
            "posting list claims {count} entries in {} bytes",
            rest.len()
        )));
    }

    let mut postings = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let id_len = take_varint(&mut rest)? as usize;
        if id_len > rest.len() {
            return Err(FolioError::format("posting id runs past the end of the list"));
        }
        let (id, tail) = rest.split_at(id_len);
        rest = tail;
        let occurrences = take_varint(&mut rest)?;
        postings.push((id.to_vec(), occurrences));
    }

    if !rest.is_empty() {
        return Err(FolioError::format(format!(
            "{} trailing bytes after posting list",
            rest.len()
        )));
    }
    Ok(postings)
}

fn take_varint(rest: &mut &[u8]) -> Result<u64> {
    let (value, used) = decode_u64(rest)?;
    *rest = &rest[used..];
    Ok(value)
}
