//! Text dump format for block stores.
//!
//! Each record is written as `+klen,dlen:key->data` followed by a newline,
//! and the dump ends with one empty line:
//!
//! ```text
//! +3,5:one->first
//! +3,6:two->second
//!
//! ```
//!
//! Keys and values are copied verbatim, so any bytes (including newlines)
//! survive. [`make_from_dump`] of a dump rebuilds a store that dumps to the
//! same bytes.

use std::io::{self, BufRead, BufReader, Read, Seek, Write};

use crate::block_store::reader::BlockStore;
use crate::block_store::writer::{BlockStoreWriter, BuildSummary};
use crate::error::{FolioError, Result};

/// Write every record of `store` to `out` in dump format. Returns the record count.
pub fn dump<R, W>(store: &mut BlockStore<R>, out: &mut W) -> Result<usize>
where
    R: Read + Seek,
    W: Write,
{
    let mut count = 0;
    for record in store.iter() {
        let (key, value) = record?;
        write!(out, "+{},{}:", key.len(), value.len())?;
        out.write_all(&key)?;
        out.write_all(b"->")?;
        out.write_all(&value)?;
        out.write_all(b"\n")?;
        count += 1;
    }
    out.write_all(b"\n")?;
    Ok(count)
}

/// Parse a dump from `input` and build a block store into `writer`.
pub fn make_from_dump<R, W>(input: R, writer: W) -> Result<(W, BuildSummary)>
where
    R: Read,
    W: Write + Seek,
{
    let mut input = BufReader::new(input);
    let mut store = BlockStoreWriter::new(writer)?;
    let mut line = 1usize;

    loop {
        match read_byte(&mut input)? {
            Some(b'\n') => break,
            Some(b'+') => {}
            Some(other) => {
                return Err(FolioError::format(format!(
                    "record {line}: expected '+' or end of dump, found {:?}",
                    other as char
                )));
            }
            None => {
                return Err(FolioError::format("dump ended without its closing empty line"));
            }
        }

        let key_len = read_number(&mut input, b',', line)?;
        let data_len = read_number(&mut input, b':', line)?;
        let key = read_field(&mut input, key_len, line)?;
        expect(&mut input, b"->", line)?;
        let data = read_field(&mut input, data_len, line)?;
        expect(&mut input, b"\n", line)?;

        store.add(&key, &data)?;
        line += 1;
    }

    store.finish()
}

fn read_byte<R: BufRead>(input: &mut R) -> Result<Option<u8>> {
    let mut byte = [0u8; 1];
    loop {
        match input.read(&mut byte) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(byte[0])),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

/// Read a decimal length terminated by `terminator`.
fn read_number<R: BufRead>(input: &mut R, terminator: u8, line: usize) -> Result<usize> {
    let mut value: usize = 0;
    let mut digits = 0;

    loop {
        match read_byte(input)? {
            Some(b) if b == terminator && digits > 0 => return Ok(value),
            Some(b @ b'0'..=b'9') => {
                value = value
                    .checked_mul(10)
                    .and_then(|v| v.checked_add((b - b'0') as usize))
                    .ok_or_else(|| FolioError::format(format!("record {line}: length overflow")))?;
                digits += 1;
            }
            Some(b) => {
                return Err(FolioError::format(format!(
                    "record {line}: unexpected {:?} in length",
                    b as char
                )));
            }
            None => return Err(FolioError::format(format!("record {line}: truncated length"))),
        }
    }
}

fn read_field<R: BufRead>(input: &mut R, len: usize, line: usize) -> Result<Vec<u8>> {
    let mut field = Vec::with_capacity(len.min(1 << 20));
    let read = input.by_ref().take(len as u64).read_to_end(&mut field)?;
    if read != len {
        return Err(FolioError::format(format!(
            "record {line}: expected {len} bytes, found {read}"
        )));
    }
    Ok(field)
}

fn expect<R: BufRead>(input: &mut R, token: &[u8], line: usize) -> Result<()> {
    for &expected in token {
        match read_byte(input)? {
            Some(b) if b == expected => {}
            _ => {
                return Err(FolioError::format(format!(
                    "record {line}: expected {:?}",
                    String::from_utf8_lossy(token)
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_store::make;
    use std::io::Cursor;

    fn dump_bytes(store_bytes: Vec<u8>) -> Vec<u8> {
        let mut store = BlockStore::open(Cursor::new(store_bytes)).unwrap();
        let mut out = Vec::new();
        dump(&mut store, &mut out).unwrap();
        out
    }

    #[test]
    fn test_dump_format() {
        let (out, _) = make(Cursor::new(Vec::new()), [("one", "first"), ("two", "second")]).unwrap();
        assert_eq!(dump_bytes(out.into_inner()), b"+3,5:one->first\n+3,6:two->second\n\n");
    }

    #[test]
    fn test_dump_make_round_trip() {
        let records = [
            ("alpha", "1"),
            ("beta", "line one\nline two"),
            ("", "empty key"),
            ("alpha", "duplicate"),
            ("->", "+1,1:x->y"),
        ];
        let (out, _) = make(Cursor::new(Vec::new()), records).unwrap();
        let original = out.into_inner();
        let text = dump_bytes(original.clone());

        let (rebuilt, summary) = make_from_dump(Cursor::new(text.clone()), Cursor::new(Vec::new())).unwrap();
        let rebuilt = rebuilt.into_inner();

        assert_eq!(summary.records, records.len());
        assert_eq!(rebuilt, original);
        assert_eq!(dump_bytes(rebuilt), text);
    }

    #[test]
    fn test_empty_dump() {
        let (out, summary) = make_from_dump(Cursor::new(b"\n".to_vec()), Cursor::new(Vec::new())).unwrap();
        assert_eq!(summary.records, 0);
        assert_eq!(dump_bytes(out.into_inner()), b"\n");
    }

    #[test]
    fn test_malformed_dumps() {
        let cases: [&[u8]; 6] = [
            b"",
            b"+3,5:one->first\n",
            b"+3,5:one=>first\n\n",
            b"+x,5:one->first\n\n",
            b"+3,9:one->first\n\n",
            b"-3,5:one->first\n\n",
        ];

        for case in cases {
            let result = make_from_dump(Cursor::new(case.to_vec()), Cursor::new(Vec::new()));
            assert!(
                matches!(result, Err(FolioError::Format(_))),
                "expected format error for {:?}",
                String::from_utf8_lossy(case)
            );
        }
    }
}
