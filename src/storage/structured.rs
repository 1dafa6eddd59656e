//! Structured binary I/O for fixed-width little-endian file formats.
//!
//! [`StructWriter`] and [`StructReader`] wrap a seekable stream and track the
//! absolute position themselves, so format code can record offsets without
//! asking the underlying stream.

use std::io::{Read, Seek, SeekFrom, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{FolioError, Result};

/// A positioned little-endian writer.
#[derive(Debug)]
pub struct StructWriter<W: Write + Seek> {
    writer: W,
    position: u64,
}

impl<W: Write + Seek> StructWriter<W> {
    /// Wrap a writer that is positioned at offset 0.
    pub fn new(writer: W) -> Self {
        StructWriter {
            writer,
            position: 0,
        }
    }

    /// Write a u32 value (little-endian).
    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.writer.write_u32::<LittleEndian>(value)?;
        self.position += 4;
        Ok(())
    }

    /// Write a u64 value (little-endian).
    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.writer.write_u64::<LittleEndian>(value)?;
        self.position += 8;
        Ok(())
    }

    /// Write two u32 values back to back.
    pub fn write_u32_pair(&mut self, first: u32, second: u32) -> Result<()> {
        self.write_u32(first)?;
        self.write_u32(second)
    }

    /// Write raw bytes without length prefix.
    pub fn write_raw(&mut self, value: &[u8]) -> Result<()> {
        self.writer.write_all(value)?;
        self.position += value.len() as u64;
        Ok(())
    }

    /// Write `count` zero bytes.
    pub fn write_zeros(&mut self, count: usize) -> Result<()> {
        const ZEROS: [u8; 512] = [0; 512];
        let mut remaining = count;
        while remaining > 0 {
            let n = remaining.min(ZEROS.len());
            self.write_raw(&ZEROS[..n])?;
            remaining -= n;
        }
        Ok(())
    }

    /// Copy everything `reader` yields into the stream.
    pub fn copy_from<R: Read>(&mut self, reader: &mut R) -> Result<u64> {
        let copied = std::io::copy(reader, &mut self.writer)?;
        self.position += copied;
        Ok(copied)
    }

    /// Move to an absolute position.
    pub fn seek(&mut self, position: u64) -> Result<()> {
        self.writer.seek(SeekFrom::Start(position))?;
        self.position = position;
        Ok(())
    }

    /// Get current file position.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Current position as a u32 file offset, failing once the file outgrows 4GiB.
    pub fn position_u32(&self) -> Result<u32> {
        u32::try_from(self.position).map_err(|_| {
            FolioError::format(format!(
                "offset {} exceeds the 32-bit address space",
                self.position
            ))
        })
    }

    /// Mutable access to the wrapped writer.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Return the wrapped writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// A positioned little-endian reader.
#[derive(Debug)]
pub struct StructReader<R: Read + Seek> {
    reader: R,
    position: u64,
}

impl<R: Read + Seek> StructReader<R> {
    /// Wrap a reader, rewinding it to offset 0.
    pub fn new(mut reader: R) -> Result<Self> {
        reader.seek(SeekFrom::Start(0))?;
        Ok(StructReader {
            reader,
            position: 0,
        })
    }

    /// Read a u32 value (little-endian).
    pub fn read_u32(&mut self) -> Result<u32> {
        let value = self.reader.read_u32::<LittleEndian>()?;
        self.position += 4;
        Ok(value)
    }

    /// Read a u64 value (little-endian).
    pub fn read_u64(&mut self) -> Result<u64> {
        let value = self.reader.read_u64::<LittleEndian>()?;
        self.position += 8;
        Ok(value)
    }

    /// Read two consecutive u32 values.
    pub fn read_u32_pair(&mut self) -> Result<(u32, u32)> {
        Ok((self.read_u32()?, self.read_u32()?))
    }

    /// Fill `buf` completely. A short read is an I/O error.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.reader.read_exact(buf)?;
        self.position += buf.len() as u64;
        Ok(())
    }

    /// Read exact number of raw bytes.
    pub fn read_raw(&mut self, length: usize) -> Result<Vec<u8>> {
        let mut bytes = vec![0u8; length];
        self.read_exact(&mut bytes)?;
        Ok(bytes)
    }

    /// Move to an absolute position.
    pub fn seek(&mut self, position: u64) -> Result<()> {
        if position != self.position {
            self.reader.seek(SeekFrom::Start(position))?;
            self.position = position;
        }
        Ok(())
    }

    /// Get current file position.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Mutable access to the wrapped reader. Reading through it invalidates
    /// the tracked position until the next [`seek`](Self::seek).
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.reader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_struct_writer_reader() {
        let mut writer = StructWriter::new(Cursor::new(Vec::new()));
        writer.write_u32(5678).unwrap();
        writer.write_u32_pair(1, u32::MAX).unwrap();
        writer.write_u64(9876543210).unwrap();
        writer.write_raw(b"binary data").unwrap();
        assert_eq!(writer.position(), 4 + 8 + 8 + 11);

        let bytes = writer.into_inner().into_inner();
        let mut reader = StructReader::new(Cursor::new(bytes)).unwrap();

        assert_eq!(reader.read_u32().unwrap(), 5678);
        assert_eq!(reader.read_u32_pair().unwrap(), (1, u32::MAX));
        assert_eq!(reader.read_u64().unwrap(), 9876543210);
        assert_eq!(reader.read_raw(11).unwrap(), b"binary data");
        assert_eq!(reader.position(), 31);
    }

    #[test]
    fn test_little_endian_layout() {
        let mut writer = StructWriter::new(Cursor::new(Vec::new()));
        writer.write_u32(0x0403_0201).unwrap();
        assert_eq!(writer.into_inner().into_inner(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_seek_back_and_patch() {
        let mut writer = StructWriter::new(Cursor::new(Vec::new()));
        writer.write_zeros(1000).unwrap();
        writer.write_raw(b"end").unwrap();
        writer.seek(0).unwrap();
        writer.write_u32(7).unwrap();
        assert_eq!(writer.position(), 4);

        let bytes = writer.into_inner().into_inner();
        assert_eq!(bytes.len(), 1003);
        assert_eq!(&bytes[..4], &[7, 0, 0, 0]);
        assert_eq!(&bytes[1000..], b"end");
    }

    #[test]
    fn test_short_read_is_io_error() {
        let mut reader = StructReader::new(Cursor::new(vec![1u8, 2])).unwrap();
        assert!(matches!(reader.read_u32(), Err(FolioError::Io(_))));
    }

    #[test]
    fn test_position_u32_overflow() {
        let mut writer = StructWriter::new(Cursor::new(Vec::new()));
        writer.position = u32::MAX as u64 + 1;
        assert!(matches!(writer.position_u32(), Err(FolioError::Format(_))));
    }
}
