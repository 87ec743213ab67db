use std::io::{Error, ErrorKind, Read, Write};

use byteorder::{BigEndian, WriteBytesExt};

use crate::buf::copy_exact;
use crate::tlv::{Tag, DATA, DIR, DREF, FILE, HEADER_SIZE, MAX_INLINE_SIZE, NAME};

pub struct TlvBuilder<W: Write> {
    inner: W,
    pos: u64,
}

/// Offsets of a FILE record that owns its content, recorded by the dedup
/// index so later duplicates can reference it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileEntry {
    pub entry_offset: u64,
    pub data_offset: u64,
}

// This is the high level writer interface
impl<W: Write> TlvBuilder<W> {
    pub fn new(writer: W) -> Self {
        TlvBuilder {
            inner: writer,
            pos: 0,
        }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    /// Bytes written so far, the entry offset of the next record.
    pub fn position(&self) -> u64 {
        self.pos
    }

    fn write_header(&mut self, tag: Tag, length: u32) -> Result<(), Error> {
        self.inner.write_all(&tag)?;
        self.inner.write_u32::<BigEndian>(length)?;
        self.pos += HEADER_SIZE as u64;
        Ok(())
    }

    fn write(&mut self, tag: Tag, data: &[u8]) -> Result<usize, Error> {
        self.write_header(tag, inline_len(data)?)?;
        self.inner.write_all(data)?;
        self.pos += data.len() as u64;

        Ok(HEADER_SIZE as usize + data.len())
    }

    pub fn write_dir(&mut self, path: &str) -> Result<usize, Error> {
        self.write(DIR, path.as_bytes())
    }

    /// FILE record owning its content. The content length must be exact,
    /// a short reader corrupts the stream and is surfaced as an error.
    pub fn write_file_data<R: Read>(
        &mut self,
        name: &str,
        content: &mut R,
        size: u32,
    ) -> Result<FileEntry, Error> {
        let entry_offset = self.pos;
        let name_len = inline_len(name.as_bytes())?;

        let outer = (HEADER_SIZE + name_len) as u64 + (HEADER_SIZE as u64 + size as u64);
        let outer = u32::try_from(outer)
            .map_err(|_| Error::new(ErrorKind::InvalidInput, "file record exceeds u32 length"))?;

        self.write_header(FILE, outer)?;
        self.write(NAME, name.as_bytes())?;
        self.write_header(DATA, size)?;

        let data_offset = self.pos;
        copy_exact(content, &mut self.inner, size as u64)?;
        self.pos += size as u64;

        Ok(FileEntry {
            entry_offset,
            data_offset,
        })
    }

    /// FILE record whose content lives in the record at `target`.
    pub fn write_file_ref(&mut self, name: &str, target: u32) -> Result<usize, Error> {
        let name_len = inline_len(name.as_bytes())?;
        let outer = HEADER_SIZE + name_len + HEADER_SIZE + 4;

        self.write_header(FILE, outer)?;
        let mut len = HEADER_SIZE as usize;
        len += self.write(NAME, name.as_bytes())?;
        len += self.write(DREF, &target.to_be_bytes())?;

        Ok(len)
    }
}

fn inline_len(data: &[u8]) -> Result<u32, Error> {
    if data.len() > MAX_INLINE_SIZE {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            "inline payload exceeds permitted max size",
        ));
    }
    Ok(data.len() as u32)
}
