use std::io::{self, Read};

use byteorder::{BigEndian, ByteOrder};
use log::{debug, warn};

use crate::buf::fill_buf;
use crate::tlv::{Tag, TlvError, DATA, DIR, DREF, FILE, HEADER_SIZE, MAX_INLINE_SIZE, NAME};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub tag: Tag,
    pub length: u32,
}

#[cfg_attr(test, derive(Debug, PartialEq, Eq))]
pub enum TlvEntry {
    Dir {
        path: String,
    },
    File {
        entry_offset: u64,
        name: String,
        content: FileContent,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileContent {
    /// This record owns its content, the bytes sit at data_offset.
    Data { data_offset: u64, size: u32 },
    /// Content lives in the FILE record whose header begins at target.
    Ref { target: u64 },
}

/// Decodes top level records in a single forward pass. DATA payloads are
/// never materialized, only their position and size are captured while the
/// bytes are skipped. FILE records missing a usable name or content are
/// reported and dropped, the pass continues with the next record.
pub struct TlvReader<R: Read> {
    inner: R,
    pos: u64,
    done: bool,
}

impl<R: Read> TlvReader<R> {
    pub fn new(reader: R) -> Self {
        TlvReader {
            inner: reader,
            pos: 0,
            done: false,
        }
    }

    pub fn position(&self) -> u64 {
        self.pos
    }

    // Ok(None) only on a clean end of stream, a partial header is Truncated
    fn next_header(&mut self) -> Result<Option<Header>, TlvError> {
        let mut buf = [0u8; HEADER_SIZE as usize];

        match fill_buf(&mut self.inner, &mut buf)? {
            (_, 0) => Ok(None),
            (true, n) if n < buf.len() => Err(TlvError::Truncated),
            _ => {
                self.pos += HEADER_SIZE as u64;
                Ok(Some(Header {
                    tag: buf[..4].try_into().unwrap(),
                    length: BigEndian::read_u32(&buf[4..]),
                }))
            }
        }
    }

    fn skip(&mut self, len: u64) -> Result<(), TlvError> {
        let skipped = io::copy(&mut self.inner.by_ref().take(len), &mut io::sink())?;
        self.pos += skipped;

        if skipped < len {
            return Err(TlvError::Truncated);
        }
        Ok(())
    }

    fn read_inline(&mut self, len: u32) -> Result<Vec<u8>, TlvError> {
        if len as usize > MAX_INLINE_SIZE {
            return Err(TlvError::MaxLength);
        }

        let mut data = vec![0; len as usize];
        match fill_buf(&mut self.inner, &mut data)? {
            (_, n) if n < data.len() => Err(TlvError::Truncated),
            (_, n) => {
                self.pos += n as u64;
                Ok(data)
            }
        }
    }

    fn read_inline_string(&mut self, len: u32) -> Result<String, TlvError> {
        Ok(String::from_utf8_lossy(&self.read_inline(len)?).into_owned())
    }

    // Decode the sub-records of a FILE value, bounded by the outer length.
    // Unrecognized or extra sub-records are skipped. Returns None when the
    // record has no usable name + content pair.
    fn read_file(&mut self, outer_len: u32) -> Result<Option<(String, FileContent)>, TlvError> {
        let end = self.pos + outer_len as u64;
        let mut name = None;
        let mut content = None;

        while self.pos < end {
            let remain = end - self.pos;
            if remain < HEADER_SIZE as u64 {
                // Trailing slack too small to hold a sub-record header
                self.skip(remain)?;
                break;
            }

            let header = match self.next_header()? {
                None => return Err(TlvError::Truncated),
                Some(x) => x,
            };

            if header.length as u64 > end - self.pos {
                warn!(
                    "sub-record {:?} overruns its FILE record, dropping the record",
                    tag_str(&header.tag)
                );
                self.skip(end - self.pos)?;
                return Ok(None);
            }

            match header.tag {
                NAME if name.is_none() => {
                    name = Some(self.read_inline_string(header.length)?);
                }
                DATA if content.is_none() => {
                    content = Some(FileContent::Data {
                        data_offset: self.pos,
                        size: header.length,
                    });
                    self.skip(header.length as u64)?;
                }
                DREF if content.is_none() && header.length == 4 => {
                    let target = BigEndian::read_u32(&self.read_inline(header.length)?);
                    content = Some(FileContent::Ref {
                        target: target as u64,
                    });
                }
                tag => {
                    debug!("skipping sub-record {:?}", tag_str(&tag));
                    self.skip(header.length as u64)?;
                }
            }
        }

        match (name, content) {
            (Some(name), Some(content)) => Ok(Some((name, content))),
            _ => {
                warn!("FILE record without a name and content, dropping it");
                Ok(None)
            }
        }
    }

    fn next_entry(&mut self) -> Result<Option<TlvEntry>, TlvError> {
        loop {
            let entry_offset = self.pos;

            let header = match self.next_header()? {
                None => return Ok(None),
                Some(x) => x,
            };

            match header.tag {
                DIR => {
                    return Ok(Some(TlvEntry::Dir {
                        path: self.read_inline_string(header.length)?,
                    }));
                }
                FILE => match self.read_file(header.length)? {
                    Some((name, content)) => {
                        return Ok(Some(TlvEntry::File {
                            entry_offset,
                            name,
                            content,
                        }));
                    }
                    // Malformed record already reported, keep decoding
                    None => continue,
                },
                tag => {
                    debug!("skipping unknown record {:?}", tag_str(&tag));
                    self.skip(header.length as u64)?;
                }
            }
        }
    }
}

impl<R: Read> Iterator for TlvReader<R> {
    type Item = Result<TlvEntry, TlvError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.next_entry() {
            Ok(None) => {
                self.done = true;
                None
            }
            Ok(Some(x)) => Some(Ok(x)),
            Err(x) => {
                self.done = true;
                Some(Err(x))
            }
        }
    }
}

fn tag_str(tag: &Tag) -> String {
    String::from_utf8_lossy(tag).into_owned()
}
