use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use log::debug;

use crate::buf::fill_buf;
use crate::error::ArchiveError;

// zstd frame magic as it appears on disk
pub const ZSTD_MAGIC: [u8; 4] = [0x28, 0xb5, 0x2f, 0xfd];

/// Compress the whole raw container in one pass. The transform wraps the
/// entire serialized stream, records are not individually compressed and
/// there is no random access into a compressed archive.
pub fn compress<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    level: i32,
) -> Result<(), ArchiveError> {
    zstd::stream::copy_encode(reader, writer, level).map_err(ArchiveError::Compression)
}

pub fn decompress<R: Read, W: Write>(reader: &mut R, writer: &mut W) -> Result<(), ArchiveError> {
    zstd::stream::copy_decode(reader, writer).map_err(ArchiveError::Decompression)
}

/// Open an archive for decoding. Compressed containers are detected by the
/// zstd magic and spooled through a scratch temp file, everything downstream
/// sees the raw container either way. The returned stream is rewound.
pub fn open_container(path: &Path) -> Result<File, ArchiveError> {
    let mut archive = File::open(path).map_err(|source| ArchiveError::OpenFailure {
        path: path.to_path_buf(),
        source,
    })?;

    let mut magic = [0u8; 4];
    let (_, got) = fill_buf(&mut archive, &mut magic)?;
    archive.seek(SeekFrom::Start(0))?;

    if got == magic.len() && magic == ZSTD_MAGIC {
        debug!("zstd container, decompressing to scratch");

        let mut scratch = tempfile::tempfile()?;
        decompress(&mut archive, &mut scratch)?;
        scratch.seek(SeekFrom::Start(0))?;

        Ok(scratch)
    } else {
        Ok(archive)
    }
}
