use std::collections::HashMap;
use std::io::{BufReader, Read};
use std::path::Path;

use log::warn;

use crate::compress::open_container;
use crate::error::ArchiveError;
use crate::tlv::reader::{FileContent, TlvEntry, TlvReader};
use crate::tlv::TlvError;

pub struct FileRecord {
    pub name: String,
    pub entry_offset: u64,
    pub content: FileContent,
}

/// In-memory table of an archive, built in one forward pass. File records
/// live in an arena and wire offsets are translated to arena indices right
/// here, downstream lookups never deal in raw positions.
pub struct Catalog {
    pub dirs: Vec<String>,
    pub files: Vec<FileRecord>,
    by_offset: HashMap<u64, usize>,
    /// The stream ended mid-record, entries before the cut were kept.
    pub truncated: bool,
}

impl Catalog {
    pub fn read_all<R: Read>(reader: R) -> Result<Catalog, ArchiveError> {
        let mut dirs = Vec::new();
        let mut files: Vec<FileRecord> = Vec::new();
        let mut by_offset = HashMap::new();
        let mut truncated = false;

        let mut tlv = TlvReader::new(reader);
        while let Some(entry) = tlv.next() {
            match entry {
                Ok(TlvEntry::Dir { path }) => dirs.push(path),
                Ok(TlvEntry::File {
                    entry_offset,
                    name,
                    content,
                }) => {
                    by_offset.insert(entry_offset, files.len());
                    files.push(FileRecord {
                        name,
                        entry_offset,
                        content,
                    });
                }
                Err(TlvError::Truncated) => {
                    warn!(
                        "container truncated at byte {}, keeping entries up to the cut",
                        tlv.position()
                    );
                    truncated = true;
                    break;
                }
                Err(x) => return Err(x.into()),
            }
        }

        Ok(Catalog {
            dirs,
            files,
            by_offset,
            truncated,
        })
    }

    pub fn lookup(&self, entry_offset: u64) -> Option<&FileRecord> {
        self.by_offset.get(&entry_offset).map(|&idx| &self.files[idx])
    }

    /// Resolve a record to the concrete byte range holding its content.
    /// References resolve exactly one hop, a reference pointing at another
    /// reference is malformed input.
    pub fn resolve(&self, record: &FileRecord) -> Result<(u64, u32), ArchiveError> {
        match record.content {
            FileContent::Data { data_offset, size } => Ok((data_offset, size)),
            FileContent::Ref { target } => match self.lookup(target) {
                None => Err(ArchiveError::DanglingReference(target)),
                Some(origin) => match origin.content {
                    FileContent::Data { data_offset, size } => Ok((data_offset, size)),
                    FileContent::Ref { .. } => Err(ArchiveError::MalformedReference(target)),
                },
            },
        }
    }

    fn origin_name(&self, record: &FileRecord) -> Option<&str> {
        match record.content {
            FileContent::Ref { target } => self.lookup(target).map(|origin| origin.name.as_str()),
            FileContent::Data { .. } => None,
        }
    }
}

pub fn list(archive: &Path) -> Result<(), ArchiveError> {
    let container = open_container(archive)?;
    let catalog = Catalog::read_all(BufReader::new(container))?;

    if catalog.truncated {
        warn!("{}: archive is truncated, listing what survived", archive.display());
    }

    for dir in &catalog.dirs {
        println!("d {}", dir);
    }

    for record in &catalog.files {
        match catalog.resolve(record) {
            Ok((_, size)) => match catalog.origin_name(record) {
                None => println!("f {} {}", record.name, size),
                Some(origin) => println!("f {} {} -> {}", record.name, size, origin),
            },
            Err(e) => {
                warn!("{}: {}", record.name, e);
                println!("f {} ?", record.name);
            }
        }
    }

    Ok(())
}
