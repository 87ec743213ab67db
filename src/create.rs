use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Component, Path};

use ignore::WalkBuilder;
use log::{debug, warn};

use crate::cli::Config;
use crate::compress;
use crate::error::ArchiveError;
use crate::hash::{Digest, XxDigest};
use crate::index::{Candidate, FingerprintIndex};
use crate::tlv::builder::TlvBuilder;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct CreateStats {
    pub dirs: usize,
    /// File records written, originals and references combined.
    pub files: usize,
    /// How many of those records are references to earlier content.
    pub deduped: usize,
    pub skipped: usize,
}

pub fn create(archive: &Path, input: &Path, config: &Config) -> Result<CreateStats, ArchiveError> {
    create_with_digest(&XxDigest, archive, input, config)
}

/// Create with an explicit fingerprint primitive. The digest only buckets
/// dedup candidates, every hit is byte-verified, so any 64 bit digest works.
pub fn create_with_digest<D: Digest>(
    digest: &D,
    archive: &Path,
    input: &Path,
    config: &Config,
) -> Result<CreateStats, ArchiveError> {
    if !input.exists() {
        return Err(ArchiveError::InputNotFound(input.to_path_buf()));
    }

    let out = File::create(archive).map_err(|source| ArchiveError::OpenFailure {
        path: archive.to_path_buf(),
        source,
    })?;

    if config.compress.enable {
        // Raw container goes to a scratch file first so the final artifact
        // is exactly compress(raw container)
        let mut scratch = tempfile::tempfile()?;
        let stats = build_container(digest, input, config, BufWriter::new(&mut scratch))?;

        scratch.seek(SeekFrom::Start(0))?;
        let mut out = BufWriter::new(out);
        compress::compress(&mut scratch, &mut out, config.compress.level)?;
        out.flush()?;

        Ok(stats)
    } else {
        build_container(digest, input, config, BufWriter::new(out))
    }
}

fn build_container<D: Digest, W: Write>(
    digest: &D,
    input: &Path,
    config: &Config,
    writer: W,
) -> Result<CreateStats, ArchiveError> {
    let mut builder = TlvBuilder::new(writer);
    let mut index = FingerprintIndex::new();
    let mut stats = CreateStats::default();

    let walker = WalkBuilder::new(input)
        .follow_links(config.symlink)
        .standard_filters(false)
        .same_file_system(config.same_fs)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    for entry in walker {
        let entry = match entry {
            Ok(x) => x,
            Err(e) => {
                warn!("walk error, skipping entry: {}", e);
                stats.skipped += 1;
                continue;
            }
        };

        let name = match relative_name(input, entry.path(), entry.depth()) {
            Some(x) => x,
            // The input root itself is implicit
            None => continue,
        };

        match entry.file_type() {
            Some(ft) if ft.is_dir() => {
                builder.write_dir(&name)?;
                stats.dirs += 1;
            }
            Some(ft) if ft.is_file() => {
                match append_file(digest, &mut builder, &mut index, entry.path(), &name)? {
                    Appended::Original => stats.files += 1,
                    Appended::Duplicate => {
                        stats.files += 1;
                        stats.deduped += 1;
                    }
                    Appended::Skipped => stats.skipped += 1,
                }
            }
            _ => debug!("skipping non-regular entry {}", entry.path().display()),
        }
    }

    debug!(
        "raw container is {} bytes, {} unique contents indexed",
        builder.position(),
        index.len()
    );

    builder.into_inner().flush()?;
    Ok(stats)
}

enum Appended {
    Original,
    Duplicate,
    Skipped,
}

// Per-file failures are contained here: anything that goes wrong before the
// first record byte is written skips just this file and the walk continues.
// A write failure after that corrupts the stream and aborts the create.
fn append_file<D: Digest, W: Write>(
    digest: &D,
    builder: &mut TlvBuilder<W>,
    index: &mut FingerprintIndex,
    path: &Path,
    name: &str,
) -> Result<Appended, ArchiveError> {
    let (mut file, size, fingerprint) = match prepare_file(digest, path) {
        Ok(x) => x,
        Err(e) => {
            warn!("unable to read {}, skipping: {}", path.display(), e);
            return Ok(Appended::Skipped);
        }
    };

    let target = match index.lookup(fingerprint, path) {
        Ok(candidate) => candidate.map(|c| c.entry_offset),
        Err(e) => {
            warn!(
                "dedup verification failed for {}, storing as original: {}",
                path.display(),
                e
            );
            None
        }
    };

    if let Some(target) = target {
        debug!("DREF {} -> {:#010x}", name, target);
        builder.write_file_ref(name, target as u32)?;
        return Ok(Appended::Duplicate);
    }

    file.seek(SeekFrom::Start(0))?;
    debug!("DATA {} ({} bytes)", name, size);
    let entry = builder.write_file_data(name, &mut file, size)?;

    if u32::try_from(entry.entry_offset).is_ok() {
        index.insert(
            fingerprint,
            Candidate {
                entry_offset: entry.entry_offset,
                source: path.to_path_buf(),
            },
        );
    } else {
        // Beyond the 4 byte wire offset, can't be a DREF target
        debug!("{} sits past the u32 offset range, not a dedup target", name);
    }

    Ok(Appended::Original)
}

fn prepare_file<D: Digest>(
    digest: &D,
    path: &Path,
) -> Result<(File, u32, u64), std::io::Error> {
    let mut file = File::open(path)?;
    let meta = file.metadata()?;

    let size = u32::try_from(meta.len()).map_err(|_| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "file exceeds the 4 GiB wire limit",
        )
    })?;

    let fingerprint = digest.fingerprint(&mut file)?;
    Ok((file, size, fingerprint))
}

// Archive names are relative to the input root and always '/' separated
fn relative_name(root: &Path, path: &Path, depth: usize) -> Option<String> {
    if depth == 0 {
        // A root that is itself a regular file archives under its file name
        if path.is_file() {
            return path.file_name().map(|n| n.to_string_lossy().into_owned());
        }
        return None;
    }

    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(x) => Some(x.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}
