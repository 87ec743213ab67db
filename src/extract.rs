use std::fs::{self, File};
use std::io::{BufReader, Seek, SeekFrom};
use std::path::{Component, Path, PathBuf};

use log::warn;

use crate::buf::copy_exact;
use crate::catalog::{Catalog, FileRecord};
use crate::compress::open_container;
use crate::error::ArchiveError;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ExtractStats {
    pub dirs: usize,
    pub files: usize,
    pub skipped: usize,
}

/// Restore an archive under the output root. Per-entry failures (dangling or
/// malformed references, unwritable outputs, short reads) are reported and
/// skipped, the remaining entries still extract.
pub fn extract(archive: &Path, output: &Path) -> Result<ExtractStats, ArchiveError> {
    let mut container = open_container(archive)?;
    let catalog = Catalog::read_all(BufReader::new(&mut container))?;

    if catalog.truncated {
        warn!(
            "{}: archive is truncated, extracting what survived",
            archive.display()
        );
    }

    let mut stats = ExtractStats::default();
    fs::create_dir_all(output)?;

    // Directory records first so empty directories round-trip
    for dir in &catalog.dirs {
        let path = match sanitized_path(output, dir) {
            Some(x) => x,
            None => {
                warn!("directory {:?} escapes the output root, skipping", dir);
                stats.skipped += 1;
                continue;
            }
        };

        match fs::create_dir_all(&path) {
            Ok(()) => stats.dirs += 1,
            Err(e) => {
                warn!("unable to create {}: {}", path.display(), e);
                stats.skipped += 1;
            }
        }
    }

    for record in &catalog.files {
        match restore_file(&catalog, &mut container, output, record) {
            Ok(()) => stats.files += 1,
            Err(e) => {
                warn!("unable to extract {:?}: {}", record.name, e);
                stats.skipped += 1;
            }
        }
    }

    Ok(stats)
}

fn restore_file(
    catalog: &Catalog,
    container: &mut File,
    output: &Path,
    record: &FileRecord,
) -> Result<(), ArchiveError> {
    let (data_offset, size) = catalog.resolve(record)?;

    let path = sanitized_path(output, &record.name).ok_or_else(|| {
        ArchiveError::IO(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "name escapes the output root",
        ))
    })?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut out = File::create(&path)?;
    container.seek(SeekFrom::Start(data_offset))?;
    copy_exact(container, &mut out, size as u64)?;

    Ok(())
}

// Only plain relative components may touch the output tree. Absolute names
// and parent-directory hops in a hostile archive must not escape the root.
fn sanitized_path(root: &Path, name: &str) -> Option<PathBuf> {
    let mut out = root.to_path_buf();
    let mut pushed = false;

    for component in Path::new(name).components() {
        match component {
            Component::Normal(x) => {
                out.push(x);
                pushed = true;
            }
            Component::CurDir => continue,
            _ => return None,
        }
    }

    if pushed {
        Some(out)
    } else {
        None
    }
}

#[cfg(test)]
mod test_extract {
    use super::*;
    use crate::cli::{Compress, Config};
    use crate::create::create;
    use crate::tlv::builder::TlvBuilder;
    use std::io::Write;

    fn plain_config() -> Config {
        Config {
            symlink: false,
            same_fs: false,
            compress: Compress {
                enable: false,
                level: 3,
            },
        }
    }

    #[test]
    fn round_trip_identity() {
        let source = tempfile::tempdir().unwrap();
        fs::create_dir_all(source.path().join("a/empty")).unwrap();
        fs::create_dir_all(source.path().join("a/sub")).unwrap();
        fs::write(source.path().join("a/x.txt"), b"hello").unwrap();
        fs::write(source.path().join("a/y.txt"), b"hello").unwrap();
        fs::write(source.path().join("a/sub/z.bin"), (0u8..=255).collect::<Vec<u8>>()).unwrap();
        fs::write(source.path().join("a/sub/none.txt"), b"").unwrap();

        let work = tempfile::tempdir().unwrap();
        let archive = work.path().join("test.mtar");
        create(&archive, source.path(), &plain_config()).unwrap();

        let restored = tempfile::tempdir().unwrap();
        let stats = extract(&archive, restored.path()).unwrap();

        assert_eq!(
            stats,
            ExtractStats {
                dirs: 3,
                files: 4,
                skipped: 0,
            }
        );

        assert_eq!(
            fs::read(restored.path().join("a/x.txt")).unwrap(),
            b"hello"
        );
        assert_eq!(
            fs::read(restored.path().join("a/y.txt")).unwrap(),
            b"hello"
        );
        assert_eq!(
            fs::read(restored.path().join("a/sub/z.bin")).unwrap(),
            (0u8..=255).collect::<Vec<u8>>()
        );
        assert_eq!(
            fs::read(restored.path().join("a/sub/none.txt")).unwrap(),
            b""
        );

        // Empty directories round-trip too
        assert!(restored.path().join("a/empty").is_dir());
    }

    #[test]
    fn round_trip_through_compression() {
        let source = tempfile::tempdir().unwrap();
        fs::write(source.path().join("x.txt"), b"hello world").unwrap();
        fs::write(source.path().join("y.txt"), b"hello world").unwrap();

        let work = tempfile::tempdir().unwrap();
        let archive = work.path().join("test.mtar");

        let mut config = plain_config();
        config.compress.enable = true;
        create(&archive, source.path(), &config).unwrap();

        let restored = tempfile::tempdir().unwrap();
        let stats = extract(&archive, restored.path()).unwrap();

        assert_eq!(stats.files, 2);
        assert_eq!(
            fs::read(restored.path().join("x.txt")).unwrap(),
            b"hello world"
        );
        assert_eq!(
            fs::read(restored.path().join("y.txt")).unwrap(),
            b"hello world"
        );
    }

    #[test]
    fn dangling_reference_skips_only_the_bad_entry() {
        let work = tempfile::tempdir().unwrap();
        let archive = work.path().join("test.mtar");

        // Hand-crafted container: one good file, one reference into nowhere
        let mut builder = TlvBuilder::new(File::create(&archive).unwrap());
        let mut content = std::io::Cursor::new(b"hello".to_vec());
        builder.write_file_data("good.txt", &mut content, 5).unwrap();
        builder.write_file_ref("bad.txt", 9999).unwrap();
        builder.into_inner().flush().unwrap();

        let restored = tempfile::tempdir().unwrap();
        let stats = extract(&archive, restored.path()).unwrap();

        assert_eq!(stats.files, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(
            fs::read(restored.path().join("good.txt")).unwrap(),
            b"hello"
        );
        assert!(!restored.path().join("bad.txt").exists());
    }

    #[test]
    fn truncated_container_extracts_the_complete_records() {
        let source = tempfile::tempdir().unwrap();
        fs::write(source.path().join("a.txt"), b"first").unwrap();
        fs::write(source.path().join("b.txt"), b"second").unwrap();

        let work = tempfile::tempdir().unwrap();
        let archive = work.path().join("test.mtar");
        create(&archive, source.path(), &plain_config()).unwrap();

        // Cut into the final record's payload
        let data = fs::read(&archive).unwrap();
        let cut = work.path().join("cut.mtar");
        fs::write(&cut, &data[..data.len() - 3]).unwrap();

        let restored = tempfile::tempdir().unwrap();
        let stats = extract(&cut, restored.path()).unwrap();

        assert_eq!(stats.files, 1);
        assert_eq!(
            fs::read(restored.path().join("a.txt")).unwrap(),
            b"first"
        );
        assert!(!restored.path().join("b.txt").exists());
    }

    #[test]
    fn hostile_names_cannot_escape_the_output_root() {
        let work = tempfile::tempdir().unwrap();
        let archive = work.path().join("test.mtar");

        let mut builder = TlvBuilder::new(File::create(&archive).unwrap());
        let mut content = std::io::Cursor::new(b"evil".to_vec());
        builder
            .write_file_data("../escape.txt", &mut content, 4)
            .unwrap();
        builder.write_dir("/abs").unwrap();
        builder.into_inner().flush().unwrap();

        let outer = tempfile::tempdir().unwrap();
        let restored = outer.path().join("out");
        let stats = extract(&archive, &restored).unwrap();

        assert_eq!(stats.files, 0);
        assert_eq!(stats.skipped, 2);
        assert!(!outer.path().join("escape.txt").exists());
    }

    #[test]
    fn sanitized_path_accepts_plain_relative_names() {
        let root = Path::new("/out");

        assert_eq!(
            sanitized_path(root, "a/b.txt"),
            Some(PathBuf::from("/out/a/b.txt"))
        );
        assert_eq!(
            sanitized_path(root, "./a/b.txt"),
            Some(PathBuf::from("/out/a/b.txt"))
        );
        assert_eq!(sanitized_path(root, "../b.txt"), None);
        assert_eq!(sanitized_path(root, "/etc/passwd"), None);
        assert_eq!(sanitized_path(root, ""), None);
    }
}
