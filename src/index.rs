use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use log::debug;

use crate::buf::streams_equal;

/// First occurrence of a piece of content within the archive being built.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Offset of the origin FILE record header, the DREF target on the wire.
    pub entry_offset: u64,
    /// Where the origin bytes came from, used for dedup verification.
    pub source: PathBuf,
}

/// Maps a content fingerprint to the candidate origin record. Scoped to one
/// create call and never persisted, the container itself encodes reference
/// relationships explicitly.
///
/// Buckets are single-slot: an insert overwrites any previous occupant. The
/// earlier occupant's archive entry stays valid data, it just stops being a
/// dedup target for future files.
// TODO: evaulate a Vec of candidates per bucket for better dedup recall
pub struct FingerprintIndex {
    bucket: HashMap<u64, Candidate>,
}

impl FingerprintIndex {
    pub fn new() -> Self {
        FingerprintIndex {
            bucket: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.bucket.len()
    }

    /// Verified lookup. A bucket hit alone is not trusted, the candidate is
    /// returned only after a full byte comparison of its source file against
    /// the new file succeeds. Fingerprints can collide, contents can not.
    pub fn lookup(
        &self,
        fingerprint: u64,
        path: &Path,
    ) -> Result<Option<&Candidate>, std::io::Error> {
        let candidate = match self.bucket.get(&fingerprint) {
            None => return Ok(None),
            Some(x) => x,
        };

        let mut candidate_data = File::open(&candidate.source)?;
        let mut new_data = File::open(path)?;

        if streams_equal(&mut candidate_data, &mut new_data)? {
            Ok(Some(candidate))
        } else {
            debug!(
                "fingerprint collision between {} and {}, storing as original",
                candidate.source.display(),
                path.display(),
            );
            Ok(None)
        }
    }

    pub fn insert(&mut self, fingerprint: u64, candidate: Candidate) {
        self.bucket.insert(fingerprint, candidate);
    }
}
