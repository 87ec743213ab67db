use std::hash::Hasher as StdHasher;
use std::io::Read;

use twox_hash::XxHash64;

// Make the fingerprint api be similiar to blake3's
pub struct Fingerprint(XxHash64);

impl Fingerprint {
    pub fn new() -> Fingerprint {
        // TODO: Evaulate seed of 0, might be better to start with a non-zero seed
        Fingerprint(XxHash64::with_seed(0))
    }

    pub fn update(&mut self, data: &[u8]) {
        self.0.write(data);
    }

    pub fn finalize(self) -> u64 {
        self.0.finish()
    }
}

/// Streaming digest over a file's full content.
///
/// The fingerprint is only a bucketing key for the dedup index. Every bucket
/// hit is verified with a full byte comparison before it is trusted, so a
/// non-cryptographic hash is sufficient. The trait seam exists so tests can
/// substitute a colliding digest.
pub trait Digest {
    fn fingerprint<R: Read>(&self, data: &mut R) -> Result<u64, std::io::Error>;
}

pub struct XxDigest;

impl Digest for XxDigest {
    fn fingerprint<R: Read>(&self, data: &mut R) -> Result<u64, std::io::Error> {
        let mut hash = Fingerprint::new();
        let mut buf = [0u8; 8 * 1024];

        loop {
            match data.read(&mut buf)? {
                0 => break,
                len => hash.update(&buf[..len]),
            }
        }
        Ok(hash.finalize())
    }
}

#[cfg(test)]
mod test_digest {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn same_data_same_fingerprint() {
        let a = XxDigest
            .fingerprint(&mut Cursor::new(b"hello".to_vec()))
            .unwrap();
        let b = XxDigest
            .fingerprint(&mut Cursor::new(b"hello".to_vec()))
            .unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn different_data_different_fingerprint() {
        let a = XxDigest
            .fingerprint(&mut Cursor::new(b"hello".to_vec()))
            .unwrap();
        let b = XxDigest
            .fingerprint(&mut Cursor::new(b"world".to_vec()))
            .unwrap();

        assert_ne!(a, b);
    }

    #[test]
    fn chunked_matches_whole() {
        // Digesting across buffer boundaries must agree with a one-shot hash
        let data: Vec<u8> = (0..(20 * 1024)).map(|i| (i % 251) as u8).collect();

        let whole = XxDigest.fingerprint(&mut Cursor::new(data.clone())).unwrap();

        let mut hash = Fingerprint::new();
        for chunk in data.chunks(7) {
            hash.update(chunk);
        }

        assert_eq!(whole, hash.finalize());
    }
}
