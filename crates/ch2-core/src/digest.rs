//! Content digests for scanned files.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Read size for hashing (64KB keeps memory flat for large activity files).
const CHUNK_SIZE: usize = 64 * 1024;

/// Hashes the file contents, reading in fixed-size chunks.
///
/// Returns the lowercase hex digest.
pub fn content_hash(path: &Path) -> io::Result<String> {
    let file = File::open(path)?;
    hash_reader(file)
}

/// Hashes everything readable from `reader`.
pub fn hash_reader<R: Read>(mut reader: R) -> io::Result<String> {
    let mut hasher = blake3::Hasher::new();
    let mut buf = vec![0_u8; CHUNK_SIZE];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                hasher.update(&buf[..n]);
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
    Ok(hasher.finalize().to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;

    #[test]
    fn identical_content_hashes_equal() {
        let temp = tempfile::tempdir().unwrap();
        let a = temp.path().join("a.fit");
        let b = temp.path().join("b.fit");
        std::fs::write(&a, b"same bytes").unwrap();
        std::fs::write(&b, b"same bytes").unwrap();

        assert_eq!(content_hash(&a).unwrap(), content_hash(&b).unwrap());
    }

    #[test]
    fn chunking_does_not_change_digest() {
        let data = vec![7_u8; CHUNK_SIZE * 2 + 17];
        let chunked = hash_reader(Cursor::new(&data)).unwrap();
        assert_eq!(chunked, blake3::hash(&data).to_hex().to_string());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let temp = tempfile::tempdir().unwrap();
        let err = content_hash(&temp.path().join("missing.fit")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
