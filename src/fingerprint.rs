//! Content fingerprints for ingestion deduplication.
//!
//! A fingerprint is the lowercase hex SHA-256 of a file's bytes. It depends
//! only on content, never on the file's name or location, so the same PDF
//! uploaded twice under different names is recognised as already ingested.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::AssistantError;

/// Block size used when streaming a file into the digest.
const BLOCK_SIZE: usize = 4096;

/// Hex-encoded SHA-256 digest of a file's contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fingerprint the file at `path`, reading it in fixed-size blocks.
pub fn fingerprint(path: &Path) -> Result<Fingerprint, AssistantError> {
    let file = File::open(path).map_err(|e| AssistantError::io(path, e))?;
    fingerprint_reader(BufReader::new(file)).map_err(|e| AssistantError::io(path, e))
}

/// Fingerprint any byte stream.
pub fn fingerprint_reader<R: Read>(mut reader: R) -> std::io::Result<Fingerprint> {
    let mut hasher = Sha256::new();
    let mut block = [0u8; BLOCK_SIZE];
    loop {
        let n = match reader.read(&mut block) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&block[..n]);
    }
    Ok(Fingerprint(hex::encode(hasher.finalize())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_known_digest() {
        let fp = fingerprint_reader(&b"abc"[..]).unwrap();
        assert_eq!(
            fp.as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_same_bytes_different_names() {
        let tmp = TempDir::new().unwrap();
        let content: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let a = tmp.path().join("report.pdf");
        let b = tmp.path().join("nested-copy (1).pdf");
        fs::write(&a, &content).unwrap();
        fs::write(&b, &content).unwrap();

        let fa = fingerprint(&a).unwrap();
        assert_eq!(fa, fingerprint(&a).unwrap());
        assert_eq!(fa, fingerprint(&b).unwrap());
    }

    #[test]
    fn test_streaming_matches_whole_buffer() {
        // Spans several blocks with a ragged tail.
        let content = vec![7u8; BLOCK_SIZE * 3 + 17];
        let streamed = fingerprint_reader(&content[..]).unwrap();
        let whole = hex::encode(Sha256::digest(&content));
        assert_eq!(streamed.as_str(), whole);
    }

    #[test]
    fn test_different_content_differs() {
        let a = fingerprint_reader(&b"The sky is blue."[..]).unwrap();
        let b = fingerprint_reader(&b"The sky is grey."[..]).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = fingerprint(Path::new("/definitely/not/here.pdf")).unwrap_err();
        assert!(matches!(err, AssistantError::Io { .. }));
    }
}
