//! MG-014: SHA-256 content hashing for version files.

use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

const STREAM_BUF_SIZE: usize = 65536;

/// Lowercase hex SHA-256 of a byte slice.
pub fn hash_bytes(data: &[u8]) -> String {
    to_hex(&Sha256::digest(data))
}

/// Lowercase hex SHA-256 of a file's contents.
pub fn hash_file(path: &Path) -> Result<String, String> {
    let mut file =
        std::fs::File::open(path).map_err(|e| format!("cannot open {}: {}", path.display(), e))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; STREAM_BUF_SIZE];
    loop {
        let n = file
            .read(&mut buf)
            .map_err(|e| format!("read error {}: {}", path.display(), e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(to_hex(&hasher.finalize()))
}

fn to_hex(digest: &[u8]) -> String {
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mg014_hash_bytes_known_vectors() {
        assert_eq!(
            hash_bytes(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            hash_bytes(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_mg014_hash_file_matches_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user.go");
        let content = "// +build ignore\n\npackage user\n\n";
        std::fs::write(&path, content).unwrap();
        assert_eq!(hash_file(&path).unwrap(), hash_bytes(content.as_bytes()));
        assert_eq!(hash_file(&path).unwrap().len(), 64);
    }

    #[test]
    fn test_mg014_hash_file_missing() {
        let err = hash_file(Path::new("/nonexistent/x.go")).unwrap_err();
        assert!(err.starts_with("cannot open"));
    }
}
