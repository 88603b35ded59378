//! Content identity for large-object blobs
//!
//! A `ContentId` is a SHA-256 digest of a file's bytes. It is both the local
//! cache key and part of the remote object name, so cryptographic strength
//! matters: a collision would let one blob silently stand in for another.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::{Path, PathBuf};

/// SHA-256 digest of a blob's content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentId([u8; 32]);

impl ContentId {
    /// Create a ContentId from raw digest bytes
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Compute the ContentId of an in-memory buffer
    pub fn from_data(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(hash.into())
    }

    /// Compute the ContentId of a reader's full contents.
    ///
    /// Streams in fixed-size chunks; the files this tool handles are exactly
    /// the ones too large to slurp into memory.
    pub fn from_reader<R: Read>(mut reader: R) -> std::io::Result<Self> {
        let mut hasher = Sha256::new();
        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(Self(hasher.finalize().into()))
    }

    /// Compute the ContentId of a file on disk
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// Convert to hexadecimal string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hexadecimal string
    pub fn from_hex(hex_str: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(hex_str)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Get raw digest bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Display for ContentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Remote object name for a blob: path plus content identity.
///
/// Unlike the local cache, the remote store keys on the original file path as
/// well as the digest, so two identical blobs at different paths occupy two
/// remote objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteKey {
    /// Repository-relative path of the file
    pub path: PathBuf,
    /// Content identity of the file's bytes
    pub id: ContentId,
}

impl RemoteKey {
    /// Create a new remote key
    pub fn new(path: PathBuf, id: ContentId) -> Self {
        Self { path, id }
    }

    /// Render the object name under a bucket prefix:
    /// `<prefix>/<path>.<hex-digest>`
    pub fn object_name(&self, prefix: &str) -> String {
        format!(
            "{}/{}.{}",
            prefix.trim_end_matches('/'),
            self.path.display(),
            self.id.to_hex()
        )
    }
}

impl std::fmt::Display for RemoteKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.path.display(), self.id.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_id_roundtrip() {
        let bytes = [42u8; 32];
        let id = ContentId::new(bytes);
        let hex = id.to_hex();
        let id2 = ContentId::from_hex(&hex).unwrap();
        assert_eq!(id, id2);
    }

    #[test]
    fn test_from_hex_rejects_bad_length() {
        assert!(ContentId::from_hex("abcd").is_err());
    }

    #[test]
    fn test_content_id_is_content_only() {
        // Same bytes, different paths — identical identity
        let tmp = tempfile::tempdir().unwrap();
        let a = tmp.path().join("a.bin");
        let b = tmp.path().join("sub").join("b.bin");
        std::fs::create_dir_all(b.parent().unwrap()).unwrap();
        std::fs::write(&a, b"payload").unwrap();
        std::fs::write(&b, b"payload").unwrap();

        let id_a = ContentId::from_file(&a).unwrap();
        let id_b = ContentId::from_file(&b).unwrap();
        assert_eq!(id_a, id_b);
        assert_eq!(id_a, ContentId::from_data(b"payload"));
    }

    #[test]
    fn test_from_reader_matches_from_data() {
        let data = vec![7u8; 200_000]; // spans several read chunks
        let id = ContentId::from_reader(&data[..]).unwrap();
        assert_eq!(id, ContentId::from_data(&data));
    }

    #[test]
    fn test_remote_key_object_name() {
        let id = ContentId::from_data(b"x");
        let key = RemoteKey::new(PathBuf::from("assets/data.bin"), id);
        let name = key.object_name("gs://bucket/blobs/");
        assert_eq!(
            name,
            format!("gs://bucket/blobs/assets/data.bin.{}", id.to_hex())
        );
    }
}
