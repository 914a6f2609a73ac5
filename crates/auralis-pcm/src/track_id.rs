use std::fmt;
use std::fs;
use std::hash::{Hash, Hasher};
use std::io::Read;
use std::path::Path;

/// Stable identity for a decoded file: derived from path, size,
/// modification time, and a content hash prefix, so that two decoded
/// files with identical content yield identical `TrackId` even if one
/// was renamed or copied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(String);

impl TrackId {
    /// Builds a `TrackId` from file metadata plus a content-hash prefix
    /// (first 64 KiB, FNV-1a). Reading only a prefix keeps identity
    /// computation cheap for large tracks while still distinguishing
    /// files that share path/size/mtime but differ in content.
    pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let meta = fs::metadata(path)?;
        let size = meta.len();
        let mtime = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let mut file = fs::File::open(path)?;
        let mut buf = vec![0u8; 64 * 1024];
        let n = file.read(&mut buf).unwrap_or(0);
        let content_hash = fnv1a(&buf[..n]);

        Ok(Self(format!(
            "{}:{size}:{mtime}:{content_hash:016x}",
            path.to_string_lossy()
        )))
    }

    /// Builds a `TrackId` directly from raw bytes, for callers (tests,
    /// in-memory sources) that don't have a filesystem path.
    pub fn from_bytes(label: &str, bytes: &[u8]) -> Self {
        let hash = fnv1a(bytes);
        Self(format!("{label}:{}:{hash:016x}", bytes.len()))
    }

    /// Reconstructs a `TrackId` from its exact string form, e.g. when
    /// reading one back out of the fingerprint cache's on-disk log.
    pub fn from_raw(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// Convenience: a `TrackId` also implements `Hasher`-friendly equality so
/// it drops straight into `HashMap`/`lru::LruCache` keys.
pub fn hash_track_id(id: &TrackId) -> u64 {
    let mut h = std::collections::hash_map::DefaultHasher::new();
    id.hash(&mut h);
    h.finish()
}
