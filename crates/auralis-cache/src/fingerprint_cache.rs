//! Persistent fingerprint cache: an append-only log on disk, backed by
//! an in-memory LRU index for fast lookup, compacted and atomically
//! swapped in when the log grows past its configured disk budget.
//!
//! The design follows a bitcask-style key/value log: writes are pure
//! appends (cheap, crash-safe up to a torn final record, see
//! [`crate::record`]), and reads are served entirely from the in-memory
//! index — the log is only replayed once, at [`FingerprintCache::open`].

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use auralis_pcm::TrackId;

use crate::error::CacheError;
use crate::record::FingerprintEntry;

const LOG_FILE_NAME: &str = "fingerprints.log";
const LOG_TMP_NAME: &str = "fingerprints.log.tmp";

/// A single entry's on-disk footprint, used to track and bound the log's
/// total size without re-stat'ing the file on every write.
fn entry_disk_size(entry: &FingerprintEntry) -> u64 {
    entry.encode().len() as u64
}

pub struct FingerprintCache {
    dir: PathBuf,
    index: Mutex<LruCache<TrackId, FingerprintEntry>>,
    key_locks: Mutex<HashMap<TrackId, Arc<Mutex<()>>>>,
    disk_bytes: Mutex<u64>,
    max_disk_bytes: u64,
}

impl FingerprintCache {
    /// Opens (creating if absent) a cache rooted at `dir`, replaying its
    /// log into memory. `max_disk_bytes` bounds the log's size; once
    /// exceeded, the next write triggers compaction, evicting the least
    /// recently used entries until the log fits again.
    pub fn open(dir: impl AsRef<Path>, max_disk_bytes: u64) -> Result<Self, CacheError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let log_path = dir.join(LOG_FILE_NAME);
        let mut index = LruCache::unbounded();
        let mut disk_bytes = 0u64;

        if log_path.exists() {
            let mut file = File::open(&log_path)?;
            let mut buf = Vec::new();
            file.read_to_end(&mut buf)?;

            let mut offset = 0usize;
            let mut recovered = 0usize;
            loop {
                match FingerprintEntry::decode(&buf[offset..]) {
                    Ok(Some((entry, consumed))) => {
                        disk_bytes += consumed as u64;
                        offset += consumed;
                        recovered += 1;
                        index.put(entry.track_id.clone(), entry);
                    }
                    Ok(None) => {
                        if offset < buf.len() {
                            warn!(
                                dropped_bytes = buf.len() - offset,
                                "discarding torn tail record in fingerprint cache log"
                            );
                        }
                        break;
                    }
                    Err(err) => {
                        warn!(%err, "stopping cache log replay at corrupt record");
                        break;
                    }
                }
            }
            info!(recovered, path = %log_path.display(), "replayed fingerprint cache log");
        }

        Ok(Self {
            dir,
            index: Mutex::new(index),
            key_locks: Mutex::new(HashMap::new()),
            disk_bytes: Mutex::new(disk_bytes),
            max_disk_bytes,
        })
    }

    pub fn get(&self, track_id: &TrackId) -> Option<FingerprintEntry> {
        self.index.lock().get(track_id).cloned()
    }

    /// Inserts or overwrites the cached entry for `entry.track_id`,
    /// appending to the log and updating the in-memory index. Concurrent
    /// puts for different keys proceed independently; puts for the same
    /// key serialize against each other.
    ///
    /// Only overwrites an existing entry if `entry.confidence` is
    /// strictly greater than the one already on disk; a lower- or
    /// equal-confidence recomputation is silently dropped so confidence
    /// never regresses.
    pub fn put(&self, entry: FingerprintEntry) -> Result<(), CacheError> {
        let lock = self.lock_for(&entry.track_id);
        let _guard = lock.lock();

        if let Some(existing) = self.index.lock().peek(&entry.track_id) {
            if entry.confidence <= existing.confidence {
                debug!(
                    track_id = entry.track_id.as_str(),
                    existing = existing.confidence,
                    attempted = entry.confidence,
                    "dropping fingerprint put with non-increasing confidence"
                );
                return Ok(());
            }
        }

        let log_path = self.dir.join(LOG_FILE_NAME);
        let encoded = entry.encode();

        let mut file = OpenOptions::new().create(true).append(true).open(&log_path)?;
        file.write_all(&encoded)?;
        file.sync_all()?;

        let added = encoded.len() as u64;
        self.index.lock().put(entry.track_id.clone(), entry);

        let mut disk_bytes = self.disk_bytes.lock();
        *disk_bytes += added;
        let size_now = *disk_bytes;
        drop(disk_bytes);

        if size_now > self.max_disk_bytes {
            self.compact()?;
        }
        Ok(())
    }

    /// Rewrites the log to contain only entries currently retained in
    /// the in-memory index (most-recently-used first), evicting from
    /// the tail until the rewritten log fits 90% of `max_disk_bytes`
    /// (spec §4.3: "evict least-recently-accessed entries until under
    /// 90% of cap"), then swaps it in via write-then-rename.
    fn compact(&self) -> Result<(), CacheError> {
        let mut index = self.index.lock();

        let target_bytes = (self.max_disk_bytes * 9) / 10;
        let mut entries: Vec<FingerprintEntry> = index.iter().map(|(_, v)| v.clone()).collect();
        // `iter()` yields most-recently-used first; keep that order so
        // eviction (from the end) drops the least recently used.
        let mut kept_bytes = 0u64;
        let mut keep_count = entries.len();
        for (i, e) in entries.iter().enumerate() {
            let size = entry_disk_size(e);
            if kept_bytes + size > target_bytes && i > 0 {
                keep_count = i;
                break;
            }
            kept_bytes += size;
        }
        let evicted = entries.len() - keep_count;
        entries.truncate(keep_count);

        let tmp_path = self.dir.join(LOG_TMP_NAME);
        let final_path = self.dir.join(LOG_FILE_NAME);
        {
            let mut tmp = File::create(&tmp_path)?;
            for e in &entries {
                tmp.write_all(&e.encode())?;
            }
            tmp.sync_all()?;
        }
        fs::rename(&tmp_path, &final_path)?;

        let mut rebuilt = LruCache::unbounded();
        for e in entries.into_iter().rev() {
            rebuilt.put(e.track_id.clone(), e);
        }
        *index = rebuilt;
        *self.disk_bytes.lock() = kept_bytes;

        debug!(evicted, kept_bytes, "compacted fingerprint cache log");
        Ok(())
    }

    /// Removes the cached entry for `track_id`, if any. The next lookup
    /// miss is the caller's cue to re-extract; this does not touch the
    /// on-disk log directly (the stale record is dropped on the next
    /// compaction since it no longer appears in the in-memory index).
    pub fn invalidate(&self, track_id: &TrackId) {
        self.index.lock().pop(track_id);
    }

    fn lock_for(&self, track_id: &TrackId) -> Arc<Mutex<()>> {
        self.key_locks
            .lock()
            .entry(track_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.index.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auralis_fingerprint::Fingerprint;

    fn sample_entry(label: &str) -> FingerprintEntry {
        let fingerprint = Fingerprint::from_vec25(std::array::from_fn(|i| i as f32 * 0.01));
        FingerprintEntry::new(TrackId::from_raw(label), fingerprint, 0.9)
    }

    #[test]
    fn put_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FingerprintCache::open(dir.path(), 1 << 20).unwrap();
        let entry = sample_entry("a");
        cache.put(entry.clone()).unwrap();
        assert_eq!(cache.get(&entry.track_id), Some(entry));
    }

    #[test]
    fn put_with_lower_confidence_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FingerprintCache::open(dir.path(), 1 << 20).unwrap();
        let track_id = TrackId::from_raw("a");
        let high = FingerprintEntry::new(track_id.clone(), Fingerprint::from_vec25([0.1; 25]), 0.9);
        let low = FingerprintEntry::new(track_id.clone(), Fingerprint::from_vec25([0.2; 25]), 0.3);

        cache.put(high.clone()).unwrap();
        cache.put(low).unwrap();

        assert_eq!(cache.get(&track_id), Some(high));
    }

    #[test]
    fn put_with_higher_confidence_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FingerprintCache::open(dir.path(), 1 << 20).unwrap();
        let track_id = TrackId::from_raw("a");
        let low = FingerprintEntry::new(track_id.clone(), Fingerprint::from_vec25([0.1; 25]), 0.3);
        let high = FingerprintEntry::new(track_id.clone(), Fingerprint::from_vec25([0.2; 25]), 0.9);

        cache.put(low).unwrap();
        cache.put(high.clone()).unwrap();

        assert_eq!(cache.get(&track_id), Some(high));
    }

    #[test]
    fn invalidate_removes_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FingerprintCache::open(dir.path(), 1 << 20).unwrap();
        let entry = sample_entry("a");
        cache.put(entry.clone()).unwrap();
        cache.invalidate(&entry.track_id);
        assert!(cache.get(&entry.track_id).is_none());
    }

    #[test]
    fn reopening_replays_the_log() {
        let dir = tempfile::tempdir().unwrap();
        {
            let cache = FingerprintCache::open(dir.path(), 1 << 20).unwrap();
            cache.put(sample_entry("a")).unwrap();
            cache.put(sample_entry("b")).unwrap();
        }
        let reopened = FingerprintCache::open(dir.path(), 1 << 20).unwrap();
        assert_eq!(reopened.len(), 2);
        assert!(reopened.get(&TrackId::from_raw("a")).is_some());
    }

    #[test]
    fn overflowing_disk_budget_triggers_compaction() {
        let dir = tempfile::tempdir().unwrap();
        let one_record_bytes = sample_entry("x").encode().len() as u64;
        let cache = FingerprintCache::open(dir.path(), one_record_bytes * 2).unwrap();
        for i in 0..10 {
            cache.put(sample_entry(&format!("track-{i}"))).unwrap();
        }
        let log_size = fs::metadata(dir.path().join(LOG_FILE_NAME)).unwrap().len();
        assert!(log_size <= one_record_bytes * 3);
        assert!(cache.len() < 10);
    }

    #[test]
    fn most_recently_used_entries_survive_compaction() {
        let dir = tempfile::tempdir().unwrap();
        let one_record_bytes = sample_entry("x").encode().len() as u64;
        let cache = FingerprintCache::open(dir.path(), one_record_bytes * 2).unwrap();
        cache.put(sample_entry("old")).unwrap();
        for i in 0..5 {
            cache.put(sample_entry(&format!("track-{i}"))).unwrap();
        }
        assert!(cache.get(&TrackId::from_raw("old")).is_none());
        assert!(cache.get(&TrackId::from_raw("track-4")).is_some());
    }
}
