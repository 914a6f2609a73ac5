//! In-memory cache of per-(track, preset) mastering state: target curves
//! and derived chunk descriptors, so repeated pulls of the same track
//! under the same preset skip target generation and boundary recomputation.
//!
//! Generic over the preset key type `P` and cached value `V` so this
//! crate does not need to depend on `auralis-mastering`/`auralis-stream`
//! for their concrete `Preset`/`MasteringTarget` types; those crates
//! instantiate `PresetCache<Preset, (MasteringTarget, Arc<[ChunkDescriptor]>)>`.

use lru::LruCache;
use parking_lot::RwLock;
use std::hash::Hash;
use std::num::NonZeroUsize;

use auralis_pcm::TrackId;

pub struct PresetCache<P, V> {
    entries: RwLock<LruCache<(TrackId, P), V>>,
}

impl<P, V> PresetCache<P, V>
where
    P: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("capacity clamped to >= 1");
        Self { entries: RwLock::new(LruCache::new(capacity)) }
    }

    pub fn get(&self, track_id: &TrackId, preset: &P) -> Option<V> {
        self.entries.write().get(&(track_id.clone(), preset.clone())).cloned()
    }

    pub fn put(&self, track_id: TrackId, preset: P, value: V) {
        self.entries.write().put((track_id, preset), value);
    }

    pub fn invalidate(&self, track_id: &TrackId, preset: &P) {
        self.entries.write().pop(&(track_id.clone(), preset.clone()));
    }

    /// Drops every cached `(TrackId, Preset)` entry for `track_id`, across
    /// all presets (spec §4.8: "invalidated wholesale if the Fingerprint
    /// Cache reports a higher-confidence re-extraction for a TrackId").
    pub fn invalidate_track(&self, track_id: &TrackId) {
        let mut entries = self.entries.write();
        let keys: Vec<(TrackId, P)> = entries.iter().map(|(k, _)| k.clone()).filter(|(t, _)| t == track_id).collect();
        for key in keys {
            entries.pop(&key);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    enum TestPreset {
        Gentle,
        Adaptive,
    }

    #[test]
    fn caches_and_evicts_by_capacity() {
        let cache: PresetCache<TestPreset, u32> = PresetCache::new(1);
        let track_a = TrackId::from_raw("a");
        let track_b = TrackId::from_raw("b");

        cache.put(track_a.clone(), TestPreset::Gentle, 1);
        assert_eq!(cache.get(&track_a, &TestPreset::Gentle), Some(1));

        cache.put(track_b.clone(), TestPreset::Gentle, 2);
        assert_eq!(cache.get(&track_a, &TestPreset::Gentle), None);
        assert_eq!(cache.get(&track_b, &TestPreset::Gentle), Some(2));
    }

    #[test]
    fn distinct_presets_for_same_track_are_independent() {
        let cache: PresetCache<TestPreset, u32> = PresetCache::new(4);
        let track = TrackId::from_raw("a");
        cache.put(track.clone(), TestPreset::Gentle, 1);
        cache.put(track.clone(), TestPreset::Adaptive, 2);
        assert_eq!(cache.get(&track, &TestPreset::Gentle), Some(1));
        assert_eq!(cache.get(&track, &TestPreset::Adaptive), Some(2));
    }

    #[test]
    fn invalidate_removes_entry() {
        let cache: PresetCache<TestPreset, u32> = PresetCache::new(4);
        let track = TrackId::from_raw("a");
        cache.put(track.clone(), TestPreset::Gentle, 1);
        cache.invalidate(&track, &TestPreset::Gentle);
        assert_eq!(cache.get(&track, &TestPreset::Gentle), None);
    }

    #[test]
    fn invalidate_track_drops_every_preset_for_that_track_only() {
        let cache: PresetCache<TestPreset, u32> = PresetCache::new(8);
        let a = TrackId::from_raw("a");
        let b = TrackId::from_raw("b");
        cache.put(a.clone(), TestPreset::Gentle, 1);
        cache.put(a.clone(), TestPreset::Adaptive, 2);
        cache.put(b.clone(), TestPreset::Gentle, 3);

        cache.invalidate_track(&a);

        assert_eq!(cache.get(&a, &TestPreset::Gentle), None);
        assert_eq!(cache.get(&a, &TestPreset::Adaptive), None);
        assert_eq!(cache.get(&b, &TestPreset::Gentle), Some(3));
    }
}
