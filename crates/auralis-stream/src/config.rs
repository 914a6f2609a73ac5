//! Engine-wide tunables (spec §6.4 / SPEC_FULL §10). Loaded from an
//! optional TOML file via `toml` + `serde`, falling back to defaults —
//! the fingerprint/DSP lineage has no config-file precedent, so this
//! follows the plain `serde`-derived-struct-plus-`Default` convention
//! used elsewhere in the retrieval pack.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub chunk_duration_seconds: f32,
    pub crossfade_duration_seconds: f32,
    pub context_lead_seconds: f32,
    pub context_trail_seconds: f32,
    pub fingerprint_cache_max_bytes: u64,
    pub preset_cache_max_entries: usize,
    pub dsp_worker_count: usize,
    pub lookahead_queue_size: usize,
    pub true_peak_oversample: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let dsp_worker_count = num_cpus::get().min(3).max(1);
        Self {
            chunk_duration_seconds: 30.0,
            crossfade_duration_seconds: 3.0,
            context_lead_seconds: 2.0,
            context_trail_seconds: 0.5,
            fingerprint_cache_max_bytes: 2 * 1024 * 1024 * 1024,
            preset_cache_max_entries: 512,
            dsp_worker_count,
            lookahead_queue_size: dsp_worker_count,
            true_peak_oversample: 4,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// `0 ≤ crossfade < chunk_duration / 2` per spec §4.7.
    pub fn is_valid(&self) -> bool {
        self.chunk_duration_seconds > 0.0
            && self.crossfade_duration_seconds >= 0.0
            && self.crossfade_duration_seconds < self.chunk_duration_seconds / 2.0
            && self.context_lead_seconds >= 0.0
            && self.context_trail_seconds >= 0.0
            && self.dsp_worker_count >= 1
            && self.lookahead_queue_size >= 1
            && self.true_peak_oversample >= 1
    }
}
