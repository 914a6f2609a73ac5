//! [`MasteringTarget`]: the parameter set the DSP stage chain consumes.
//!
//! Defined here, not in `auralis-mastering`, because the stages
//! (`CriticalBandEq` in particular) need the same 26-band center-frequency
//! table the target generator uses to produce `eq_gains_db` — this crate is
//! the single source of truth for both.

use serde::{Deserialize, Serialize};

/// Number of critical bands the EQ stage and target generator agree on.
pub const N_BANDS: usize = 26;

/// Band center frequencies, log-spaced from 20 Hz to 20 kHz approximating
/// the Bark critical-band scale (true Bark edges are irregular at the low
/// end; log spacing is the standard engineering approximation used when a
/// fixed band count is needed rather than the classical 24 variable-width
/// bands).
pub fn bark_band_centers_hz() -> [f32; N_BANDS] {
    let mut centers = [0.0f32; N_BANDS];
    let log_low = 20f32.ln();
    let log_high = 20_000f32.ln();
    for (i, c) in centers.iter_mut().enumerate() {
        let t = i as f32 / (N_BANDS - 1) as f32;
        *c = (log_low + t * (log_high - log_low)).exp();
    }
    centers
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DetectorMode {
    Peak,
    Rms,
    Hybrid,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompSettings {
    pub threshold_db: f32,
    pub ratio: f32,
    pub attack_ms: f32,
    pub release_ms: f32,
    pub detector: DetectorMode,
}

impl Default for CompSettings {
    fn default() -> Self {
        Self {
            threshold_db: -18.0,
            ratio: 2.0,
            attack_ms: 10.0,
            release_ms: 120.0,
            detector: DetectorMode::Hybrid,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LimSettings {
    pub release_ms: f32,
    pub lookahead_ms: f32,
}

impl Default for LimSettings {
    fn default() -> Self {
        Self { release_ms: 50.0, lookahead_ms: 5.0 }
    }
}

/// `{eq_gains_db, target_lufs, max_true_peak_db, compressor, limiter,
/// saturation, stereo_width}` per spec §3. Invariants are enforced by
/// construction in `auralis-mastering`'s target generator, not here; this
/// type is a plain value the DSP stages read.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MasteringTarget {
    pub eq_gains_db: [f32; N_BANDS],
    pub target_lufs: f32,
    pub max_true_peak_db: f32,
    pub compressor: CompSettings,
    pub limiter: LimSettings,
    pub saturation: f32,
    pub stereo_width: f32,
}

impl MasteringTarget {
    /// Zero EQ, mild limiter, no saturation, unity stereo width — the
    /// safe fallback for an all-zero or failed fingerprint (spec §4.4).
    pub fn pass_through() -> Self {
        Self {
            eq_gains_db: [0.0; N_BANDS],
            target_lufs: -14.0,
            max_true_peak_db: -1.0,
            compressor: CompSettings {
                threshold_db: -6.0,
                ratio: 1.2,
                attack_ms: 20.0,
                release_ms: 200.0,
                detector: DetectorMode::Rms,
            },
            limiter: LimSettings::default(),
            saturation: 0.0,
            stereo_width: 1.0,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.max_true_peak_db <= 0.0
            && (-24.0..=-8.0).contains(&self.target_lufs)
            && self.eq_gains_db.iter().all(|g| g.is_finite() && (-8.0..=8.0).contains(g))
            && (0.0..=0.5).contains(&self.saturation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_centers_span_audible_range() {
        let centers = bark_band_centers_hz();
        assert!((centers[0] - 20.0).abs() < 0.5);
        assert!((centers[N_BANDS - 1] - 20_000.0).abs() < 5.0);
        for w in centers.windows(2) {
            assert!(w[1] > w[0]);
        }
    }

    #[test]
    fn pass_through_target_is_valid() {
        assert!(MasteringTarget::pass_through().is_valid());
    }
}
