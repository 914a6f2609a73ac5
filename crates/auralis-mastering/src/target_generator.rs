//! Deterministic mapping from `(Fingerprint, Preset)` to a `MasteringTarget`
//! (spec §4.4). Pure function: no I/O, no randomness, no metadata — the
//! only inputs are the numeric fingerprint and the chosen preset, so the
//! same pair always yields the same target (required by §8's determinism
//! property).

use auralis_dsp::{bark_band_centers_hz, CompSettings, DetectorMode, LimSettings, MasteringTarget, N_BANDS};
use auralis_fingerprint::Fingerprint;

use crate::preset::Preset;

const LIMITER_CEILING_DBTP: f32 = -0.3;

/// Same log-spaced 7-band edges the fingerprint extractor's frequency
/// analysis uses (see `auralis_fingerprint::frequency`), duplicated here
/// since that function is private to its crate and this is pure math, not
/// shared state.
fn frequency_band_edges() -> [f32; 8] {
    let lo = 20.0f32.ln();
    let hi = 20_000.0f32.ln();
    std::array::from_fn(|i| (lo + (i as f32 / 7.0) * (hi - lo)).exp())
}

fn band_index_for_freq(freq_hz: f32, edges: &[f32; 8]) -> usize {
    for i in 0..7 {
        if freq_hz < edges[i + 1] {
            return i;
        }
    }
    6
}

/// Generic-neutral reference curve: equal energy per of the 7 frequency
/// bands (a flat spectral tilt). Deviation of the fingerprint's measured
/// distribution from this is the adaptive EQ's primary driver.
const REFERENCE_CURVE: [f32; 7] = [1.0 / 7.0; 7];

fn adaptive_eq_gains(fp: &Fingerprint) -> [f32; N_BANDS] {
    let edges = frequency_band_edges();
    let centers = bark_band_centers_hz();
    let measured = [
        fp.frequency.band_0,
        fp.frequency.band_1,
        fp.frequency.band_2,
        fp.frequency.band_3,
        fp.frequency.band_4,
        fp.frequency.band_5,
        fp.frequency.band_6,
    ];

    // Spectral centroid tilt: a centroid above the 2 kHz neutral point
    // means the track already leans bright, so tilt the curve down at
    // high frequency (and up at low) to recenter it, and vice versa.
    let centroid_hz = fp.spectral.centroid.clamp(20.0, 20_000.0);
    let centroid_tilt = ((2000.0 / centroid_hz).ln() / 3.0).clamp(-1.0, 1.0);

    // Flatness near 1.0 (noise-like) reads as over-bright/harsh; flatness
    // near 0 (tonal) reads as potentially dull. Either nudges high bands
    // the opposite direction.
    let dullness_brightness = (0.5 - fp.spectral.flatness) * 2.0;

    std::array::from_fn(|band| {
        let center = centers[band];
        let idx = band_index_for_freq(center, &edges);
        let deviation_ratio = (measured[idx].max(1e-4) / REFERENCE_CURVE[idx]).max(1e-3);
        let deviation_db = 10.0 * deviation_ratio.log10() * 0.4;

        let octaves_from_2k = (center / 2000.0).max(1e-3).ln() / std::f32::consts::LN_2;
        let tilt_db = centroid_tilt * octaves_from_2k * 0.5;
        let brightness_db = if center > 4000.0 { dullness_brightness * 0.8 } else { 0.0 };

        (deviation_db + tilt_db + brightness_db).clamp(-8.0, 8.0)
    })
}

/// Normalizes the fingerprint's dB crest factor (spec §4.2 range, roughly
/// `[0, 30]` dB) into the `[0, 1]` scale the adaptive formulas below share.
fn crest_norm(fp: &Fingerprint) -> f32 {
    (fp.dynamics.crest_factor / 20.0).clamp(0.0, 1.0)
}

fn adaptive_target_lufs(fp: &Fingerprint) -> f32 {
    let energy_norm = ((fp.dynamics.lufs + 40.0) / 40.0).clamp(0.0, 1.0);
    let crest = crest_norm(fp);
    -18.0 + energy_norm * (1.0 - crest) * 7.0
}

fn adaptive_compressor(fp: &Fingerprint) -> CompSettings {
    let crest = crest_norm(fp);
    CompSettings {
        threshold_db: -12.0 - crest * 12.0,
        ratio: 1.5 + crest * 4.5,
        attack_ms: 12.0,
        release_ms: 120.0,
        detector: DetectorMode::Hybrid,
    }
}

fn adaptive_saturation(fp: &Fingerprint) -> f32 {
    let harmonicity =
        (fp.harmonic.voiced_ratio + fp.harmonic.fundamental_stability + fp.harmonic.chroma_concentration) / 3.0;
    (harmonicity.clamp(0.0, 1.0) * 0.3).clamp(0.0, 0.5)
}

fn adaptive_stereo_width(fp: &Fingerprint) -> f32 {
    (0.9 * fp.stereo.stereo_width).clamp(0.5, 1.0)
}

fn is_all_zero(fp: &Fingerprint) -> bool {
    fp.to_vec25().iter().all(|v| *v == 0.0)
}

fn apply_preset_bias(mut target: MasteringTarget, preset: Preset) -> MasteringTarget {
    let centers = bark_band_centers_hz();

    match preset {
        Preset::Adaptive => {}
        Preset::Gentle => {
            for gain in target.eq_gains_db.iter_mut() {
                *gain *= 0.5;
            }
            target.compressor.ratio = 1.0 + (target.compressor.ratio - 1.0) * 0.5;
            target.compressor.threshold_db *= 0.5;
            target.target_lufs += 0.2;
        }
        Preset::Warm => {
            for (band, gain) in target.eq_gains_db.iter_mut().enumerate() {
                let center = centers[band];
                if center < 250.0 {
                    *gain += 1.5;
                } else if center > 6000.0 {
                    *gain -= 0.5;
                }
            }
            target.saturation += 0.05;
        }
        Preset::Bright => {
            for (band, gain) in target.eq_gains_db.iter_mut().enumerate() {
                let center = centers[band];
                if center > 6000.0 {
                    *gain += 1.5;
                } else if (150.0..600.0).contains(&center) {
                    *gain -= 0.5;
                }
            }
        }
        Preset::Punchy => {
            target.compressor.threshold_db -= 3.0;
            target.compressor.ratio += 1.5;
            target.compressor.attack_ms *= 0.5;
        }
    }

    for gain in target.eq_gains_db.iter_mut() {
        *gain = gain.clamp(-8.0, 8.0);
    }
    target.saturation = target.saturation.clamp(0.0, 0.5);
    target
}

/// Maps `(fingerprint, preset)` to a fully populated `MasteringTarget`.
/// An all-zero fingerprint (a failed extraction degraded per §7) always
/// yields the safe pass-through target regardless of preset.
pub fn generate(fingerprint: &Fingerprint, preset: Preset) -> MasteringTarget {
    if is_all_zero(fingerprint) {
        return MasteringTarget::pass_through();
    }

    let baseline = MasteringTarget {
        eq_gains_db: adaptive_eq_gains(fingerprint),
        target_lufs: adaptive_target_lufs(fingerprint).clamp(-24.0, -8.0),
        max_true_peak_db: LIMITER_CEILING_DBTP,
        compressor: adaptive_compressor(fingerprint),
        limiter: LimSettings::default(),
        saturation: adaptive_saturation(fingerprint),
        stereo_width: adaptive_stereo_width(fingerprint),
    };

    let mut target = apply_preset_bias(baseline, preset);
    target.target_lufs = target.target_lufs.clamp(-24.0, -8.0);
    target
}
