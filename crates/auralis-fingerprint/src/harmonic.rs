//! Harmonic content (3D): voiced ratio, fundamental stability, chroma concentration.
//!
//! Pitch tracking follows the teacher's autocorrelation-based estimators
//! in `fingerprint_compute.rs` (`estimate_pitch_stability`, `estimate_harmonic_ratio`),
//! generalized from per-track scalars into reusable frame-wise helpers.

const FRAME_S: f32 = 0.05;
const MIN_F0_HZ: f32 = 60.0;
const MAX_F0_HZ: f32 = 1000.0;

fn autocorrelation_pitch(frame: &[f32], sample_rate: u32) -> Option<f32> {
    let min_lag = (sample_rate as f32 / MAX_F0_HZ) as usize;
    let max_lag = (sample_rate as f32 / MIN_F0_HZ) as usize;
    if frame.len() <= max_lag || min_lag == 0 {
        return None;
    }

    let energy: f32 = frame.iter().map(|s| s * s).sum();
    if energy < 1e-8 {
        return None;
    }

    let mut best_lag = 0usize;
    let mut best_corr = 0.0f32;
    for lag in min_lag..max_lag.min(frame.len() - 1) {
        let corr: f32 = frame[..frame.len() - lag]
            .iter()
            .zip(frame[lag..].iter())
            .map(|(a, b)| a * b)
            .sum();
        if corr > best_corr {
            best_corr = corr;
            best_lag = lag;
        }
    }

    if best_lag == 0 || best_corr / energy < 0.3 {
        return None;
    }
    Some(sample_rate as f32 / best_lag as f32)
}

fn frame_pitches(mono: &[f32], sample_rate: u32) -> Vec<Option<f32>> {
    let frame_len = ((FRAME_S * sample_rate as f32) as usize).max(64);
    mono.chunks(frame_len)
        .map(|chunk| autocorrelation_pitch(chunk, sample_rate))
        .collect()
}

/// Fraction of frames with a detectable, confident pitch.
pub fn voiced_ratio(mono: &[f32], sample_rate: u32) -> f32 {
    if mono.is_empty() || sample_rate == 0 {
        return 0.3;
    }
    let pitches = frame_pitches(mono, sample_rate);
    if pitches.is_empty() {
        return 0.3;
    }
    let voiced = pitches.iter().filter(|p| p.is_some()).count();
    voiced as f32 / pitches.len() as f32
}

/// Inverse coefficient of variation of frame-to-frame f0, normalized so
/// a rock-steady pitch (e.g. a sustained synth pad) approaches 1.0.
pub fn fundamental_stability(mono: &[f32], sample_rate: u32) -> f32 {
    if mono.is_empty() || sample_rate == 0 {
        return 0.5;
    }
    let voiced: Vec<f32> = frame_pitches(mono, sample_rate).into_iter().flatten().collect();
    if voiced.len() < 2 {
        return 0.5;
    }
    let mean: f32 = voiced.iter().sum::<f32>() / voiced.len() as f32;
    if mean < 1e-6 {
        return 0.5;
    }
    let variance: f32 = voiced.iter().map(|f| (f - mean).powi(2)).sum::<f32>() / voiced.len() as f32;
    let cv = variance.sqrt() / mean;
    (1.0 - cv.clamp(0.0, 1.0)).clamp(0.0, 1.0)
}

/// How concentrated detected pitches are into a small number of pitch
/// classes (semitone bins mod 12), as a proxy for tonal/chordal focus.
pub fn chroma_concentration(mono: &[f32], sample_rate: u32) -> f32 {
    if mono.is_empty() || sample_rate == 0 {
        return 0.3;
    }
    let voiced: Vec<f32> = frame_pitches(mono, sample_rate).into_iter().flatten().collect();
    if voiced.is_empty() {
        return 0.3;
    }

    let mut bins = [0u32; 12];
    for f0 in &voiced {
        let midi = 69.0 + 12.0 * (f0 / 440.0).log2();
        let pitch_class = ((midi.round() as i32).rem_euclid(12)) as usize;
        bins[pitch_class] += 1;
    }

    let total: u32 = bins.iter().sum();
    if total == 0 {
        return 0.3;
    }
    let mut sorted = bins;
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    let top3: u32 = sorted[..3].iter().sum();
    (top3 as f32 / total as f32).clamp(0.0, 1.0)
}
