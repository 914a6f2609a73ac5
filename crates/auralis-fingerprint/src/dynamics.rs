//! Dynamics profile (3D): integrated loudness, crest factor, compression index.
//!
//! `estimate_lufs` follows the teacher's simplified (non-K-weighted)
//! approximation in `variation_analysis.rs`; the exact BS.1770 K-weighted
//! meter used for level matching during mastering lives in `auralis-dsp`,
//! which needs block-accurate gating this fingerprint-time estimate does not.

use crate::util::{peak, rms};

/// Simplified loudness estimate in LUFS, following the teacher's
/// `-0.691 + 10*log10(mean_square)` approximation (no K-weighting or gating).
pub fn estimate_lufs(mono: &[f32]) -> f32 {
    if mono.is_empty() {
        return -70.0;
    }
    let mean_square: f32 = mono.iter().map(|s| s * s).sum::<f32>() / mono.len() as f32;
    if mean_square < 1e-10 {
        return -70.0;
    }
    (-0.691 + 10.0 * mean_square.log10()).clamp(-70.0, 0.0)
}

/// Ratio of peak to RMS, in dB, clamped to a `[0, 30]` span typical of
/// unmastered-to-heavily-limited material (spec §4.2: "crest factor in dB").
pub fn crest_factor(mono: &[f32]) -> f32 {
    let r = rms(mono);
    let p = peak(mono);
    if r < 1e-9 || p < 1e-9 {
        return 10.0;
    }
    (20.0 * (p / r).log10()).clamp(0.0, 30.0)
}

/// Proxy for how much limiting/compression has already been applied:
/// the fraction of 50ms frames whose RMS is within 3 dB of the track's
/// overall peak RMS. Heavily compressed material hugs the peak; dynamic
/// material does not.
pub fn compression_index(mono: &[f32], sample_rate: u32) -> f32 {
    if mono.is_empty() || sample_rate == 0 {
        return 0.5;
    }
    let frame_size = ((0.05 * sample_rate as f32) as usize).max(1);
    let frame_rms: Vec<f32> = mono.chunks(frame_size).map(rms).collect();
    if frame_rms.is_empty() {
        return 0.5;
    }
    let peak_rms = frame_rms.iter().cloned().fold(0.0f32, f32::max);
    if peak_rms < 1e-9 {
        return 0.5;
    }
    let threshold = peak_rms * 10f32.powf(-3.0 / 20.0);
    let hugging = frame_rms.iter().filter(|&&v| v >= threshold).count();
    (hugging as f32 / frame_rms.len() as f32).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_has_floor_lufs() {
        let silence = vec![0.0f32; 44100];
        assert_eq!(estimate_lufs(&silence), -70.0);
    }

    #[test]
    fn louder_signal_has_higher_lufs() {
        let quiet = vec![0.05f32; 44100];
        let loud = vec![0.5f32; 44100];
        assert!(estimate_lufs(&loud) > estimate_lufs(&quiet));
    }

    #[test]
    fn constant_signal_has_near_zero_crest() {
        let dc = vec![0.5f32; 1000];
        assert!(crest_factor(&dc) < 1.0);
    }

    #[test]
    fn heavily_limited_signal_has_high_compression_index() {
        let slammed = vec![0.9f32; 44100];
        assert!(compression_index(&slammed, 44100) > 0.9);
    }
}
