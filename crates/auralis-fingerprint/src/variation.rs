//! Variation over time (3D): loudness variation, dynamic range variation,
//! spectral flux.
//!
//! Ported from the teacher's `variation_analysis.rs`, which frames the
//! signal into fixed windows and measures the spread of a per-frame
//! metric across those windows. Spectral flux reuses `spectral.rs`'s
//! shared magnitude-spectrum computation per frame instead of a
//! time-domain metric, since it is defined frame-to-frame in frequency.

use crate::spectral::compute_spectrum;
use crate::util::{frame_analysis, peak, rms, std_dev};

const FRAME_S: f32 = 0.4;

/// Standard deviation of per-frame RMS loudness in dB, clipped to `[0, 10]`
/// per spec §4.2 ("loudness standard deviation in dB clipped to [0,10]").
pub fn loudness_variation(mono: &[f32], sample_rate: u32) -> f32 {
    if mono.is_empty() || sample_rate == 0 {
        return 1.0;
    }
    let frame_db: Vec<f32> = frame_analysis(mono, sample_rate, FRAME_S, rms)
        .into_iter()
        .map(|r| 20.0 * r.max(1e-9).log10())
        .collect();
    if frame_db.len() < 2 {
        return 1.0;
    }
    std_dev(&frame_db).clamp(0.0, 10.0)
}

/// Spread of frame-to-frame dynamic range (peak/RMS ratio in dB),
/// normalized against a 10 dB spread.
pub fn dynamic_range_variation(mono: &[f32], sample_rate: u32) -> f32 {
    if mono.is_empty() || sample_rate == 0 {
        return 0.2;
    }
    let frame_dr = frame_analysis(mono, sample_rate, FRAME_S, |frame| {
        let r = rms(frame);
        let p = peak(frame);
        if r < 1e-9 || p < 1e-9 {
            0.0
        } else {
            20.0 * (p / r).log10()
        }
    });
    if frame_dr.len() < 2 {
        return 0.2;
    }
    (std_dev(&frame_dr) / 10.0).clamp(0.0, 1.0)
}

/// Mean frame-to-frame spectral magnitude difference (spec §4.2's
/// "spectral flux"): each frame's magnitude spectrum is L1-normalized,
/// then the half-wave rectified difference against the previous frame's
/// normalized spectrum is averaged across all frame transitions. Near 0
/// for a static or slowly evolving spectrum, higher for rapidly changing
/// timbre or onsets.
pub fn spectral_flux(mono: &[f32], sample_rate: u32) -> f32 {
    if mono.is_empty() || sample_rate == 0 {
        return 0.2;
    }
    let frame_size = ((FRAME_S * sample_rate as f32) as usize).max(64);

    let mut previous: Option<Vec<f32>> = None;
    let mut flux_values = Vec::new();
    for chunk in mono.chunks(frame_size) {
        let Some(spectrum) = compute_spectrum(chunk, sample_rate) else {
            continue;
        };
        let total: f32 = spectrum.magnitudes.iter().sum::<f32>().max(1e-9);
        let normalized: Vec<f32> = spectrum.magnitudes.iter().map(|m| m / total).collect();

        if let Some(prev) = &previous {
            let n = normalized.len().min(prev.len());
            let diff: f32 = (0..n).map(|i| (normalized[i] - prev[i]).max(0.0)).sum();
            flux_values.push(diff);
        }
        previous = Some(normalized);
    }

    if flux_values.is_empty() {
        return 0.2;
    }
    let mean_flux = flux_values.iter().sum::<f32>() / flux_values.len() as f32;
    mean_flux.clamp(0.0, 1.0)
}
