//! Temporal characteristics (4D): tempo estimate, onset density,
//! percussive/harmonic ratio, transient sharpness.
//!
//! Onset detection follows the teacher's spectral-flux `OnsetDetector`
//! in `onset_detector.rs`: half-wave rectified frame-to-frame magnitude
//! increase, peak-picked above a local mean threshold.

use crate::spectral::compute_spectrum;

const HOP_S: f32 = 0.01;
const FRAME_S: f32 = 0.04;

struct OnsetTrack {
    onset_times_s: Vec<f32>,
    flux: Vec<f32>,
}

fn detect_onsets(mono: &[f32], sample_rate: u32) -> OnsetTrack {
    let hop = ((HOP_S * sample_rate as f32) as usize).max(1);
    let frame = ((FRAME_S * sample_rate as f32) as usize).max(hop);

    let mut prev_spectrum: Option<Vec<f32>> = None;
    let mut flux = Vec::new();
    let mut start = 0usize;
    while start + frame <= mono.len() {
        let chunk = &mono[start..start + frame];
        if let Some(spectrum) = compute_spectrum(chunk, sample_rate) {
            if let Some(prev) = &prev_spectrum {
                let sum: f32 = spectrum
                    .magnitudes
                    .iter()
                    .zip(prev.iter())
                    .map(|(&cur, &p)| (cur - p).max(0.0))
                    .sum();
                flux.push(sum);
            } else {
                flux.push(0.0);
            }
            prev_spectrum = Some(spectrum.magnitudes);
        } else {
            flux.push(0.0);
        }
        start += hop;
    }

    if flux.is_empty() {
        return OnsetTrack { onset_times_s: Vec::new(), flux };
    }

    let mean: f32 = flux.iter().sum::<f32>() / flux.len() as f32;
    let std: f32 = {
        let var: f32 = flux.iter().map(|f| (f - mean).powi(2)).sum::<f32>() / flux.len() as f32;
        var.sqrt()
    };
    let threshold = mean + std * 0.5;

    let mut onset_times_s = Vec::new();
    for i in 1..flux.len().saturating_sub(1) {
        if flux[i] > threshold && flux[i] >= flux[i - 1] && flux[i] >= flux[i + 1] {
            onset_times_s.push(i as f32 * HOP_S);
        }
    }

    OnsetTrack { onset_times_s, flux }
}

/// Onsets per second (spec §4.2: "onset density per second"), clamped to a
/// practical `[0, 20]` dense upper bound.
pub fn onset_density(mono: &[f32], sample_rate: u32) -> f32 {
    if mono.is_empty() || sample_rate == 0 {
        return 2.0;
    }
    let duration_s = mono.len() as f32 / sample_rate as f32;
    if duration_s < 1.0 {
        return 2.0;
    }
    let track = detect_onsets(mono, sample_rate);
    let rate = track.onset_times_s.len() as f32 / duration_s;
    rate.clamp(0.0, 20.0)
}

/// Estimated tempo in BPM from inter-onset intervals, clipped to `[40, 200]`
/// per spec §4.2.
pub fn tempo_estimate(mono: &[f32], sample_rate: u32) -> f32 {
    if mono.is_empty() || sample_rate == 0 {
        return 120.0;
    }
    let track = detect_onsets(mono, sample_rate);
    if track.onset_times_s.len() < 4 {
        return 120.0;
    }
    let mut intervals: Vec<f32> = track
        .onset_times_s
        .windows(2)
        .map(|w| w[1] - w[0])
        .filter(|&d| d > 0.1 && d < 2.0)
        .collect();
    if intervals.is_empty() {
        return 120.0;
    }
    intervals.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let median = intervals[intervals.len() / 2];
    if median < 1e-6 {
        return 120.0;
    }
    let mut bpm = 60.0 / median;
    // Octave-correct into the musically common range before clipping, so a
    // detector locking onto eighth-notes or half-notes still lands sanely.
    while bpm < 40.0 {
        bpm *= 2.0;
    }
    while bpm > 200.0 {
        bpm /= 2.0;
    }
    bpm.clamp(40.0, 200.0)
}

/// Fraction of total spectral flux concentrated at onsets, as a proxy
/// for percussive (transient-dominated) vs. harmonic (sustained) content.
pub fn percussive_ratio(mono: &[f32], sample_rate: u32) -> f32 {
    if mono.is_empty() || sample_rate == 0 {
        return 0.5;
    }
    let track = detect_onsets(mono, sample_rate);
    let total: f32 = track.flux.iter().sum();
    if total < 1e-9 {
        return 0.5;
    }
    let hop = ((HOP_S * sample_rate as f32) as usize).max(1);
    let onset_bins: Vec<usize> = track
        .onset_times_s
        .iter()
        .map(|&t| (t / HOP_S) as usize)
        .collect();
    let window = (0.03 / HOP_S).ceil() as usize;
    let mut near_onset_energy = 0.0f32;
    for &bin in &onset_bins {
        let lo = bin.saturating_sub(window);
        let hi = (bin + window).min(track.flux.len());
        near_onset_energy += track.flux[lo..hi].iter().sum::<f32>();
    }
    let _ = hop;
    (near_onset_energy / total).clamp(0.0, 1.0)
}

/// Mean attack time of detected onsets (time from flux rise to local
/// flux peak), normalized so sharper transients yield values near 1.0.
pub fn transient_sharpness(mono: &[f32], sample_rate: u32) -> f32 {
    if mono.is_empty() || sample_rate == 0 {
        return 0.5;
    }
    let track = detect_onsets(mono, sample_rate);
    if track.onset_times_s.is_empty() {
        return 0.5;
    }
    let onset_bins: Vec<usize> = track
        .onset_times_s
        .iter()
        .map(|&t| (t / HOP_S) as usize)
        .collect();

    let mut rise_times = Vec::new();
    for &bin in &onset_bins {
        let mut j = bin;
        while j > 0 && track.flux[j - 1] < track.flux[j] {
            j -= 1;
        }
        rise_times.push((bin - j) as f32 * HOP_S);
    }

    let mean_rise = rise_times.iter().sum::<f32>() / rise_times.len() as f32;
    (1.0 - (mean_rise / 0.1).clamp(0.0, 1.0)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn click_track(sr: u32, bpm: f32, duration_s: f32) -> Vec<f32> {
        let n = (duration_s * sr as f32) as usize;
        let mut signal = vec![0.0f32; n];
        let interval_s = 60.0 / bpm;
        let mut t = 0.0f32;
        while (t * sr as f32) as usize < n {
            let start = (t * sr as f32) as usize;
            for k in 0..200.min(n - start) {
                signal[start + k] = (1.0 - k as f32 / 200.0) * (2.0 * PI * 2000.0 * k as f32 / sr as f32).sin();
            }
            t += interval_s;
        }
        signal
    }

    #[test]
    fn silence_has_low_onset_density() {
        let silence = vec![0.0f32; 44100 * 2];
        assert!(onset_density(&silence, 44100) < 0.2);
    }

    #[test]
    fn click_track_has_nonzero_onset_density() {
        let clicks = click_track(44100, 120.0, 4.0);
        assert!(onset_density(&clicks, 44100) > 0.0);
    }

    #[test]
    fn tempo_estimate_within_bounds() {
        let clicks = click_track(44100, 120.0, 6.0);
        let t = tempo_estimate(&clicks, 44100);
        assert!((40.0..=200.0).contains(&t));
    }

    #[test]
    fn short_input_returns_fallback() {
        assert_eq!(onset_density(&[0.1; 100], 44100), 2.0);
    }
}
