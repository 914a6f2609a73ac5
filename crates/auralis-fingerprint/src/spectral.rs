//! Spectral shape (3D): centroid, rolloff, flatness.
//!
//! Ported from `auralis-dsp::spectral_features`. Operates on a magnitude
//! spectrum computed once and shared across all three metrics, rather
//! than the teacher's per-metric FFT, since the fingerprint extractor
//! needs the same spectrum for frequency-band analysis too.

use num_complex::Complex;
use rustfft::FftPlanner;
use std::f32::consts::PI;

pub struct Spectrum {
    pub magnitudes: Vec<f32>,
    pub bin_hz: f32,
}

pub fn compute_spectrum(mono: &[f32], sample_rate: u32) -> Option<Spectrum> {
    if mono.len() < 64 || sample_rate == 0 {
        return None;
    }

    let analysis_len = ((30.0 * sample_rate as f32) as usize).min(mono.len());
    let audio = &mono[..analysis_len];
    let fft_size = audio.len().next_power_of_two().min(1 << 16).max(64);

    let mut input: Vec<Complex<f32>> = vec![Complex { re: 0.0, im: 0.0 }; fft_size];
    let n = audio.len().min(fft_size) as f32;
    for (i, &s) in audio.iter().enumerate().take(fft_size) {
        let window = 0.5 * (1.0 - (2.0 * PI * i as f32 / n).cos());
        input[i].re = s * window;
    }

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(fft_size);
    fft.process(&mut input);

    let half = fft_size / 2;
    let magnitudes: Vec<f32> = input[..half].iter().map(|c| c.norm()).collect();
    let bin_hz = sample_rate as f32 / fft_size as f32;

    Some(Spectrum { magnitudes, bin_hz })
}

/// Centroid in Hz (spec §4.2: "spectral centroid (Hz)"), clamped to the
/// representable `[20, 20000]` audible span.
pub fn spectral_centroid(spectrum: &Spectrum) -> f32 {
    let total: f32 = spectrum.magnitudes.iter().sum();
    if total < 1e-9 {
        return 2000.0;
    }
    let weighted: f32 = spectrum
        .magnitudes
        .iter()
        .enumerate()
        .map(|(i, &m)| i as f32 * spectrum.bin_hz * m)
        .sum();
    (weighted / total).clamp(20.0, 20_000.0)
}

/// Frequency in Hz below which 85% of spectral energy is contained
/// (spec §4.2: "spectral rolloff (85th percentile, Hz)").
pub fn spectral_rolloff(spectrum: &Spectrum) -> f32 {
    let total: f32 = spectrum.magnitudes.iter().map(|m| m * m).sum();
    if total < 1e-9 {
        return 2000.0;
    }
    let threshold = total * 0.85;
    let mut cumulative = 0.0f32;
    for (i, &m) in spectrum.magnitudes.iter().enumerate() {
        cumulative += m * m;
        if cumulative >= threshold {
            return (i as f32 * spectrum.bin_hz).clamp(20.0, 20_000.0);
        }
    }
    20_000.0
}

/// Geometric mean over arithmetic mean of the magnitude spectrum: 0 is
/// tonal, 1 is noise-like.
pub fn spectral_flatness(spectrum: &Spectrum) -> f32 {
    let mags: Vec<f32> = spectrum.magnitudes.iter().map(|m| m.max(1e-9)).collect();
    if mags.is_empty() {
        return 0.0;
    }
    let log_sum: f32 = mags.iter().map(|m| m.ln()).sum();
    let geo_mean = (log_sum / mags.len() as f32).exp();
    let arith_mean: f32 = mags.iter().sum::<f32>() / mags.len() as f32;
    if arith_mean < 1e-9 {
        return 0.0;
    }
    (geo_mean / arith_mean).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pure_tone_has_low_flatness() {
        let sr = 44100u32;
        let audio: Vec<f32> = (0..sr as usize)
            .map(|i| (2.0 * PI * 1000.0 * i as f32 / sr as f32).sin() * 0.8)
            .collect();
        let spectrum = compute_spectrum(&audio, sr).unwrap();
        assert!(spectral_flatness(&spectrum) < 0.3);
    }

    #[test]
    fn high_frequency_tone_has_higher_centroid_than_low() {
        let sr = 44100u32;
        let low: Vec<f32> = (0..sr as usize)
            .map(|i| (2.0 * PI * 100.0 * i as f32 / sr as f32).sin() * 0.8)
            .collect();
        let high: Vec<f32> = (0..sr as usize)
            .map(|i| (2.0 * PI * 8000.0 * i as f32 / sr as f32).sin() * 0.8)
            .collect();
        let low_spec = compute_spectrum(&low, sr).unwrap();
        let high_spec = compute_spectrum(&high, sr).unwrap();
        assert!(spectral_centroid(&high_spec) > spectral_centroid(&low_spec));
    }

    #[test]
    fn rolloff_within_bounds() {
        let sr = 44100u32;
        let audio: Vec<f32> = (0..sr as usize).map(|i| (i as f32 * 0.37).sin() * 0.5).collect();
        let spectrum = compute_spectrum(&audio, sr).unwrap();
        let rolloff = spectral_rolloff(&spectrum);
        assert!((20.0..=20_000.0).contains(&rolloff));
    }

    #[test]
    fn empty_input_returns_none() {
        assert!(compute_spectrum(&[], 44100).is_none());
    }
}
