//! 26-band critical-band (Bark-scale) EQ, generalizing the teacher's
//! `biquad_filter.rs` `MultiBandEQ` (a fixed 3-band peaking cascade) to the
//! full band table in [`crate::target`].
//!
//! Each band is one peaking biquad per channel; bands run in parallel (not
//! cascaded in series) and their outputs are summed, since a series cascade
//! of 26 peaking filters would compound Q and smear phase well past the
//! ≤2 ms group-delay budget in §4.5.1. Gains move toward the target at a
//! one-pole rate with a time constant of [`GAIN_SMOOTH_TIME_CONSTANT_MS`]
//! (≥ 50 ms per spec) so a preset change never steps the filter response.

use auralis_pcm::AudioBlock;

use crate::biquad::{BiquadCascade, BiquadCoeffs};
use crate::stage::{sanitize, DspStage};
use crate::target::{bark_band_centers_hz, MasteringTarget, N_BANDS};

pub const GAIN_SMOOTH_TIME_CONSTANT_MS: f32 = 60.0;

/// Fixed Q for every band; the band table's log spacing already keeps
/// adjacent bands from overlapping destructively at this Q.
const BAND_Q: f64 = 1.4;

#[derive(Clone)]
pub struct CriticalBandEq {
    sample_rate: u32,
    centers_hz: [f32; N_BANDS],
    current_gain_db: [f32; N_BANDS],
    smoothing_coeff: f32,
    cascades: [BiquadCascade; N_BANDS],
}

impl CriticalBandEq {
    pub fn new(sample_rate: u32) -> Self {
        let centers_hz = bark_band_centers_hz();
        let cascades = std::array::from_fn(|i| {
            let coeffs = BiquadCoeffs::peaking(sample_rate as f64, centers_hz[i] as f64, BAND_Q, 0.0);
            BiquadCascade::new(vec![coeffs])
        });
        Self {
            sample_rate,
            centers_hz,
            current_gain_db: [0.0; N_BANDS],
            smoothing_coeff: smoothing_coeff(sample_rate, GAIN_SMOOTH_TIME_CONSTANT_MS),
            cascades,
        }
    }
}

fn smoothing_coeff(sample_rate: u32, time_constant_ms: f32) -> f32 {
    let time_samples = (time_constant_ms * 0.001 * sample_rate.max(1) as f32).max(1.0);
    (-1.0 / time_samples).exp()
}

impl DspStage for CriticalBandEq {
    fn process(&mut self, input: &AudioBlock, target: &MasteringTarget) -> AudioBlock {
        let (input, _warned) = sanitize(input);
        if input.is_empty() {
            return input;
        }

        let mut frames = Vec::with_capacity(input.frame_count());
        for &(l, r) in input.frames() {
            let mut out_l = 0.0f64;
            let mut out_r = 0.0f64;
            for band in 0..N_BANDS {
                let target_gain = target.eq_gains_db[band].clamp(-8.0, 8.0);
                self.current_gain_db[band] =
                    target_gain + (self.current_gain_db[band] - target_gain) * self.smoothing_coeff;

                let coeffs = BiquadCoeffs::peaking(
                    self.sample_rate as f64,
                    self.centers_hz[band] as f64,
                    BAND_Q,
                    self.current_gain_db[band] as f64,
                );
                self.cascades[band].retune(vec![coeffs]);

                out_l += self.cascades[band].process_sample(0, l as f64) - l as f64;
                out_r += self.cascades[band].process_sample(1, r as f64) - r as f64;
            }
            // Parallel band contributions are deviations from flat
            // response, summed back onto the dry sample (each band
            // passes its own input through unchanged at 0 dB gain, so
            // subtracting the dry sample isolates that band's boost/cut).
            frames.push(((l as f64 + out_l) as f32, (r as f64 + out_r) as f32));
        }

        AudioBlock::new(frames, input.sample_rate(), input.start_frame())
    }

    fn reset(&mut self) {
        for cascade in &mut self.cascades {
            cascade.reset();
        }
        self.current_gain_db = [0.0; N_BANDS];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_target() -> MasteringTarget {
        MasteringTarget::pass_through()
    }

    #[test]
    fn flat_target_preserves_frame_count() {
        let mut eq = CriticalBandEq::new(44100);
        let input = AudioBlock::new(vec![(0.1, -0.1); 2048], 44100, 0);
        let output = eq.process(&input, &flat_target());
        assert_eq!(output.frame_count(), input.frame_count());
        assert!(output.is_finite());
    }

    #[test]
    fn boosting_a_band_increases_energy_at_that_frequency() {
        let sample_rate = 44100;
        let mut eq = CriticalBandEq::new(sample_rate);
        let mut target = flat_target();
        let centers = bark_band_centers_hz();
        let boosted_band = N_BANDS / 2;
        target.eq_gains_db[boosted_band] = 6.0;

        // Warm up the smoother across several blocks so the gain has
        // mostly converged, then measure.
        let freq = centers[boosted_band];
        let tone = |n: usize, start: usize| -> AudioBlock {
            let frames: Vec<(f32, f32)> = (0..n)
                .map(|i| {
                    let t = (start + i) as f32 / sample_rate as f32;
                    let s = (2.0 * std::f32::consts::PI * freq * t).sin() * 0.2;
                    (s, s)
                })
                .collect();
            AudioBlock::new(frames, sample_rate, start as u64)
        };

        let mut flat_eq = CriticalBandEq::new(sample_rate);
        let mut flat_output_rms = 0.0f32;
        let mut boosted_output_rms = 0.0f32;
        for block_idx in 0..20 {
            let block = tone(4096, block_idx * 4096);
            let flat_out = flat_eq.process(&block, &flat_target());
            let boosted_out = eq.process(&block, &target);
            flat_output_rms = flat_out.rms_linear();
            boosted_output_rms = boosted_out.rms_linear();
        }
        assert!(boosted_output_rms > flat_output_rms);
    }

    #[test]
    fn reset_zeroes_smoothed_gain_state() {
        let mut eq = CriticalBandEq::new(44100);
        let mut target = flat_target();
        target.eq_gains_db[0] = 8.0;
        let input = AudioBlock::new(vec![(0.1, 0.1); 4096], 44100, 0);
        eq.process(&input, &target);
        assert!(eq.current_gain_db[0] != 0.0);
        eq.reset();
        assert_eq!(eq.current_gain_db[0], 0.0);
    }
}
