//! Final gain stage: converges the session's integrated loudness to
//! `target.target_lufs` over time, capped at ±0.25 dB correction per block
//! per §4.5.5. New relative to the teacher (no LUFS meter existed there);
//! grounded in the teacher's K-weighting-adjacent biquad building blocks
//! (`biquad_filter.rs`'s shelf/high-pass coefficient formulas), reused here
//! for a proper BS.1770-style pre-filter instead of the fingerprint
//! extractor's unweighted approximation.

use auralis_pcm::AudioBlock;

use crate::biquad::{BiquadCascade, BiquadCoeffs};
use crate::stage::{sanitize, DspStage};
use crate::target::MasteringTarget;

const MAX_CORRECTION_DB: f32 = 0.25;
/// BS.1770 stage 1 (high-shelf) + stage 2 (high-pass, "RLB" weighting).
const SHELF_CORNER_HZ: f64 = 1500.0;
const SHELF_GAIN_DB: f64 = 4.0;
const HIGHPASS_HZ: f64 = 38.0;

#[derive(Clone)]
pub struct LevelMatcher {
    k_weight: [BiquadCascade; 2],
    sum_sq: f64,
    sample_count: u64,
    applied_gain_db: f32,
}

impl LevelMatcher {
    pub fn new(sample_rate: u32) -> Self {
        let coeffs = vec![
            BiquadCoeffs::high_shelf(sample_rate as f64, SHELF_CORNER_HZ, SHELF_GAIN_DB),
            BiquadCoeffs::highpass(sample_rate as f64, HIGHPASS_HZ, 0.5),
        ];
        Self {
            k_weight: [BiquadCascade::new(coeffs.clone()), BiquadCascade::new(coeffs)],
            sum_sq: 0.0,
            sample_count: 0,
            applied_gain_db: 0.0,
        }
    }

    /// The session's integrated loudness estimate of the *output* signal
    /// (input energy seen so far, plus whatever gain has been applied),
    /// in LUFS. `-70.0` before any audio has been measured.
    pub fn integrated_output_lufs(&self) -> f32 {
        if self.sample_count == 0 || self.sum_sq <= 0.0 {
            return -70.0;
        }
        let mean_square = self.sum_sq / self.sample_count as f64;
        (-0.691 + 10.0 * mean_square.log10()) as f32 + self.applied_gain_db
    }
}

impl DspStage for LevelMatcher {
    fn process(&mut self, input: &AudioBlock, target: &MasteringTarget) -> AudioBlock {
        let (input, _warned) = sanitize(input);
        if input.is_empty() {
            return input;
        }

        for &(l, r) in input.frames() {
            let kl = self.k_weight[0].process_sample(0, l as f64);
            let kr = self.k_weight[1].process_sample(0, r as f64);
            self.sum_sq += kl * kl + kr * kr;
            self.sample_count += 2;
        }

        let measured = self.integrated_output_lufs();
        let error_db = target.target_lufs - measured;
        let correction = error_db.clamp(-MAX_CORRECTION_DB, MAX_CORRECTION_DB);
        self.applied_gain_db += correction;

        let gain = 10f32.powf(self.applied_gain_db / 20.0);
        let frames: Vec<(f32, f32)> = input.frames().iter().map(|&(l, r)| (l * gain, r * gain)).collect();
        AudioBlock::new(frames, input.sample_rate(), input.start_frame())
    }

    fn reset(&mut self) {
        for cascade in &mut self.k_weight {
            cascade.reset();
        }
        self.sum_sq = 0.0;
        self.sample_count = 0;
        self.applied_gain_db = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target_lufs(lufs: f32) -> MasteringTarget {
        let mut target = MasteringTarget::pass_through();
        target.target_lufs = lufs;
        target
    }

    #[test]
    fn preserves_frame_count_and_finiteness() {
        let mut matcher = LevelMatcher::new(44100);
        let input = AudioBlock::new(vec![(0.1, 0.1); 4096], 44100, 0);
        let output = matcher.process(&input, &target_lufs(-14.0));
        assert_eq!(output.frame_count(), input.frame_count());
        assert!(output.is_finite());
    }

    #[test]
    fn per_block_correction_is_capped() {
        let mut matcher = LevelMatcher::new(44100);
        // Very quiet input against a loud target: first block should only
        // move by the capped amount, not jump straight to target.
        let input = AudioBlock::new(vec![(0.001, 0.001); 44100], 44100, 0);
        matcher.process(&input, &target_lufs(-8.0));
        assert!(matcher.applied_gain_db.abs() <= MAX_CORRECTION_DB + 1e-4);
    }

    #[test]
    fn converges_toward_target_over_many_blocks() {
        let sample_rate = 44100u32;
        let mut matcher = LevelMatcher::new(sample_rate);
        let target = target_lufs(-14.0);
        let block = AudioBlock::new(vec![(0.1, 0.1); sample_rate as usize], sample_rate, 0);

        let mut last_measured = matcher.integrated_output_lufs();
        for _ in 0..400 {
            matcher.process(&block, &target);
            last_measured = matcher.integrated_output_lufs();
        }
        assert!((last_measured - target.target_lufs).abs() < 1.0);
    }
}
