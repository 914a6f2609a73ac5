//! Look-ahead true-peak limiter, generalizing the teacher's `limiter.rs`
//! `Limiter`: detection now oversamples via the teacher's zero-stuff +
//! moving-average approach (matching `true_peak_oversample`, default 4x),
//! and the per-block gain step is clamped to `MAX_GAIN_STEP_DB` since
//! §4.5.4 forbids limiter gain jumps greater than 3 dB.

use std::collections::VecDeque;

use auralis_pcm::AudioBlock;

use crate::envelope::EnvelopeFollower;
use crate::stage::{sanitize, DspStage};
use crate::target::MasteringTarget;

const MAX_GAIN_STEP_DB: f32 = 3.0;

#[derive(Clone)]
pub struct AdaptiveLimiter {
    sample_rate: u32,
    oversample_factor: usize,
    gain_smoother: EnvelopeFollower,
    lookahead: VecDeque<(f32, f32)>,
    lookahead_samples: usize,
    current_gain_db: f32,
}

impl AdaptiveLimiter {
    pub fn new(sample_rate: u32, lookahead_ms: f32, oversample_factor: usize) -> Self {
        let lookahead_samples = ((lookahead_ms.max(0.0) * 0.001 * sample_rate as f32) as usize).max(1);
        Self {
            sample_rate,
            oversample_factor: oversample_factor.max(1),
            gain_smoother: EnvelopeFollower::new(sample_rate, 0.1, 50.0),
            lookahead: VecDeque::with_capacity(lookahead_samples),
            lookahead_samples,
            current_gain_db: 0.0,
        }
    }

    /// Inter-sample ("true") peak estimate via zero-stuffed oversampling
    /// plus a moving-average anti-alias filter, as the teacher's
    /// `oversample`/`detect_isr_peaks` does; returns linear amplitude.
    fn true_peak(&self, mono: &[f32]) -> f32 {
        let factor = self.oversample_factor;
        if factor <= 1 || mono.len() < 2 {
            return mono.iter().map(|v| v.abs()).fold(0.0f32, f32::max);
        }

        let mut oversampled = vec![0.0f32; mono.len() * factor];
        for (i, &s) in mono.iter().enumerate() {
            oversampled[i * factor] = s;
        }

        let kernel = factor * 2 + 1;
        let mut peak = 0.0f32;
        for i in 0..oversampled.len() {
            let start = i.saturating_sub(kernel / 2);
            let end = (i + kernel / 2 + 1).min(oversampled.len());
            let avg = oversampled[start..end].iter().sum::<f32>() * factor as f32 / kernel as f32;
            peak = peak.max(avg.abs());
        }
        peak
    }
}

impl DspStage for AdaptiveLimiter {
    fn process(&mut self, input: &AudioBlock, target: &MasteringTarget) -> AudioBlock {
        let (input, _warned) = sanitize(input);
        if input.is_empty() {
            return input;
        }

        let ceiling_db = target.max_true_peak_db.min(0.0);
        let ceiling_linear = 10f32.powf(ceiling_db / 20.0);

        let mono: Vec<f32> = input.frames().iter().map(|&(l, r)| l.abs().max(r.abs())).collect();
        let peak = self.true_peak(&mono).max(1e-10);

        let required_gain_db = if peak > ceiling_linear { 20.0 * (ceiling_linear / peak).log10() } else { 0.0 };

        // Smooth toward the target reduction, then clamp the step so no
        // single block can jump the applied gain by more than 3 dB.
        let smoothed = self.gain_smoother.process(required_gain_db);
        let step = (smoothed - self.current_gain_db).clamp(-MAX_GAIN_STEP_DB, MAX_GAIN_STEP_DB);
        self.current_gain_db += step;
        let gain = 10f32.powf(self.current_gain_db / 20.0);

        let mut frames = Vec::with_capacity(input.frame_count());
        for &(l, r) in input.frames() {
            self.lookahead.push_back((l, r));
            let (dl, dr) = if self.lookahead.len() > self.lookahead_samples {
                self.lookahead.pop_front().unwrap()
            } else {
                (0.0, 0.0)
            };
            frames.push((dl * gain, dr * gain));
        }

        AudioBlock::new(frames, input.sample_rate(), input.start_frame())
    }

    fn reset(&mut self) {
        self.gain_smoother.reset();
        self.lookahead.clear();
        self.current_gain_db = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target_with_ceiling(db: f32) -> MasteringTarget {
        let mut target = MasteringTarget::pass_through();
        target.max_true_peak_db = db;
        target
    }

    #[test]
    fn preserves_frame_count() {
        let mut limiter = AdaptiveLimiter::new(44100, 5.0, 4);
        let input = AudioBlock::new(vec![(0.2, 0.2); 4096], 44100, 0);
        let output = limiter.process(&input, &target_with_ceiling(-0.3));
        assert_eq!(output.frame_count(), input.frame_count());
    }

    #[test]
    fn hot_signal_is_brought_under_ceiling() {
        let sample_rate = 44100;
        let mut limiter = AdaptiveLimiter::new(sample_rate, 5.0, 4);
        let target = target_with_ceiling(-0.3);
        let input = AudioBlock::new(vec![(1.2, -1.2); sample_rate as usize], sample_rate, 0);

        let mut last = input.clone();
        for _ in 0..20 {
            last = limiter.process(&last, &target);
        }
        let ceiling_linear = 10f32.powf((-0.3f32 + 0.05) / 20.0);
        assert!(last.peak_linear() <= ceiling_linear * 1.05);
    }

    #[test]
    fn gain_step_between_blocks_is_bounded() {
        let sample_rate = 44100;
        let mut limiter = AdaptiveLimiter::new(sample_rate, 5.0, 4);
        let target = target_with_ceiling(-0.3);
        let quiet = AudioBlock::new(vec![(0.01, 0.01); sample_rate as usize / 10], sample_rate, 0);
        let loud = AudioBlock::new(vec![(1.5, -1.5); sample_rate as usize / 10], sample_rate, 0);

        limiter.process(&quiet, &target);
        let before = limiter.current_gain_db;
        limiter.process(&loud, &target);
        let after = limiter.current_gain_db;
        assert!((after - before).abs() <= MAX_GAIN_STEP_DB + 1e-3);
    }
}
