//! Soft saturator: a stateless `tanh` waveshaper driven by
//! `target.saturation`. New relative to the teacher (it has no saturator),
//! grounded in the teacher's style of pure functions over audio slices
//! with no hidden allocation beyond the output buffer.
//!
//! `y = tanh(drive * x) / tanh(drive)` is monotonic and continuous in `x`
//! for any finite `drive > 0`, and normalizing by `tanh(drive)` keeps unity
//! input passing near-unity gain at low drive so `saturation = 0` is an
//! exact identity.

use auralis_pcm::AudioBlock;

use crate::stage::{sanitize, DspStage};
use crate::target::MasteringTarget;

/// Maps `target.saturation ∈ [0, 0.5]` to a `tanh` drive factor; 0.5 (the
/// saturation ceiling per §4.4) reaches a drive of 4, a noticeably warm
/// but not obviously distorted amount for program material.
fn drive_for(saturation: f32) -> f32 {
    1.0 + saturation.clamp(0.0, 0.5) * 6.0
}

#[inline]
fn shape(x: f32, drive: f32) -> f32 {
    if drive <= 1.0 + 1e-6 {
        return x;
    }
    (drive * x).tanh() / drive.tanh()
}

#[derive(Clone)]
pub struct SoftSaturator;

impl Default for SoftSaturator {
    fn default() -> Self {
        Self
    }
}

impl DspStage for SoftSaturator {
    fn process(&mut self, input: &AudioBlock, target: &MasteringTarget) -> AudioBlock {
        let (input, _warned) = sanitize(input);
        let drive = drive_for(target.saturation);
        if drive <= 1.0 + 1e-6 {
            return input;
        }
        let frames: Vec<(f32, f32)> =
            input.frames().iter().map(|&(l, r)| (shape(l, drive), shape(r, drive))).collect();
        AudioBlock::new(frames, input.sample_rate(), input.start_frame())
    }

    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_saturation_is_identity() {
        let mut sat = SoftSaturator;
        let input = AudioBlock::new(vec![(0.3, -0.6), (0.9, 0.1)], 44100, 0);
        let target = MasteringTarget::pass_through();
        let output = sat.process(&input, &target);
        assert_eq!(output.frames(), input.frames());
    }

    #[test]
    fn saturation_is_monotonic_and_bounded() {
        let drive = drive_for(0.5);
        let mut prev = shape(-1.0, drive);
        let mut x = -0.99;
        while x <= 1.0 {
            let y = shape(x, drive);
            assert!(y >= prev);
            assert!(y.abs() <= 1.0 + 1e-4);
            prev = y;
            x += 0.01;
        }
    }

    #[test]
    fn output_stays_finite_for_full_scale_input() {
        let mut sat = SoftSaturator;
        let mut target = MasteringTarget::pass_through();
        target.saturation = 0.5;
        let input = AudioBlock::new(vec![(1.0, -1.0); 1024], 44100, 0);
        let output = sat.process(&input, &target);
        assert!(output.is_finite());
    }
}
