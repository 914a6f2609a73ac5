//! The shared shape every DSP stage implements (spec §4.5, §9's "capability
//! set... composed at construction time").

use auralis_pcm::AudioBlock;

use crate::target::MasteringTarget;

/// A stateful block processor. `process` must preserve frame count, never
/// mutate `input`, and never panic on non-finite samples (substitute
/// silence and let the caller surface a warning instead).
pub trait DspStage {
    fn process(&mut self, input: &AudioBlock, target: &MasteringTarget) -> AudioBlock;

    /// Resets all persistent state to a safe baseline. Called on session
    /// seek so the next chunk does not inherit stale envelope/filter state
    /// from distant audio.
    fn reset(&mut self);
}

/// Replaces any non-finite frame in `block` with silence, returning
/// whether a substitution happened (the caller sets the session warning
/// flag when it did).
pub fn sanitize(block: &AudioBlock) -> (AudioBlock, bool) {
    if block.is_finite() {
        return (block.clone(), false);
    }
    let sanitized: Vec<(f32, f32)> = block
        .frames()
        .iter()
        .map(|&(l, r)| if l.is_finite() && r.is_finite() { (l, r) } else { (0.0, 0.0) })
        .collect();
    (AudioBlock::new(sanitized, block.sample_rate(), block.start_frame()), true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_passes_through_finite_blocks_unchanged() {
        let block = AudioBlock::new(vec![(0.1, -0.2), (0.3, 0.4)], 44100, 0);
        let (out, replaced) = sanitize(&block);
        assert!(!replaced);
        assert_eq!(out.frames(), block.frames());
    }

    #[test]
    fn sanitize_zeroes_non_finite_frames() {
        let block = AudioBlock::new(vec![(f32::NAN, 0.0), (0.2, f32::INFINITY)], 44100, 0);
        let (out, replaced) = sanitize(&block);
        assert!(replaced);
        assert_eq!(out.frames(), &[(0.0, 0.0), (0.0, 0.0)]);
    }
}
