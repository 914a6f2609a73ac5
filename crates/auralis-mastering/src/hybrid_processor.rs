//! Thin orchestrator (spec §4.6): holds one instance of each DSP stage's
//! persistent state for a session plus the current `MasteringTarget`, runs
//! the stage chain, then mixes dry and wet with an equal-power crossfade
//! so `intensity = 0.5` shows no amplitude dip.

use auralis_dsp::{AdaptiveCompressor, AdaptiveLimiter, CriticalBandEq, DspStage, LevelMatcher, MasteringTarget, SoftSaturator};
use auralis_pcm::AudioBlock;

pub struct HybridProcessor {
    eq: CriticalBandEq,
    compressor: AdaptiveCompressor,
    saturator: SoftSaturator,
    limiter: AdaptiveLimiter,
    level_matcher: LevelMatcher,
    target: MasteringTarget,
    transition: Option<Transition>,
}

/// A frozen copy of the stage chain as it stood right before a target
/// switch, kept alive only for the gain-smoothing corridor so the
/// outgoing target's processing can still be faded out rather than cut.
struct Transition {
    previous: StageChain,
    corridor_frames_total: u64,
    corridor_frames_remaining: u64,
}

#[derive(Clone)]
struct StageChain {
    eq: CriticalBandEq,
    compressor: AdaptiveCompressor,
    saturator: SoftSaturator,
    limiter: AdaptiveLimiter,
    level_matcher: LevelMatcher,
    target: MasteringTarget,
}

impl StageChain {
    fn process_wet(&mut self, input: &AudioBlock) -> AudioBlock {
        run_chain(&mut self.eq, &mut self.compressor, &mut self.saturator, &mut self.limiter, &mut self.level_matcher, input, &self.target)
    }
}

fn run_chain(
    eq: &mut CriticalBandEq,
    compressor: &mut AdaptiveCompressor,
    saturator: &mut SoftSaturator,
    limiter: &mut AdaptiveLimiter,
    level_matcher: &mut LevelMatcher,
    input: &AudioBlock,
    target: &MasteringTarget,
) -> AudioBlock {
    let after_eq = eq.process(input, target);
    let after_comp = compressor.process(&after_eq, target);
    let after_sat = saturator.process(&after_comp, target);
    let after_limit = limiter.process(&after_sat, target);
    level_matcher.process(&after_limit, target)
}

impl HybridProcessor {
    pub fn new(sample_rate: u32) -> Self {
        Self::with_oversample(sample_rate, 4)
    }

    pub fn with_oversample(sample_rate: u32, true_peak_oversample: usize) -> Self {
        Self {
            eq: CriticalBandEq::new(sample_rate),
            compressor: AdaptiveCompressor::new(sample_rate, 0.0),
            saturator: SoftSaturator,
            limiter: AdaptiveLimiter::new(sample_rate, 5.0, true_peak_oversample),
            level_matcher: LevelMatcher::new(sample_rate),
            target: MasteringTarget::pass_through(),
            transition: None,
        }
    }

    /// Atomically swaps the active target with no gain-smoothing corridor.
    /// Each stage still interpolates its own internal parameters toward
    /// the new target at its own (much shorter) time constant. Used for
    /// the initial target assignment on load/seek, where there is no
    /// prior output to fade from.
    pub fn set_target(&mut self, target: MasteringTarget) {
        self.target = target;
        self.transition = None;
    }

    /// Swaps the active target the way [`Self::set_target`] does, but
    /// additionally keeps a frozen copy of the outgoing stage chain alive
    /// for `corridor_frames` and cross-fades its output into the new
    /// chain's output across that window (spec §4.7: a dedicated
    /// gain-smoothing corridor of at least the crossfade duration, to mask
    /// any residual discontinuity beyond what per-stage smoothing already
    /// covers). A no-op transition (`target` unchanged) starts no corridor.
    pub fn set_target_with_corridor(&mut self, target: MasteringTarget, corridor_frames: u64) {
        if target == self.target {
            return;
        }
        let previous = StageChain {
            eq: self.eq.clone(),
            compressor: self.compressor.clone(),
            saturator: self.saturator.clone(),
            limiter: self.limiter.clone(),
            level_matcher: self.level_matcher.clone(),
            target: self.target,
        };
        let corridor_frames = corridor_frames.max(1);
        self.transition = Some(Transition { previous, corridor_frames_total: corridor_frames, corridor_frames_remaining: corridor_frames });
        self.target = target;
    }

    pub fn target(&self) -> &MasteringTarget {
        &self.target
    }

    /// Runs the full stage chain to produce a wet block, then returns the
    /// equal-power mix of `input` and `wet` at the given intensity.
    /// `intensity = 0.0` returns the input unchanged (the dry round-trip
    /// law in spec §8); `intensity = 1.0` returns the fully wet block.
    pub fn process(&mut self, input: AudioBlock, intensity: f32) -> AudioBlock {
        let intensity = intensity.clamp(0.0, 1.0);

        let new_wet = run_chain(&mut self.eq, &mut self.compressor, &mut self.saturator, &mut self.limiter, &mut self.level_matcher, &input, &self.target);

        let wet = match self.transition.as_mut() {
            Some(transition) => {
                let old_wet = transition.previous.process_wet(&input);
                let frame_count = input.frame_count() as u64;
                let weights = corridor_ramp(transition.corridor_frames_total, transition.corridor_frames_remaining, frame_count);
                transition.corridor_frames_remaining = transition.corridor_frames_remaining.saturating_sub(frame_count);
                let mixed = ramp_mix(&old_wet, &new_wet, &weights);
                if transition.corridor_frames_remaining == 0 {
                    self.transition = None;
                }
                mixed
            }
            None => new_wet,
        };

        mix(&input, &wet, intensity)
    }

    /// Resets every stage's persistent state to a safe baseline. Used on
    /// session seek so the next chunk does not inherit envelope/filter
    /// state from distant audio. Drops any in-flight corridor: a seek
    /// has no continuous output to smooth across.
    pub fn reset(&mut self) {
        self.eq.reset();
        self.compressor.reset();
        self.saturator.reset();
        self.limiter.reset();
        self.level_matcher.reset();
        self.transition = None;
    }
}

/// Per-frame corridor progress, from just past where the previous block
/// left off up to (and possibly past, clamped) the corridor's end. `0.0`
/// weights the outgoing chain fully, `1.0` the incoming chain fully.
fn corridor_ramp(total: u64, remaining_before: u64, frame_count: u64) -> Vec<f32> {
    let elapsed_before = total - remaining_before;
    (0..frame_count)
        .map(|i| ((elapsed_before + i + 1) as f32 / total as f32).clamp(0.0, 1.0))
        .collect()
}

/// Per-frame equal-power mix between an outgoing and incoming wet block,
/// weighted by `weights[i]` (0 = fully outgoing, 1 = fully incoming).
fn ramp_mix(outgoing: &AudioBlock, incoming: &AudioBlock, weights: &[f32]) -> AudioBlock {
    let frames: Vec<(f32, f32)> = outgoing
        .frames()
        .iter()
        .zip(incoming.frames().iter())
        .zip(weights.iter())
        .map(|((&(ol, or_), &(il, ir)), &w)| {
            let theta = w * std::f32::consts::FRAC_PI_2;
            let out_gain = theta.cos();
            let in_gain = theta.sin();
            (ol * out_gain + il * in_gain, or_ * out_gain + ir * in_gain)
        })
        .collect();
    AudioBlock::new(frames, outgoing.sample_rate(), outgoing.start_frame())
}

/// Equal-power crossfade between `dry` and `wet`, frame for frame. Using
/// `sin`/`cos` weights (rather than linear) keeps total signal power
/// constant across the intensity range, avoiding the amplitude dip a
/// linear mix would show at `intensity = 0.5`.
fn mix(dry: &AudioBlock, wet: &AudioBlock, intensity: f32) -> AudioBlock {
    if intensity <= 0.0 {
        return dry.clone();
    }
    if intensity >= 1.0 {
        return wet.clone();
    }

    let theta = intensity * std::f32::consts::FRAC_PI_2;
    let dry_gain = theta.cos();
    let wet_gain = theta.sin();

    let frames: Vec<(f32, f32)> = dry
        .frames()
        .iter()
        .zip(wet.frames().iter())
        .map(|(&(dl, dr), &(wl, wr))| (dl * dry_gain + wl * wet_gain, dr * dry_gain + wr * wet_gain))
        .collect();
    AudioBlock::new(frames, dry.sample_rate(), dry.start_frame())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target_generator;
    use crate::Preset;
    use auralis_fingerprint::Fingerprint;

    fn tone(sample_rate: u32, seconds: f32) -> AudioBlock {
        let n = (sample_rate as f32 * seconds) as usize;
        let frames: Vec<(f32, f32)> = (0..n)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                let s = (2.0 * std::f32::consts::PI * 300.0 * t).sin() * 0.4;
                (s, s)
            })
            .collect();
        AudioBlock::new(frames, sample_rate, 0)
    }

    #[test]
    fn zero_intensity_returns_input_unchanged() {
        let sample_rate = 44100;
        let mut processor = HybridProcessor::new(sample_rate);
        let fp = Fingerprint::from_vec25(std::array::from_fn(|i| (i as f32 * 0.03).min(0.9)));
        processor.set_target(target_generator::generate(&fp, Preset::Adaptive));

        let input = tone(sample_rate, 0.5);
        let output = processor.process(input.clone(), 0.0);
        assert_eq!(output.frames(), input.frames());
    }

    #[test]
    fn full_intensity_preserves_frame_count_and_is_finite() {
        let sample_rate = 44100;
        let mut processor = HybridProcessor::new(sample_rate);
        let fp = Fingerprint::from_vec25(std::array::from_fn(|i| (i as f32 * 0.03).min(0.9)));
        processor.set_target(target_generator::generate(&fp, Preset::Adaptive));

        let input = tone(sample_rate, 0.5);
        let output = processor.process(input.clone(), 1.0);
        assert_eq!(output.frame_count(), input.frame_count());
        assert!(output.is_finite());
    }

    #[test]
    fn corridor_holds_transition_open_until_exhausted() {
        let sample_rate = 44100;
        let mut processor = HybridProcessor::new(sample_rate);
        let gentle = target_generator::generate(&Fingerprint::from_vec25([0.2; 25]), Preset::Gentle);
        let punchy = target_generator::generate(&Fingerprint::from_vec25([0.7; 25]), Preset::Punchy);
        processor.set_target(gentle);

        let corridor_frames = (sample_rate as u64) * 2;
        processor.set_target_with_corridor(punchy, corridor_frames);
        assert!(processor.transition.is_some());

        let chunk = tone(sample_rate, 1.0);
        processor.process(chunk.clone(), 1.0);
        assert!(processor.transition.is_some(), "corridor should still be open after 1 of 2 seconds");

        processor.process(chunk, 1.0);
        assert!(processor.transition.is_none(), "corridor should close once its frame budget is spent");
    }

    #[test]
    fn corridor_output_is_finite_and_preserves_frame_count() {
        let sample_rate = 44100;
        let mut processor = HybridProcessor::new(sample_rate);
        let gentle = target_generator::generate(&Fingerprint::from_vec25([0.2; 25]), Preset::Gentle);
        let punchy = target_generator::generate(&Fingerprint::from_vec25([0.7; 25]), Preset::Punchy);
        processor.set_target(gentle);
        processor.set_target_with_corridor(punchy, sample_rate as u64);

        let chunk = tone(sample_rate, 0.3);
        let output = processor.process(chunk.clone(), 1.0);
        assert_eq!(output.frame_count(), chunk.frame_count());
        assert!(output.is_finite());
    }

    #[test]
    fn setting_the_same_target_starts_no_corridor() {
        let sample_rate = 44100;
        let mut processor = HybridProcessor::new(sample_rate);
        let target = target_generator::generate(&Fingerprint::from_vec25([0.4; 25]), Preset::Adaptive);
        processor.set_target(target);
        processor.set_target_with_corridor(target, sample_rate as u64);
        assert!(processor.transition.is_none());
    }

    #[test]
    fn intensity_is_monotonic_in_energy() {
        let sample_rate = 44100;
        let fp = Fingerprint::from_vec25(std::array::from_fn(|i| (i as f32 * 0.03).min(0.9)));
        let target = target_generator::generate(&fp, Preset::Punchy);

        let input = tone(sample_rate, 0.2);
        let mut energies = Vec::new();
        for intensity in [0.0, 0.25, 0.5, 0.75, 1.0] {
            let mut processor = HybridProcessor::new(sample_rate);
            processor.set_target(target);
            energies.push(processor.process(input.clone(), intensity).rms_linear());
        }
        let dry_energy = energies[0];
        let wet_energy = energies[4];
        let lo = dry_energy.min(wet_energy) - 0.05;
        let hi = dry_energy.max(wet_energy) + 0.05;
        for e in &energies {
            assert!(*e >= lo && *e <= hi, "energy {e} outside [{lo},{hi}]");
        }
    }
}
