use std::sync::Arc;

/// A single interleaved stereo sample pair, nominally in `[-1.0, 1.0]`.
pub type PcmFrame = (f32, f32);

/// An immutable, ordered sequence of PCM frames with a declared sample
/// rate and its logical start position within the source track.
///
/// Immutable after creation: every stage that touches an `AudioBlock`
/// produces a new one rather than mutating this one in place.
#[derive(Debug, Clone)]
pub struct AudioBlock {
    frames: Arc<[PcmFrame]>,
    sample_rate: u32,
    start_frame: u64,
}

impl AudioBlock {
    pub fn new(frames: Vec<PcmFrame>, sample_rate: u32, start_frame: u64) -> Self {
        Self {
            frames: frames.into(),
            sample_rate,
            start_frame,
        }
    }

    pub fn silence(frame_count: usize, sample_rate: u32, start_frame: u64) -> Self {
        Self::new(vec![(0.0, 0.0); frame_count], sample_rate, start_frame)
    }

    pub fn frames(&self) -> &[PcmFrame] {
        &self.frames
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn start_frame(&self) -> u64 {
        self.start_frame
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// All frames finite (no NaN/Inf in either channel).
    pub fn is_finite(&self) -> bool {
        self.frames
            .iter()
            .all(|(l, r)| l.is_finite() && r.is_finite())
    }

    /// Peak absolute sample value across both channels, linear scale.
    pub fn peak_linear(&self) -> f32 {
        self.frames
            .iter()
            .flat_map(|(l, r)| [l.abs(), r.abs()])
            .fold(0.0f32, f32::max)
    }

    pub fn peak_dbfs(&self) -> f32 {
        20.0 * self.peak_linear().max(1e-10).log10()
    }

    pub fn rms_linear(&self) -> f32 {
        if self.frames.is_empty() {
            return 0.0;
        }
        let sum_sq: f32 = self
            .frames
            .iter()
            .map(|(l, r)| l * l + r * r)
            .sum::<f32>();
        (sum_sq / (self.frames.len() as f32 * 2.0)).sqrt()
    }

    pub fn rms_dbfs(&self) -> f32 {
        20.0 * self.rms_linear().max(1e-10).log10()
    }

    /// Returns a new block covering `[start, start+len)` of this block's
    /// frames, re-based to the given logical start frame.
    pub fn slice(&self, start: usize, len: usize, logical_start_frame: u64) -> Self {
        let end = (start + len).min(self.frames.len());
        let start = start.min(end);
        Self::new(self.frames[start..end].to_vec(), self.sample_rate, logical_start_frame)
    }

    /// Concatenate two blocks of equal sample rate; start_frame is taken
    /// from `self`.
    pub fn concat(&self, other: &AudioBlock) -> Self {
        let mut frames = Vec::with_capacity(self.frame_count() + other.frame_count());
        frames.extend_from_slice(&self.frames);
        frames.extend_from_slice(&other.frames);
        Self::new(frames, self.sample_rate, self.start_frame)
    }
}
