use std::f32::consts::PI;

use crate::block::{AudioBlock, PcmFrame};
use crate::source::PcmSource;

/// A deterministic sine-wave source, handy for "pass-through at zero
/// intensity" style scenario tests.
pub struct SineTestSource {
    frames: Vec<PcmFrame>,
    sample_rate: u32,
}

impl SineTestSource {
    pub fn new(sample_rate: u32, duration_seconds: f32, freq_hz: f32, amplitude: f32) -> Self {
        let n = (sample_rate as f32 * duration_seconds) as usize;
        let frames = (0..n)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                let s = (2.0 * PI * freq_hz * t).sin() * amplitude;
                (s, s)
            })
            .collect();
        Self { frames, sample_rate }
    }
}

impl PcmSource for SineTestSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channel_count(&self) -> u8 {
        2
    }

    fn frame_count(&self) -> u64 {
        self.frames.len() as u64
    }

    fn read_frames(&self, start_frame: u64, max_frames: u64) -> AudioBlock {
        let total = self.frames.len() as u64;
        if start_frame >= total {
            return AudioBlock::new(Vec::new(), self.sample_rate, start_frame);
        }
        let start = start_frame as usize;
        let end = ((start_frame + max_frames).min(total)) as usize;
        AudioBlock::new(self.frames[start..end].to_vec(), self.sample_rate, start_frame)
    }
}

/// Wraps a plain `Vec<PcmFrame>` as a source, for tests that construct
/// specific waveforms by hand.
pub struct MemorySource {
    frames: Vec<PcmFrame>,
    sample_rate: u32,
}

impl MemorySource {
    pub fn new(frames: Vec<PcmFrame>, sample_rate: u32) -> Self {
        Self { frames, sample_rate }
    }
}

impl PcmSource for MemorySource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channel_count(&self) -> u8 {
        2
    }

    fn frame_count(&self) -> u64 {
        self.frames.len() as u64
    }

    fn read_frames(&self, start_frame: u64, max_frames: u64) -> AudioBlock {
        let total = self.frames.len() as u64;
        if start_frame >= total {
            return AudioBlock::new(Vec::new(), self.sample_rate, start_frame);
        }
        let start = start_frame as usize;
        let end = ((start_frame + max_frames).min(total)) as usize;
        AudioBlock::new(self.frames[start..end].to_vec(), self.sample_rate, start_frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sine_source_frame_count_matches_duration() {
        let src = SineTestSource::new(44100, 1.0, 440.0, 0.5);
        assert_eq!(src.frame_count(), 44100);
    }

    #[test]
    fn read_past_end_is_empty() {
        let src = SineTestSource::new(44100, 0.1, 440.0, 0.5);
        let block = src.read_frames(100_000, 1024);
        assert!(block.is_empty());
    }

    #[test]
    fn read_frames_clamps_to_available() {
        let src = SineTestSource::new(44100, 0.01, 440.0, 0.5);
        let block = src.read_frames(0, 1_000_000);
        assert_eq!(block.frame_count() as u64, src.frame_count());
    }
}
