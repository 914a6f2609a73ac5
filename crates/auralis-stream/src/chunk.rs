//! Chunk layout: deterministic derivation of `ChunkDescriptor`s from
//! `(total_frames, sample_rate, chunk_duration, crossfade_duration)`, plus
//! the equal-power crossfade join between adjacent emitted chunks.

use auralis_dsp::MasteringTarget;
use auralis_pcm::AudioBlock;

/// One logical chunk's position in the source track. Consecutive
/// descriptors are contiguous in `start_frame + frame_count` except for
/// the last, which may be shorter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkDescriptor {
    pub index: u32,
    pub start_frame: u64,
    pub frame_count: u64,
    pub has_leading_context: bool,
    pub has_trailing_context: bool,
}

/// Rounds `chunk_duration_seconds * sample_rate` up to an even frame
/// count (stereo alignment, spec §3).
pub fn chunk_frames_for(chunk_duration_seconds: f32, sample_rate: u32) -> u64 {
    let raw = (chunk_duration_seconds * sample_rate as f32).round() as u64;
    let raw = raw.max(2);
    if raw % 2 == 0 {
        raw
    } else {
        raw + 1
    }
}

pub fn crossfade_frames_for(crossfade_duration_seconds: f32, sample_rate: u32) -> u64 {
    (crossfade_duration_seconds.max(0.0) * sample_rate as f32).round() as u64
}

/// Splits `total_frames` into descriptors of `chunk_frames` each, the
/// last truncated. A track shorter than one full chunk still yields a
/// single (shorter) descriptor — the sample-count invariant holds
/// regardless of how short, per the Open Question in spec §9 (this
/// implementation does not shrink the crossfade proportionally; a short
/// last chunk may end up shorter than `crossfade_frames`, in which case
/// the join step clamps to the available frame count).
pub fn compute_chunk_descriptors(total_frames: u64, chunk_frames: u64) -> Vec<ChunkDescriptor> {
    if total_frames == 0 {
        return Vec::new();
    }
    let mut descriptors = Vec::new();
    let mut start = 0u64;
    let mut index = 0u32;
    while start < total_frames {
        let remaining = total_frames - start;
        let frame_count = remaining.min(chunk_frames);
        descriptors.push(ChunkDescriptor {
            index,
            start_frame: start,
            frame_count,
            has_leading_context: start > 0,
            has_trailing_context: start + frame_count < total_frames,
        });
        start += frame_count;
        index += 1;
    }
    descriptors
}

/// A fully processed, ready-to-emit chunk (spec §3's Processed Chunk).
#[derive(Debug, Clone)]
pub struct ProcessedChunk {
    pub index: u32,
    pub pcm: AudioBlock,
    pub peak_dbfs: f32,
    pub rms_dbfs: f32,
    pub applied_target: MasteringTarget,
    pub crossfade_head_frames: u64,
    pub crossfade_tail_frames: u64,
    pub warning: bool,
}

/// Equal-power crossfade join of `prev_tail` (outgoing) against
/// `next_head` (incoming); both must be the same length. Uses
/// `sin²(πt/2)`/`cos²(πt/2)` power curves so the joined region's total
/// power stays constant (spec §4.7's crossfade policy).
pub fn crossfade_join(prev_tail: &[(f32, f32)], next_head: &[(f32, f32)]) -> Vec<(f32, f32)> {
    let n = prev_tail.len().min(next_head.len());
    (0..n)
        .map(|i| {
            let t = if n <= 1 { 1.0 } else { i as f32 / (n - 1) as f32 };
            let theta = t * std::f32::consts::FRAC_PI_2;
            let fade_out = theta.cos().powi(2);
            let fade_in = theta.sin().powi(2);
            let (pl, pr) = prev_tail[i];
            let (nl, nr) = next_head[i];
            (pl * fade_out + nl * fade_in, pr * fade_out + nr * fade_in)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_frames_round_to_even() {
        assert_eq!(chunk_frames_for(30.0, 44100) % 2, 0);
        assert_eq!(chunk_frames_for(1.0, 44101) % 2, 0);
    }

    #[test]
    fn descriptors_are_contiguous_and_cover_total() {
        let chunk_frames = chunk_frames_for(30.0, 44100);
        let total = chunk_frames * 3 + 1000;
        let descriptors = compute_chunk_descriptors(total, chunk_frames);
        assert_eq!(descriptors.len(), 4);
        let mut expected_start = 0u64;
        for d in &descriptors {
            assert_eq!(d.start_frame, expected_start);
            expected_start += d.frame_count;
        }
        assert_eq!(expected_start, total);
        assert_eq!(descriptors.last().unwrap().frame_count, 1000);
        assert!(!descriptors.last().unwrap().has_trailing_context);
        assert!(!descriptors[0].has_leading_context);
        assert!(descriptors[1].has_leading_context && descriptors[1].has_trailing_context);
    }

    #[test]
    fn short_track_yields_single_descriptor() {
        let chunk_frames = chunk_frames_for(30.0, 44100);
        let descriptors = compute_chunk_descriptors(1000, chunk_frames);
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].frame_count, 1000);
    }

    #[test]
    fn crossfade_join_preserves_power_at_curve_midpoint() {
        let prev: Vec<(f32, f32)> = vec![(0.5, 0.5); 100];
        let next: Vec<(f32, f32)> = vec![(0.5, 0.5); 100];
        let joined = crossfade_join(&prev, &next);
        for (l, r) in joined {
            assert!((l - 0.5).abs() < 1e-4);
            assert!((r - 0.5).abs() < 1e-4);
        }
    }
}
