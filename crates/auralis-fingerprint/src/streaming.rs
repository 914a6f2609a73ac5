//! Incremental fingerprinting for content arriving a block at a time.
//!
//! Mirrors the batch extractor's semantics exactly: accumulates frames
//! into a bounded ring buffer and, on `finalize`, runs the same analysis
//! [`BatchExtractor`] runs over a fully materialized source. The streaming
//! extractor's contribution is only incremental ingestion; the underlying
//! math is shared so results are in no way dialect-specific to "streaming".

use auralis_pcm::{AudioBlock, MemorySource, PcmFrame, PcmSource};

use crate::error::FingerprintError;
use crate::extractor::{BatchExtractor, FingerprintExtractor, FingerprintResult};

/// Ring buffer capacity, in seconds. Content beyond this from the start
/// of ingestion is dropped in FIFO order; spec-wise, this trades off
/// perfect full-track analysis for bounded memory on arbitrarily long streams.
pub const RING_BUFFER_SECONDS: f32 = 120.0;

pub struct StreamingFingerprintExtractor {
    sample_rate: u32,
    capacity_frames: usize,
    buffer: Vec<PcmFrame>,
    total_frames_seen: u64,
}

impl StreamingFingerprintExtractor {
    pub fn new(sample_rate: u32) -> Self {
        let capacity_frames = (sample_rate as f32 * RING_BUFFER_SECONDS) as usize;
        Self {
            sample_rate,
            capacity_frames,
            buffer: Vec::with_capacity(capacity_frames.min(1 << 20)),
            total_frames_seen: 0,
        }
    }

    /// Ingest a newly decoded block. Blocks must share this extractor's
    /// sample rate; the caller (the stream engine) guarantees this.
    pub fn push(&mut self, block: &AudioBlock) {
        self.total_frames_seen += block.frame_count();
        self.buffer.extend_from_slice(block.frames());
        if self.buffer.len() > self.capacity_frames {
            let overflow = self.buffer.len() - self.capacity_frames;
            self.buffer.drain(0..overflow);
        }
    }

    pub fn frames_seen(&self) -> u64 {
        self.total_frames_seen
    }

    /// Run the same analysis the batch extractor runs, over whatever is
    /// currently retained in the ring buffer. Short or even empty buffers
    /// are not an error: the batch extractor zero-pads them and reports
    /// a correspondingly low confidence (spec §4.2).
    pub fn finalize(&self) -> Result<FingerprintResult, FingerprintError> {
        if self.sample_rate == 0 {
            return Err(FingerprintError::InsufficientAudio);
        }
        let source = MemorySource::new(self.buffer.clone(), self.sample_rate);
        let mut result = BatchExtractor.analyze(&source)?;

        // Confidence reflects how much of the *entire* stream has been
        // seen, not just what survives in the ring buffer, so a long
        // stream analyzed mid-flight is not overconfident about a
        // recency-biased window.
        let seen_s = self.total_frames_seen as f32 / self.sample_rate as f32;
        result.confidence = result.confidence.min((seen_s / 10.0).clamp(0.0, 1.0));
        Ok(result)
    }
}
