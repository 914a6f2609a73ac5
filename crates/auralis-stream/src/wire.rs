//! PCM chunk wire format (spec §6.1): frames a [`ProcessedChunk`] as a
//! minimal `AURC`-magic header followed by interleaved stereo PCM, for
//! handoff to a remote surface (out of scope per spec §1's Non-goals —
//! this module only produces/consumes the bytes, it does not transport
//! them). Grounded on `auralis-cache`'s `record.rs` length-prefixed,
//! versioned record style, generalized from "one record per fingerprint"
//! to "one frame per chunk".

use thiserror::Error;

use crate::chunk::ProcessedChunk;

const MAGIC: [u8; 4] = *b"AURC";
const HEADER_LEN: usize = 4 + 4 + 4 + 4 + 2 + 2 + 4;

const FLAG_LEADING_CONTEXT_TRIMMED: u32 = 1 << 0;
const FLAG_CROSSFADE_HEAD: u32 = 1 << 1;
const FLAG_CROSSFADE_TAIL: u32 = 1 << 2;
const FLAG_WARNING: u32 = 1 << 3;

/// Sample format of the PCM payload; selectable per spec §6.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitDepth {
    Sixteen,
    TwentyFour,
}

impl BitDepth {
    fn bits(self) -> u16 {
        match self {
            BitDepth::Sixteen => 16,
            BitDepth::TwentyFour => 24,
        }
    }

    fn bytes_per_sample(self) -> usize {
        (self.bits() as usize) / 8
    }

    fn from_bits(bits: u16) -> Result<Self, WireError> {
        match bits {
            16 => Ok(BitDepth::Sixteen),
            24 => Ok(BitDepth::TwentyFour),
            other => Err(WireError::UnsupportedBitDepth(other)),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("buffer too short: need at least {needed} bytes, got {got}")]
    Truncated { needed: usize, got: usize },
    #[error("bad magic bytes: {0:?}")]
    BadMagic([u8; 4]),
    #[error("unsupported bits-per-sample: {0}")]
    UnsupportedBitDepth(u16),
    #[error("unsupported channel count: {0}")]
    UnsupportedChannels(u16),
}

/// A decoded wire frame: header fields plus PCM payload converted back
/// to `f32` frames in `[-1.0, 1.0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedChunk {
    pub index: u32,
    pub sample_rate: u32,
    pub frame_count: u32,
    pub bit_depth: BitDepth,
    pub has_leading_context_trimmed: bool,
    pub has_crossfade_head: bool,
    pub has_crossfade_tail: bool,
    pub warning: bool,
    pub pcm: Vec<(f32, f32)>,
}

/// Serializes a [`ProcessedChunk`] into the `AURC` wire frame. Always
/// marks `has_leading_context_trimmed`, since every emitted chunk has had
/// its leading/trailing DSP context trimmed back to `frame_count` before
/// reaching this point (spec §4.7).
pub fn encode_chunk(chunk: &ProcessedChunk, bit_depth: BitDepth) -> Vec<u8> {
    let frame_count = chunk.pcm.frame_count() as u32;
    let bytes_per_sample = bit_depth.bytes_per_sample();
    let mut flags = FLAG_LEADING_CONTEXT_TRIMMED;
    if chunk.crossfade_head_frames > 0 {
        flags |= FLAG_CROSSFADE_HEAD;
    }
    if chunk.crossfade_tail_frames > 0 {
        flags |= FLAG_CROSSFADE_TAIL;
    }
    if chunk.warning {
        flags |= FLAG_WARNING;
    }

    let payload_len = frame_count as usize * 2 * bytes_per_sample;
    let mut out = Vec::with_capacity(HEADER_LEN + payload_len);

    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&chunk.index.to_le_bytes());
    out.extend_from_slice(&chunk.pcm.sample_rate().to_le_bytes());
    out.extend_from_slice(&frame_count.to_le_bytes());
    out.extend_from_slice(&bit_depth.bits().to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes());
    out.extend_from_slice(&flags.to_le_bytes());

    for &(l, r) in chunk.pcm.frames() {
        write_sample(&mut out, l, bit_depth);
        write_sample(&mut out, r, bit_depth);
    }

    out
}

fn write_sample(out: &mut Vec<u8>, sample: f32, bit_depth: BitDepth) {
    match bit_depth {
        BitDepth::Sixteen => {
            let clamped = (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16;
            out.extend_from_slice(&clamped.to_le_bytes());
        }
        BitDepth::TwentyFour => {
            let max = (1i32 << 23) - 1;
            let clamped = (sample.clamp(-1.0, 1.0) * max as f32).round() as i32;
            let bytes = clamped.to_le_bytes();
            out.extend_from_slice(&bytes[0..3]);
        }
    }
}

fn read_sample(bytes: &[u8], bit_depth: BitDepth) -> f32 {
    match bit_depth {
        BitDepth::Sixteen => {
            let raw = i16::from_le_bytes([bytes[0], bytes[1]]);
            raw as f32 / i16::MAX as f32
        }
        BitDepth::TwentyFour => {
            let sign_extended = if bytes[2] & 0x80 != 0 { 0xFFu8 } else { 0x00u8 };
            let raw = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], sign_extended]);
            let max = (1i32 << 23) - 1;
            raw as f32 / max as f32
        }
    }
}

/// Parses an `AURC` wire frame back into header fields and `f32` PCM.
/// Unknown flag bits above bit 3 are ignored per spec §6.1.
pub fn decode_chunk(bytes: &[u8]) -> Result<DecodedChunk, WireError> {
    if bytes.len() < HEADER_LEN {
        return Err(WireError::Truncated { needed: HEADER_LEN, got: bytes.len() });
    }
    let magic: [u8; 4] = bytes[0..4].try_into().unwrap();
    if magic != MAGIC {
        return Err(WireError::BadMagic(magic));
    }

    let index = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
    let sample_rate = u32::from_le_bytes(bytes[8..12].try_into().unwrap());
    let frame_count = u32::from_le_bytes(bytes[12..16].try_into().unwrap());
    let bits = u16::from_le_bytes(bytes[16..18].try_into().unwrap());
    let channels = u16::from_le_bytes(bytes[18..20].try_into().unwrap());
    let flags = u32::from_le_bytes(bytes[20..24].try_into().unwrap());

    if channels != 2 {
        return Err(WireError::UnsupportedChannels(channels));
    }
    let bit_depth = BitDepth::from_bits(bits)?;

    let bytes_per_sample = bit_depth.bytes_per_sample();
    let payload_len = frame_count as usize * 2 * bytes_per_sample;
    let payload = &bytes[HEADER_LEN..];
    if payload.len() < payload_len {
        return Err(WireError::Truncated { needed: HEADER_LEN + payload_len, got: bytes.len() });
    }

    let mut pcm = Vec::with_capacity(frame_count as usize);
    let mut offset = 0usize;
    for _ in 0..frame_count {
        let l = read_sample(&payload[offset..offset + bytes_per_sample], bit_depth);
        offset += bytes_per_sample;
        let r = read_sample(&payload[offset..offset + bytes_per_sample], bit_depth);
        offset += bytes_per_sample;
        pcm.push((l, r));
    }

    Ok(DecodedChunk {
        index,
        sample_rate,
        frame_count,
        bit_depth,
        has_leading_context_trimmed: flags & FLAG_LEADING_CONTEXT_TRIMMED != 0,
        has_crossfade_head: flags & FLAG_CROSSFADE_HEAD != 0,
        has_crossfade_tail: flags & FLAG_CROSSFADE_TAIL != 0,
        warning: flags & FLAG_WARNING != 0,
        pcm,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use auralis_dsp::MasteringTarget;
    use auralis_pcm::AudioBlock;

    fn sample_chunk() -> ProcessedChunk {
        let frames: Vec<(f32, f32)> = (0..100)
            .map(|i| {
                let t = i as f32 / 100.0;
                (t * 0.5 - 0.25, -(t * 0.5 - 0.25))
            })
            .collect();
        let pcm = AudioBlock::new(frames, 44100, 0);
        ProcessedChunk {
            index: 7,
            peak_dbfs: pcm.peak_dbfs(),
            rms_dbfs: pcm.rms_dbfs(),
            pcm,
            applied_target: MasteringTarget::pass_through(),
            crossfade_head_frames: 10,
            crossfade_tail_frames: 0,
            warning: false,
        }
    }

    #[test]
    fn header_fields_round_trip_at_16_bit() {
        let chunk = sample_chunk();
        let bytes = encode_chunk(&chunk, BitDepth::Sixteen);
        assert_eq!(&bytes[0..4], b"AURC");

        let decoded = decode_chunk(&bytes).unwrap();
        assert_eq!(decoded.index, 7);
        assert_eq!(decoded.sample_rate, 44100);
        assert_eq!(decoded.frame_count, 100);
        assert_eq!(decoded.bit_depth, BitDepth::Sixteen);
        assert!(decoded.has_crossfade_head);
        assert!(!decoded.has_crossfade_tail);
        assert!(!decoded.warning);
        assert!(decoded.has_leading_context_trimmed);
    }

    #[test]
    fn sample_values_round_trip_within_quantization_error() {
        let chunk = sample_chunk();
        for bit_depth in [BitDepth::Sixteen, BitDepth::TwentyFour] {
            let bytes = encode_chunk(&chunk, bit_depth);
            let decoded = decode_chunk(&bytes).unwrap();
            let tolerance = if bit_depth == BitDepth::Sixteen { 1.0 / i16::MAX as f32 } else { 1.0 / (1 << 23) as f32 };
            for (original, round_tripped) in chunk.pcm.frames().iter().zip(decoded.pcm.iter()) {
                assert!((original.0 - round_tripped.0).abs() <= tolerance * 2.0);
                assert!((original.1 - round_tripped.1).abs() <= tolerance * 2.0);
            }
        }
    }

    #[test]
    fn warning_flag_is_carried() {
        let mut chunk = sample_chunk();
        chunk.warning = true;
        let bytes = encode_chunk(&chunk, BitDepth::TwentyFour);
        let decoded = decode_chunk(&bytes).unwrap();
        assert!(decoded.warning);
    }

    #[test]
    fn truncated_buffer_is_rejected() {
        let chunk = sample_chunk();
        let bytes = encode_chunk(&chunk, BitDepth::Sixteen);
        let err = decode_chunk(&bytes[..HEADER_LEN - 1]).unwrap_err();
        assert_eq!(err, WireError::Truncated { needed: HEADER_LEN, got: HEADER_LEN - 1 });
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut bytes = encode_chunk(&sample_chunk(), BitDepth::Sixteen);
        bytes[0] = b'X';
        assert!(matches!(decode_chunk(&bytes), Err(WireError::BadMagic(_))));
    }

    #[test]
    fn payload_byte_length_matches_frame_count_and_bit_depth() {
        let chunk = sample_chunk();
        let bytes = encode_chunk(&chunk, BitDepth::TwentyFour);
        let expected = HEADER_LEN + chunk.pcm.frame_count() * 2 * 3;
        assert_eq!(bytes.len(), expected);
    }
}
