//! On-disk record format for a single cached fingerprint.
//!
//! Each record is a length-prefixed, append-only entry:
//!
//! ```text
//! u32  total record length (excludes this field)
//! u16  format version (currently 1)
//! u16  track id byte length
//! ..   track id bytes (utf8)
//! f32 x 25  fingerprint dimensions, in Fingerprint::to_vec25 order
//! f32  confidence
//! u64  computed_at, unix seconds
//! ```
//!
//! The length prefix lets the cache detect and discard a torn write left
//! by a crash mid-append, without needing a checksum: a record whose
//! declared length runs past EOF is simply the last, incomplete entry.

use std::time::{SystemTime, UNIX_EPOCH};

use auralis_fingerprint::{Fingerprint, DIMENSION_COUNT};
use auralis_pcm::TrackId;

use crate::error::CacheError;

pub const FORMAT_VERSION: u16 = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct FingerprintEntry {
    pub track_id: TrackId,
    pub fingerprint: Fingerprint,
    pub confidence: f32,
    pub computed_at: u64,
}

impl FingerprintEntry {
    pub fn new(track_id: TrackId, fingerprint: Fingerprint, confidence: f32) -> Self {
        let computed_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self { track_id, fingerprint, confidence, computed_at }
    }

    pub fn encode(&self) -> Vec<u8> {
        let id_bytes = self.track_id.as_str().as_bytes();
        let body_len = 2 + 2 + id_bytes.len() + DIMENSION_COUNT * 4 + 4 + 8;

        let mut buf = Vec::with_capacity(4 + body_len);
        buf.extend_from_slice(&(body_len as u32).to_le_bytes());
        buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        buf.extend_from_slice(&(id_bytes.len() as u16).to_le_bytes());
        buf.extend_from_slice(id_bytes);
        for dim in self.fingerprint.to_vec25() {
            buf.extend_from_slice(&dim.to_le_bytes());
        }
        buf.extend_from_slice(&self.confidence.to_le_bytes());
        buf.extend_from_slice(&self.computed_at.to_le_bytes());
        buf
    }

    /// Decodes one record from `buf`, returning the entry and the number
    /// of bytes consumed (the length prefix plus the body). Returns
    /// `Ok(None)` if `buf` does not yet contain a complete record (a torn
    /// tail write); that tail is skipped by the caller, not an error.
    pub fn decode(buf: &[u8]) -> Result<Option<(Self, usize)>, CacheError> {
        if buf.len() < 4 {
            return Ok(None);
        }
        let body_len = u32::from_le_bytes(buf[0..4].try_into().unwrap()) as usize;
        if buf.len() < 4 + body_len {
            return Ok(None);
        }
        let body = &buf[4..4 + body_len];

        if body.len() < 4 {
            return Err(CacheError::Corrupt("record body shorter than header".into()));
        }
        let version = u16::from_le_bytes(body[0..2].try_into().unwrap());
        if version != FORMAT_VERSION {
            return Err(CacheError::UnsupportedVersion(version));
        }
        let id_len = u16::from_le_bytes(body[2..4].try_into().unwrap()) as usize;

        let id_start = 4;
        let id_end = id_start + id_len;
        let fp_end = id_end + DIMENSION_COUNT * 4;
        let confidence_end = fp_end + 4;
        let computed_at_end = confidence_end + 8;
        if body.len() != computed_at_end {
            return Err(CacheError::Corrupt("record body length mismatch".into()));
        }

        let track_id_str = std::str::from_utf8(&body[id_start..id_end])
            .map_err(|e| CacheError::Corrupt(format!("invalid utf8 track id: {e}")))?;
        let track_id = TrackId::from_raw(track_id_str);

        let mut dims = [0.0f32; DIMENSION_COUNT];
        for (i, dim) in dims.iter_mut().enumerate() {
            let start = id_end + i * 4;
            *dim = f32::from_le_bytes(body[start..start + 4].try_into().unwrap());
        }
        let fingerprint = Fingerprint::from_vec25(dims);

        let confidence = f32::from_le_bytes(body[fp_end..fp_end + 4].try_into().unwrap());
        let computed_at = u64::from_le_bytes(body[confidence_end..confidence_end + 8].try_into().unwrap());

        Ok(Some((
            FingerprintEntry { track_id, fingerprint, confidence, computed_at },
            4 + body_len,
        )))
    }
}
