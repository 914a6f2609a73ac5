use std::fs::File;
use std::path::Path;

use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSourceStream, ReadOnlySource};
use symphonia::core::probe::Hint;

use crate::block::{AudioBlock, PcmFrame};
use crate::error::DecodeError;
use crate::source::PcmSource;

/// Decodes an entire track into memory once at `open`, then serves
/// `read_frames` as a plain slice copy. This buys the random-access
/// contract the engine needs (chunked seeking, lookahead, context
/// windows) at the cost of holding one decoded copy of the track per
/// open handle; sessions that want to share a source wrap it in `Arc`.
pub struct SymphoniaSource {
    frames: Vec<PcmFrame>,
    sample_rate: u32,
    channel_count: u8,
}

impl SymphoniaSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DecodeError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| DecodeError::io(e.to_string()))?;

        let source = ReadOnlySource::new(file);
        let mss = MediaSourceStream::new(Box::new(source), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension() {
            hint.with_extension(&ext.to_string_lossy());
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &Default::default())
            .map_err(|e| DecodeError::unsupported(format!("probe failed: {e}")))?;

        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.sample_rate.is_some())
            .ok_or_else(|| DecodeError::corrupt("no audio tracks found"))?;

        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| DecodeError::corrupt("no sample rate in track"))?;
        let channels = track
            .codec_params
            .channels
            .ok_or_else(|| DecodeError::corrupt("no channel layout in track"))?
            .count();
        let track_id = track.id;

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| DecodeError::unsupported(format!("no decoder: {e}")))?;

        let mut frames: Vec<PcmFrame> = Vec::new();

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(symphonia::core::errors::Error::IoError(_)) => break,
                Err(symphonia::core::errors::Error::ResetRequired) => break,
                Err(e) => return Err(DecodeError::corrupt(e.to_string())),
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(buf) => push_frames(&mut frames, &buf, channels),
                Err(symphonia::core::errors::Error::DecodeError(_)) => continue,
                Err(e) => return Err(DecodeError::corrupt(e.to_string())),
            }
        }

        if frames.is_empty() {
            return Err(DecodeError::corrupt("no audio frames decoded"));
        }

        Ok(Self {
            frames,
            sample_rate,
            channel_count: 2,
        })
    }
}

fn push_frames(frames: &mut Vec<PcmFrame>, buf: &AudioBufferRef, src_channels: usize) {
    macro_rules! extract {
        ($buf:expr, $norm:expr) => {{
            let n = $buf.frames();
            if n == 0 {
                return;
            }
            let ch_count = src_channels.min($buf.spec().channels.count());
            for i in 0..n {
                let l = $norm($buf.chan(0)[i]);
                let r = if ch_count >= 2 {
                    $norm($buf.chan(1)[i])
                } else {
                    l
                };
                frames.push((clamp_sample(l), clamp_sample(r)));
            }
        }};
    }

    match buf {
        AudioBufferRef::F32(b) => extract!(b, |v: f32| v),
        AudioBufferRef::F64(b) => extract!(b, |v: f64| v as f32),
        AudioBufferRef::S8(b) => extract!(b, |v: i8| v as f32 / i8::MAX as f32),
        AudioBufferRef::S16(b) => extract!(b, |v: i16| v as f32 / i16::MAX as f32),
        AudioBufferRef::S24(b) => {
            extract!(b, |v: symphonia::core::sample::i24| v.into_i32() as f32
                / (2_i32.pow(23) - 1) as f32)
        }
        AudioBufferRef::S32(b) => extract!(b, |v: i32| v as f32 / i32::MAX as f32),
        AudioBufferRef::U8(b) => extract!(b, |v: u8| ((v as f32 / 255.0) - 0.5) * 2.0),
        AudioBufferRef::U16(b) => extract!(b, |v: u16| ((v as f32 / 65535.0) - 0.5) * 2.0),
        AudioBufferRef::U24(b) => {
            extract!(b, |v: symphonia::core::sample::u24| {
                let norm = v.into_u32() as f32 / (2_u32.pow(24) - 1) as f32;
                (norm - 0.5) * 2.0
            })
        }
        AudioBufferRef::U32(b) => {
            extract!(b, |v: u32| ((v as f32 / u32::MAX as f32) - 0.5) * 2.0)
        }
    }
}

fn clamp_sample(v: f32) -> f32 {
    if v.is_finite() {
        v.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

impl PcmSource for SymphoniaSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channel_count(&self) -> u8 {
        self.channel_count
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
    fn open_missing_file_errors() {
        let err = SymphoniaSource::open("/nonexistent/path/track.flac").unwrap_err();
        assert_eq!(err.kind, crate::error::DecodeErrorKind::Io);
    }
}
