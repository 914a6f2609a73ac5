//! PCM frame model and decoder sources.
//!
//! Decodes an encoded track to a finite sequence of interleaved stereo
//! `f32` frames at a declared sample rate, with random access by frame
//! index. File-format decoding itself is delegated to `symphonia`; this
//! crate's job is presenting a uniform, randomly-addressable frame
//! sequence to the rest of the engine.

mod block;
mod error;
mod source;
mod symphonia_source;
mod test_sources;
mod track_id;

pub use block::{AudioBlock, PcmFrame};
pub use error::{DecodeError, DecodeErrorKind};
pub use source::PcmSource;
pub use symphonia_source::SymphoniaSource;
pub use test_sources::{MemorySource, SineTestSource};
pub use track_id::TrackId;
