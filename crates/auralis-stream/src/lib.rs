//! Chunked Stream Engine and Control Plane (spec components C7 and C9):
//! splits a track into overlapping chunks, runs each through a
//! per-session [`auralis_mastering::HybridProcessor`], and exposes an
//! async API for loading, steering, and pulling the result.

mod chunk;
mod config;
mod engine;
mod error;
mod session;
mod wire;

pub use chunk::{crossfade_join, ChunkDescriptor, ProcessedChunk};
pub use config::EngineConfig;
pub use engine::StreamEngine;
pub use error::StreamError;
pub use session::{ContentProfile, SessionId, SessionState};
pub use wire::{decode_chunk, encode_chunk, BitDepth, DecodedChunk, WireError};
