use thiserror::Error;

/// Error taxonomy for the Chunked Stream Engine and Control Plane. Mirrors
/// the input/transient/degraded/fatal/system grouping: `InvalidConfig` and
/// `SessionNotFound` are input errors surfaced directly to the caller;
/// `ChunkIoFailed` is the fatal-session outcome of a twice-failed PCM read.
/// Degraded-processing failures (fingerprint extraction, DSP non-finite
/// output) are recovered locally and never reach this enum — they only
/// set a warning flag on the session and the affected chunk.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    #[error("session {0} not found")]
    SessionNotFound(u64),

    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),

    #[error("PCM read failed for chunk {chunk_index} after retry: {message}")]
    ChunkIoFailed { chunk_index: u32, message: String },

    #[error("session {0} is not in a state that allows this operation")]
    InvalidSessionState(u64),
}
