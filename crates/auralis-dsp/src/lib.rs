//! Block-processing DSP stages: critical-band EQ, adaptive compressor,
//! soft saturator, adaptive limiter, level matcher — the pipeline
//! `auralis-mastering`'s Hybrid Processor runs over every chunk.
//!
//! Also the home of [`MasteringTarget`] and the 26-band critical-band
//! table, since both the target generator (in `auralis-mastering`) and
//! the EQ stage here need to agree on band layout; putting the type here
//! avoids a circular crate dependency.

mod biquad;
mod compressor;
mod envelope;
mod eq;
mod error;
mod level_matcher;
mod limiter;
mod saturator;
mod stage;
mod target;

pub use compressor::AdaptiveCompressor;
pub use error::DspError;
pub use eq::{CriticalBandEq, GAIN_SMOOTH_TIME_CONSTANT_MS};
pub use level_matcher::LevelMatcher;
pub use limiter::AdaptiveLimiter;
pub use saturator::SoftSaturator;
pub use stage::{sanitize, DspStage};
pub use target::{bark_band_centers_hz, CompSettings, DetectorMode, LimSettings, MasteringTarget, N_BANDS};
