//! 25-dimensional audio fingerprint extraction.
//!
//! Computes a fixed-shape numeric profile of a track across seven
//! perceptual groups (frequency distribution, dynamics, temporal
//! character, spectral shape, harmonic content, variation over time,
//! stereo image). The fingerprint is the sole input to target
//! generation in `auralis-mastering`; it never itself decides mastering
//! parameters.

mod dynamics;
mod error;
mod extractor;
mod fingerprint;
mod frequency;
mod harmonic;
mod spectral;
mod stereo;
mod streaming;
mod temporal;
mod util;
mod variation;

pub use error::FingerprintError;
pub use extractor::{BatchExtractor, FingerprintExtractor, FingerprintResult};
pub use fingerprint::{
    Dynamics, Fingerprint, FrequencyBands, Harmonic, SpectralShape, Stereo, Temporal, Variation, DIMENSION_COUNT,
};
pub use streaming::{StreamingFingerprintExtractor, RING_BUFFER_SECONDS};
