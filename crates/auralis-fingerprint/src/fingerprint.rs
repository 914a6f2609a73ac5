//! The 25-dimensional audio fingerprint, grouped into 7 named sections.
//!
//! Field order within [`Fingerprint::to_vec25`]/[`Fingerprint::from_vec25`]
//! is the on-disk record order used by the cache's wire format: frequency,
//! dynamics, temporal, spectral, harmonic, variation, stereo.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyBands {
    pub band_0: f32,
    pub band_1: f32,
    pub band_2: f32,
    pub band_3: f32,
    pub band_4: f32,
    pub band_5: f32,
    pub band_6: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dynamics {
    pub lufs: f32,
    pub crest_factor: f32,
    pub compression_index: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Temporal {
    pub tempo: f32,
    pub onset_density: f32,
    pub percussive_ratio: f32,
    pub transient_sharpness: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectralShape {
    pub centroid: f32,
    pub rolloff: f32,
    pub flatness: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Harmonic {
    pub voiced_ratio: f32,
    pub fundamental_stability: f32,
    pub chroma_concentration: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Variation {
    pub loudness_variation: f32,
    pub dynamic_range_variation: f32,
    pub spectral_flux: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stereo {
    pub interchannel_correlation: f32,
    pub stereo_width: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub frequency: FrequencyBands,
    pub dynamics: Dynamics,
    pub temporal: Temporal,
    pub spectral: SpectralShape,
    pub harmonic: Harmonic,
    pub variation: Variation,
    pub stereo: Stereo,
}

pub const DIMENSION_COUNT: usize = 25;

impl Fingerprint {
    pub fn to_vec25(&self) -> [f32; DIMENSION_COUNT] {
        [
            self.frequency.band_0,
            self.frequency.band_1,
            self.frequency.band_2,
            self.frequency.band_3,
            self.frequency.band_4,
            self.frequency.band_5,
            self.frequency.band_6,
            self.dynamics.lufs,
            self.dynamics.crest_factor,
            self.dynamics.compression_index,
            self.temporal.tempo,
            self.temporal.onset_density,
            self.temporal.percussive_ratio,
            self.temporal.transient_sharpness,
            self.spectral.centroid,
            self.spectral.rolloff,
            self.spectral.flatness,
            self.harmonic.voiced_ratio,
            self.harmonic.fundamental_stability,
            self.harmonic.chroma_concentration,
            self.variation.loudness_variation,
            self.variation.dynamic_range_variation,
            self.variation.spectral_flux,
            self.stereo.interchannel_correlation,
            self.stereo.stereo_width,
        ]
    }

    pub fn from_vec25(v: [f32; DIMENSION_COUNT]) -> Self {
        Fingerprint {
            frequency: FrequencyBands {
                band_0: v[0],
                band_1: v[1],
                band_2: v[2],
                band_3: v[3],
                band_4: v[4],
                band_5: v[5],
                band_6: v[6],
            },
            dynamics: Dynamics {
                lufs: v[7],
                crest_factor: v[8],
                compression_index: v[9],
            },
            temporal: Temporal {
                tempo: v[10],
                onset_density: v[11],
                percussive_ratio: v[12],
                transient_sharpness: v[13],
            },
            spectral: SpectralShape {
                centroid: v[14],
                rolloff: v[15],
                flatness: v[16],
            },
            harmonic: Harmonic {
                voiced_ratio: v[17],
                fundamental_stability: v[18],
                chroma_concentration: v[19],
            },
            variation: Variation {
                loudness_variation: v[20],
                dynamic_range_variation: v[21],
                spectral_flux: v[22],
            },
            stereo: Stereo {
                interchannel_correlation: v[23],
                stereo_width: v[24],
            },
        }
    }

    /// True if every dimension is finite. A cached or computed fingerprint
    /// with a non-finite value is never valid to hand to the target generator.
    pub fn is_finite(&self) -> bool {
        self.to_vec25().iter().all(|v| v.is_finite())
    }
}
