//! Batch fingerprint extraction: read an entire [`PcmSource`], compute
//! all 25 dimensions, and report a confidence score.

use auralis_pcm::PcmSource;

use crate::dynamics::{compression_index, crest_factor, estimate_lufs};
use crate::error::FingerprintError;
use crate::fingerprint::{Dynamics, Fingerprint, FrequencyBands, Harmonic, SpectralShape, Stereo, Temporal, Variation};
use crate::frequency::compute_frequency_bands;
use crate::harmonic::{chroma_concentration, fundamental_stability, voiced_ratio};
use crate::spectral::{compute_spectrum, spectral_centroid, spectral_flatness, spectral_rolloff};
use crate::stereo::{interchannel_correlation, stereo_width};
use crate::temporal::{onset_density, percussive_ratio, tempo_estimate, transient_sharpness};
use crate::util::{left_channel, right_channel, to_mono};
use crate::variation::{dynamic_range_variation, loudness_variation, spectral_flux};
use auralis_pcm::AudioBlock;

/// Audio shorter than this is zero-padded up to this length before
/// analysis (spec §4.2: "Produced from at least 10 s of audio; shorter
/// inputs are zero-padded and flagged low-confidence"), rather than
/// erroring out. Confidence still scales down with how much real audio
/// was actually available.
const CONFIDENCE_FULL_SECONDS: f32 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FingerprintResult {
    pub fingerprint: Fingerprint,
    pub confidence: f32,
}

pub trait FingerprintExtractor {
    fn analyze(&self, source: &dyn PcmSource) -> Result<FingerprintResult, FingerprintError>;
}

/// Reads the whole source into memory and computes every dimension over
/// it at once. Appropriate for cache population and CLI analysis; the
/// streaming counterpart lives in [`crate::streaming`].
#[derive(Debug, Default, Clone, Copy)]
pub struct BatchExtractor;

impl FingerprintExtractor for BatchExtractor {
    fn analyze(&self, source: &dyn PcmSource) -> Result<FingerprintResult, FingerprintError> {
        let sample_rate = source.sample_rate().max(1);
        let frame_count = source.frame_count();
        let duration_s = frame_count as f32 / sample_rate as f32;

        let block = source.read_frames(0, frame_count);
        let target_frames = (CONFIDENCE_FULL_SECONDS * sample_rate as f32).round() as u64;
        let block = if block.frame_count() as u64 < target_frames {
            let pad_frames = target_frames - block.frame_count() as u64;
            block.concat(&AudioBlock::silence(pad_frames as usize, sample_rate, 0))
        } else {
            block
        };
        let mono = to_mono(&block);
        let left = left_channel(&block);
        let right = right_channel(&block);

        let freq_bands = compute_frequency_bands(&mono, sample_rate);
        let spectrum = compute_spectrum(&mono, sample_rate);

        let (centroid, rolloff, flatness) = match &spectrum {
            Some(s) => (spectral_centroid(s), spectral_rolloff(s), spectral_flatness(s)),
            None => (0.5, 0.5, 0.0),
        };

        let fingerprint = Fingerprint {
            frequency: FrequencyBands {
                band_0: freq_bands[0],
                band_1: freq_bands[1],
                band_2: freq_bands[2],
                band_3: freq_bands[3],
                band_4: freq_bands[4],
                band_5: freq_bands[5],
                band_6: freq_bands[6],
            },
            dynamics: Dynamics {
                lufs: estimate_lufs(&mono),
                crest_factor: crest_factor(&mono),
                compression_index: compression_index(&mono, sample_rate),
            },
            temporal: Temporal {
                tempo: tempo_estimate(&mono, sample_rate),
                onset_density: onset_density(&mono, sample_rate),
                percussive_ratio: percussive_ratio(&mono, sample_rate),
                transient_sharpness: transient_sharpness(&mono, sample_rate),
            },
            spectral: SpectralShape { centroid, rolloff, flatness },
            harmonic: Harmonic {
                voiced_ratio: voiced_ratio(&mono, sample_rate),
                fundamental_stability: fundamental_stability(&mono, sample_rate),
                chroma_concentration: chroma_concentration(&mono, sample_rate),
            },
            variation: Variation {
                loudness_variation: loudness_variation(&mono, sample_rate),
                dynamic_range_variation: dynamic_range_variation(&mono, sample_rate),
                spectral_flux: spectral_flux(&mono, sample_rate),
            },
            stereo: Stereo {
                interchannel_correlation: interchannel_correlation(&left, &right),
                stereo_width: stereo_width(&left, &right),
            },
        };

        if !fingerprint.is_finite() {
            return Err(FingerprintError::NonFinite);
        }

        let confidence = (duration_s / CONFIDENCE_FULL_SECONDS).clamp(0.0, 1.0);
        Ok(FingerprintResult { fingerprint, confidence })
    }
}
