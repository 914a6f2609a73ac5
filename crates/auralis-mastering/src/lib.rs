//! Maps a track's fingerprint to a mastering target and runs the DSP
//! stage chain that realizes it (spec components C4 and C6).

mod hybrid_processor;
mod preset;
mod target_generator;

pub use auralis_dsp::MasteringTarget;
pub use hybrid_processor::HybridProcessor;
pub use preset::Preset;
pub use target_generator::generate;
