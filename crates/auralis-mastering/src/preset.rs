use serde::{Deserialize, Serialize};

/// A named bias applied on top of the adaptive target (spec §3). `Adaptive`
/// is the default and the only preset that derives its curve purely from
/// the fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Preset {
    Adaptive,
    Gentle,
    Warm,
    Bright,
    Punchy,
}

impl Default for Preset {
    fn default() -> Self {
        Preset::Adaptive
    }
}
