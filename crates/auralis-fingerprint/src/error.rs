use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FingerprintError {
    #[error("insufficient audio for reliable fingerprinting")]
    InsufficientAudio,
    #[error("fingerprint computation produced a non-finite value")]
    NonFinite,
}
