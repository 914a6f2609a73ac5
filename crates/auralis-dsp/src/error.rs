use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DspError {
    #[error("stage input contained a non-finite sample")]
    NonFiniteInput,
}
