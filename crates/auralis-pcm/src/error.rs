use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeErrorKind {
    Unsupported,
    Corrupt,
    Io,
}

#[derive(Error, Debug)]
#[error("decode error ({kind:?}): {message}")]
pub struct DecodeError {
    pub kind: DecodeErrorKind,
    pub message: String,
}

impl DecodeError {
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self {
            kind: DecodeErrorKind::Unsupported,
            message: message.into(),
        }
    }

    pub fn corrupt(message: impl Into<String>) -> Self {
        Self {
            kind: DecodeErrorKind::Corrupt,
            message: message.into(),
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self {
            kind: DecodeErrorKind::Io,
            message: message.into(),
        }
    }
}
