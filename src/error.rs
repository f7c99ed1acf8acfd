use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("framing mismatch: leading marker {leading}, trailing marker {trailing}")]
    FramingMismatch { leading: i32, trailing: i32 },
    #[error("truncated record")]
    TruncatedRecord,
    #[error("unknown type tag: {0:?}")]
    UnknownTypeTag(String),
    #[error("header parse error: {0}")]
    HeaderParse(String),
    #[error("solution block has no keywords")]
    EmptySolutionBlock,
    #[error("write error: {0}")]
    Write(String),
    #[error("stream unusable after an earlier failure")]
    Unusable,
    #[error("report step index {0} out of range")]
    StepOutOfRange(usize),
    #[error("lock poisoned: {0}")]
    Poisoned(&'static str),
}

impl Error {
    pub(crate) fn decode(msg: impl Into<String>) -> Self {
        Error::Decode(msg.into())
    }

    pub(crate) fn header(msg: impl Into<String>) -> Self {
        Error::HeaderParse(msg.into())
    }

    pub(crate) fn write(msg: impl Into<String>) -> Self {
        Error::Write(msg.into())
    }

    /// True for errors raised because the bytes on disk are not a valid
    /// keyword stream (as opposed to I/O or caller misuse).
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Error::Decode(_)
                | Error::FramingMismatch { .. }
                | Error::TruncatedRecord
                | Error::UnknownTypeTag(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
