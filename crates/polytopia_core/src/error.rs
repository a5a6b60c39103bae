use std::io;

use crate::layout::OffsetKey;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("truncated input at offset {offset}: need {needed} bytes, {available} available")]
    TruncatedInput {
        offset: u64,
        needed: usize,
        available: usize,
    },

    #[error("corrupt save: {0}")]
    CorruptSave(String),

    #[error("unsupported task type {kind} at offset {offset}")]
    UnsupportedTaskType { kind: i16, offset: u64 },

    #[error("unsupported variant: {0}")]
    UnsupportedVariant(String),

    #[error("no offset recorded for {0}")]
    UnknownOffsetKey(OffsetKey),

    #[error("offset for {0} was shifted by an earlier patch; decode again before using it")]
    StaleOffsetKey(OffsetKey),

    #[error("no player or tribe with id {0}")]
    UnknownPlayer(u8),

    #[error("{field} value {value} out of range {min}..={max}")]
    ValueOutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn corrupt(message: impl Into<String>) -> Self {
        Error::CorruptSave(message.into())
    }
}

/// Checks that `value` fits in `min..=max` before it is narrowed for the wire.
pub(crate) fn ensure_range(field: &'static str, value: i64, min: i64, max: i64) -> Result<()> {
    if value < min || value > max {
        return Err(Error::ValueOutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}
