//! Codec error taxonomy.

use std::io;

use msgpack_formatting_buffers::BufferError;
use thiserror::Error;

/// Every failure the codec reports. Errors are returned to the immediate
/// caller; the codec never logs or swallows them.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The type cannot be mapped to any wire shape.
    #[error("type `{type_name}` cannot be mapped to MessagePack: {reason}")]
    UnsupportedType {
        type_name: &'static str,
        reason: &'static str,
    },
    /// A value's runtime shape disagrees with its descriptor at encode time.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },
    /// Decoded data disagrees with the plan (element or field count, or
    /// wire kind).
    #[error("schema mismatch: expected {expected}, found {found}")]
    SchemaMismatch { expected: String, found: String },
    /// The source ran dry before a declared length was satisfied.
    #[error("unexpected end of input: needed {needed} more byte(s)")]
    UnexpectedEndOfInput { needed: usize },
    #[error("unsupported extension type {0}")]
    UnsupportedExtension(i8),
    #[error("invalid marker byte 0x{0:02x}")]
    InvalidMarker(u8),
    #[error("invalid UTF-8 in string payload")]
    InvalidUtf8,
    #[error("length {0} exceeds the MessagePack 32-bit limit")]
    LengthOverflow(usize),
    #[error("nesting depth exceeds the limit of {0}")]
    DepthLimitExceeded(usize),
    #[error(transparent)]
    Io(io::Error),
}

impl CodecError {
    pub fn unsupported<T: ?Sized>(reason: &'static str) -> Self {
        CodecError::UnsupportedType {
            type_name: std::any::type_name::<T>(),
            reason,
        }
    }

    pub(crate) fn type_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        CodecError::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub(crate) fn schema_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        CodecError::SchemaMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }
}

impl From<BufferError> for CodecError {
    fn from(err: BufferError) -> Self {
        match err {
            BufferError::EndOfBuffer { needed, remaining } => CodecError::UnexpectedEndOfInput {
                needed: needed - remaining,
            },
            BufferError::InvalidUtf8 { .. } => CodecError::InvalidUtf8,
        }
    }
}

impl From<io::Error> for CodecError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => CodecError::UnexpectedEndOfInput { needed: 1 },
            _ => CodecError::Io(err),
        }
    }
}

pub type Result<T, E = CodecError> = std::result::Result<T, E>;
