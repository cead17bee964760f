//! Byte buffers for the MessagePack codec.
//!
//! - [`Writer`] is an append-only, auto-growing sink with big-endian helpers.
//! - [`Reader`] is a forward-only cursor whose reads never panic.

mod reader;
mod writer;

pub use reader::Reader;
pub use writer::Writer;

/// Errors raised by [`Reader`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
    #[error("end of buffer: needed {needed} byte(s), {remaining} remaining")]
    EndOfBuffer { needed: usize, remaining: usize },
    #[error("invalid UTF-8 at offset {offset}")]
    InvalidUtf8 { offset: usize },
}
