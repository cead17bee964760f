use std::io;

use msgpack_formatting_codec::CodecError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FormatterError {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("request body of {length} bytes exceeds the limit of {limit} bytes")]
    PayloadTooLarge { length: u64, limit: u64 },
    #[error("failed to read request body: {0}")]
    Io(#[from] io::Error),
}
