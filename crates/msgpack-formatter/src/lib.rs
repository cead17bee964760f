//! MessagePack media type formatter.
//!
//! Decides which types can be carried as `application/x-msgpack`, moves
//! bodies between host streams and the codec, and turns decode failures into
//! host log entries when the host asks for that. The codec itself lives in
//! [`msgpack_formatting_codec`], re-exported here as [`codec`].

mod config;
mod error;
mod formatter;
mod host;

pub use config::{ConfigError, FormatterConfig};
pub use error::FormatterError;
pub use formatter::{MessagePackFormatter, ReadOutcome, MEDIA_TYPE};
pub use host::{FormatterHost, FormatterLogger, TracingLogger};

pub use msgpack_formatting_codec as codec;
pub use msgpack_formatting_codec::{msgpack_record, MsgPackType, TypeHandle};
