//! The MessagePack media type formatter.

use std::any::Any;
use std::fmt;
use std::io::{self, Read, Write};
use std::sync::Arc;

use msgpack_formatting_codec::{Codec, MsgPackType, SchemaCache, TypeHandle};

use crate::config::FormatterConfig;
use crate::error::FormatterError;
use crate::host::{FormatterHost, FormatterLogger};

pub const MEDIA_TYPE: &str = "application/x-msgpack";

/// Result of reading a request body.
pub enum ReadOutcome {
    /// The body was empty, or a logged decode failure left nothing to
    /// substitute.
    NoValue,
    Value(Box<dyn Any + Send>),
}

impl ReadOutcome {
    pub fn is_no_value(&self) -> bool {
        matches!(self, ReadOutcome::NoValue)
    }

    pub fn downcast<T: Any>(self) -> Option<T> {
        match self {
            ReadOutcome::Value(value) => value.downcast::<T>().ok().map(|value| *value),
            ReadOutcome::NoValue => None,
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            ReadOutcome::Value(value) => value.downcast_ref::<T>(),
            ReadOutcome::NoValue => None,
        }
    }
}

impl fmt::Debug for ReadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadOutcome::NoValue => f.write_str("NoValue"),
            ReadOutcome::Value(_) => f.write_str("Value(..)"),
        }
    }
}

/// Plugs the codec into a host's content negotiation.
///
/// Reads may downgrade a decode failure to a logged error plus the type's
/// zero value, but only when the caller passes a logger. Writes never
/// downgrade.
#[derive(Debug, Clone)]
pub struct MessagePackFormatter {
    codec: Codec,
    config: FormatterConfig,
}

impl Default for MessagePackFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl MessagePackFormatter {
    pub fn new() -> Self {
        Self::with_config(FormatterConfig::default())
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self::with_cache(Arc::new(SchemaCache::new()), config)
    }

    /// A formatter whose plans live in `cache`, e.g. one shared with other
    /// formatters in the process.
    pub fn with_cache(cache: Arc<SchemaCache>, config: FormatterConfig) -> Self {
        Self {
            codec: Codec::with_cache(cache).with_options(config.codec_options()),
            config,
        }
    }

    pub fn config(&self) -> &FormatterConfig {
        &self.config
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    pub fn supported_media_types(&self) -> &[String] {
        &self.config.media_types
    }

    /// Announces every configured media type to the host.
    pub fn register(&self, host: &mut dyn FormatterHost) {
        for media_type in &self.config.media_types {
            host.register_media_type(media_type);
        }
        tracing::debug!(
            media_types = self.config.media_types.len(),
            "registered msgpack formatter"
        );
    }

    /// Concrete types and sequence-like types can be read. Element types of
    /// sequences are checked only when a value is actually decoded.
    pub fn can_read_type(&self, ty: &TypeHandle) -> bool {
        ty.is_admissible()
    }

    pub fn can_write_type(&self, ty: &TypeHandle) -> bool {
        ty.is_admissible()
    }

    /// Decodes a request body of type `ty`.
    ///
    /// A declared `content_length` of zero, or an empty body, yields
    /// [`ReadOutcome::NoValue`] without running the decoder.
    pub fn read_from_stream<R: Read>(
        &self,
        ty: &TypeHandle,
        stream: R,
        content_length: Option<u64>,
        logger: Option<&dyn FormatterLogger>,
    ) -> Result<ReadOutcome, FormatterError> {
        if content_length == Some(0) {
            tracing::debug!(type_name = ty.name(), "empty body, nothing to decode");
            return Ok(ReadOutcome::NoValue);
        }

        let err = match self.read_body(ty, stream, content_length) {
            Ok(Some(value)) => return Ok(ReadOutcome::Value(value)),
            Ok(None) => {
                tracing::debug!(type_name = ty.name(), "empty body, nothing to decode");
                return Ok(ReadOutcome::NoValue);
            }
            Err(err) => err,
        };

        let Some(logger) = logger else {
            return Err(err);
        };
        logger.log_error("", &err.to_string());
        tracing::warn!(
            type_name = ty.name(),
            error = %err,
            "decode failure replaced by the default value"
        );
        Ok(ty
            .zero_value()
            .map_or(ReadOutcome::NoValue, ReadOutcome::Value))
    }

    /// [`read_from_stream`](Self::read_from_stream) with the host's own
    /// logger deciding whether failures are downgraded.
    pub fn read_for_host<R: Read>(
        &self,
        host: &dyn FormatterHost,
        ty: &TypeHandle,
        stream: R,
        content_length: Option<u64>,
    ) -> Result<ReadOutcome, FormatterError> {
        self.read_from_stream(ty, stream, content_length, host.logger())
    }

    fn read_body<R: Read>(
        &self,
        ty: &TypeHandle,
        mut stream: R,
        content_length: Option<u64>,
    ) -> Result<Option<Box<dyn Any + Send>>, FormatterError> {
        let limit = self.config.max_body_bytes;
        if let (Some(limit), Some(length)) = (limit, content_length) {
            if length > limit {
                return Err(FormatterError::PayloadTooLarge { length, limit });
            }
        }

        if self.config.buffer_input {
            let mut body = Vec::new();
            match limit {
                Some(limit) => {
                    stream.by_ref().take(limit.saturating_add(1)).read_to_end(&mut body)?;
                    if body.len() as u64 > limit {
                        return Err(FormatterError::PayloadTooLarge {
                            length: body.len() as u64,
                            limit,
                        });
                    }
                }
                None => {
                    stream.read_to_end(&mut body)?;
                }
            }
            if body.is_empty() {
                return Ok(None);
            }
            tracing::debug!(type_name = ty.name(), bytes = body.len(), "decoding body");
            return Ok(Some(self.codec.decode_erased(ty, &body)?));
        }

        // Unbuffered: only the first byte is read up front, to tell an empty
        // body apart from a truncated one.
        let mut first = [0u8; 1];
        let read = loop {
            match stream.read(&mut first) {
                Ok(n) => break n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        };
        if read == 0 {
            return Ok(None);
        }
        if limit == Some(0) {
            return Err(FormatterError::PayloadTooLarge {
                length: 1,
                limit: 0,
            });
        }
        let rest = stream.take(limit.map_or(u64::MAX, |limit| limit.saturating_sub(1)));
        let body = first.as_slice().chain(rest);
        Ok(Some(self.codec.decode_erased_from(ty, body)?))
    }

    /// Encodes `value`, which must be of type `ty`, into `stream`. Returns
    /// the number of bytes written.
    pub fn write_to_stream<W: Write>(
        &self,
        ty: &TypeHandle,
        value: &dyn Any,
        stream: &mut W,
    ) -> Result<usize, FormatterError> {
        let written = self.codec.encode_erased_to(ty, value, stream)?;
        tracing::debug!(type_name = ty.name(), bytes = written, "wrote body");
        Ok(written)
    }

    /// Collects `items` into a list and writes it as one array.
    pub fn write_sequence<T, I, W>(&self, items: I, stream: &mut W) -> Result<usize, FormatterError>
    where
        T: MsgPackType,
        I: IntoIterator<Item = T>,
        W: Write,
    {
        let list: Vec<T> = items.into_iter().collect();
        self.write(&list, stream)
    }

    /// Typed [`read_from_stream`](Self::read_from_stream). `None` means no
    /// value.
    pub fn read<T: MsgPackType, R: Read>(
        &self,
        stream: R,
        content_length: Option<u64>,
        logger: Option<&dyn FormatterLogger>,
    ) -> Result<Option<T>, FormatterError> {
        let outcome =
            self.read_from_stream(&TypeHandle::of::<T>(), stream, content_length, logger)?;
        Ok(outcome.downcast::<T>())
    }

    pub fn write<T: MsgPackType, W: Write>(
        &self,
        value: &T,
        stream: &mut W,
    ) -> Result<usize, FormatterError> {
        self.write_to_stream(&TypeHandle::of::<T>(), value, stream)
    }
}
