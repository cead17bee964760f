//! [`Codec`]: a schema cache bundled with encoder and decoder options.

use std::any::Any;
use std::io::{Read, Write};
use std::sync::Arc;

use msgpack_formatting_buffers::Reader;

use crate::cache::SchemaCache;
use crate::decoder::{ByteSource, Decoder, DecoderOptions, IoSource, DEFAULT_MAX_DEPTH};
use crate::descriptor::RecordLayout;
use crate::encoder::{Encoder, EncoderOptions};
use crate::error::Result;
use crate::types::{MsgPackType, TypeHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecOptions {
    pub max_depth: usize,
    pub record_layout: RecordLayout,
    /// Initial capacity of each encoder's buffer.
    pub write_buffer_capacity: usize,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            record_layout: RecordLayout::default(),
            write_buffer_capacity: 256,
        }
    }
}

/// Typed entry point to the codec.
///
/// Cheap to clone: clones share one [`SchemaCache`]. Encoders and decoders
/// are created per call and hold no state between calls.
#[derive(Debug, Clone, Default)]
pub struct Codec {
    cache: Arc<SchemaCache>,
    options: CodecOptions,
}

impl Codec {
    pub fn new() -> Self {
        Self::default()
    }

    /// A codec sharing an existing cache.
    pub fn with_cache(cache: Arc<SchemaCache>) -> Self {
        Self {
            cache,
            options: CodecOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CodecOptions) -> Self {
        self.options = options;
        self
    }

    pub fn cache(&self) -> &Arc<SchemaCache> {
        &self.cache
    }

    pub fn options(&self) -> CodecOptions {
        self.options
    }

    fn encoder(&self) -> Encoder {
        Encoder::with_capacity(
            self.options.write_buffer_capacity,
            EncoderOptions {
                record_layout: self.options.record_layout,
            },
        )
    }

    fn decoder<S: ByteSource>(&self, source: S) -> Decoder<S> {
        Decoder::with_options(
            source,
            DecoderOptions {
                max_depth: self.options.max_depth,
                record_layout: self.options.record_layout,
            },
        )
    }

    pub fn encode<T: MsgPackType>(&self, value: &T) -> Result<Vec<u8>> {
        let plan = self.cache.resolve::<T>()?;
        self.encoder().encode(&value.to_value(), &plan)
    }

    /// Encodes into `sink`; returns the number of bytes written.
    pub fn encode_to<T: MsgPackType, W: Write>(&self, value: &T, sink: &mut W) -> Result<usize> {
        let plan = self.cache.resolve::<T>()?;
        self.encoder().encode_to(&value.to_value(), &plan, sink)
    }

    /// Decodes the first value in `bytes`.
    pub fn decode<T: MsgPackType>(&self, bytes: &[u8]) -> Result<T> {
        let plan = self.cache.resolve::<T>()?;
        let value = self.decoder(Reader::new(bytes)).decode(&plan)?;
        T::from_value(value)
    }

    /// Decodes one value from a stream, reading no further than its end.
    pub fn decode_from<T: MsgPackType, R: Read>(&self, reader: R) -> Result<T> {
        let plan = self.cache.resolve::<T>()?;
        let value = self.decoder(IoSource::new(reader)).decode(&plan)?;
        T::from_value(value)
    }

    /// Encodes a value known only as `dyn Any`. Fails with `TypeMismatch`
    /// when `value` is not of `handle`'s type.
    pub fn encode_erased(&self, handle: &TypeHandle, value: &dyn Any) -> Result<Vec<u8>> {
        let plan = self.cache.resolve_handle(handle)?;
        self.encoder().encode(&handle.to_value(value)?, &plan)
    }

    pub fn encode_erased_to<W: Write>(
        &self,
        handle: &TypeHandle,
        value: &dyn Any,
        sink: &mut W,
    ) -> Result<usize> {
        let plan = self.cache.resolve_handle(handle)?;
        self.encoder().encode_to(&handle.to_value(value)?, &plan, sink)
    }

    pub fn decode_erased(&self, handle: &TypeHandle, bytes: &[u8]) -> Result<Box<dyn Any + Send>> {
        let plan = self.cache.resolve_handle(handle)?;
        let value = self.decoder(Reader::new(bytes)).decode(&plan)?;
        handle.from_value(value)
    }

    pub fn decode_erased_from<R: Read>(
        &self,
        handle: &TypeHandle,
        reader: R,
    ) -> Result<Box<dyn Any + Send>> {
        let plan = self.cache.resolve_handle(handle)?;
        let value = self.decoder(IoSource::new(reader)).decode(&plan)?;
        handle.from_value(value)
    }
}
