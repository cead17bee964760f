//! Plan-driven MessagePack decoder.
//!
//! A single forward pass: the decoder reads exactly the bytes the current
//! value declares and never looks past its end, so it works over an
//! in-memory [`Reader`] and a streaming [`IoSource`] alike.

use std::io::{self, Read};

use msgpack_formatting_buffers::Reader;

use crate::descriptor::{CodecPlan, FloatKind, RecordLayout, TypeDescriptor};
use crate::error::{CodecError, Result};
use crate::marker::{Header, Marker, WireKind};
use crate::timestamp::{Timestamp, TIMESTAMP_EXT};
use crate::value::Value;

/// Default nesting limit. Each level costs a few stack frames, so this stays
/// well inside a 2 MiB thread stack even in unoptimized builds.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Upper bound on speculative allocation for lengths read off a stream.
const STREAM_PREALLOC_LIMIT: usize = 64 * 1024;

/// Where the decoder pulls bytes from.
pub trait ByteSource {
    fn read_u8(&mut self) -> Result<u8>;

    /// Fills `buf` completely or fails with `UnexpectedEndOfInput`.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()>;

    fn read_vec(&mut self, len: usize) -> Result<Vec<u8>>;

    fn read_string(&mut self, len: usize) -> Result<String> {
        String::from_utf8(self.read_vec(len)?).map_err(|_| CodecError::InvalidUtf8)
    }

    /// Bytes still available, when the source knows.
    fn remaining_hint(&self) -> Option<usize> {
        None
    }
}

impl ByteSource for Reader<'_> {
    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.try_u8()?)
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        Ok(self.try_copy_to(buf)?)
    }

    fn read_vec(&mut self, len: usize) -> Result<Vec<u8>> {
        Ok(self.try_buf(len)?.to_vec())
    }

    fn read_string(&mut self, len: usize) -> Result<String> {
        Ok(self.try_utf8(len)?.to_owned())
    }

    fn remaining_hint(&self) -> Option<usize> {
        Some(self.remaining())
    }
}

/// Adapts any [`io::Read`] into a [`ByteSource`].
#[derive(Debug)]
pub struct IoSource<R> {
    inner: R,
    consumed: usize,
}

impl<R: Read> IoSource<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, consumed: 0 }
    }

    /// Bytes consumed so far.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> ByteSource for IoSource<R> {
    fn read_u8(&mut self) -> Result<u8> {
        let mut byte = [0u8; 1];
        self.read_exact(&mut byte)?;
        Ok(byte[0])
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.inner.read_exact(buf).map_err(|err| match err.kind() {
            io::ErrorKind::UnexpectedEof => CodecError::UnexpectedEndOfInput { needed: buf.len() },
            _ => CodecError::Io(err),
        })?;
        self.consumed += buf.len();
        Ok(())
    }

    fn read_vec(&mut self, len: usize) -> Result<Vec<u8>> {
        // A hostile length must not turn into a huge allocation up front;
        // the vector grows only as bytes actually arrive.
        let mut out = Vec::with_capacity(len.min(STREAM_PREALLOC_LIMIT));
        let read = self.inner.by_ref().take(len as u64).read_to_end(&mut out)?;
        self.consumed += read;
        if read < len {
            return Err(CodecError::UnexpectedEndOfInput { needed: len - read });
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderOptions {
    /// Deepest container nesting accepted; deeper input fails with
    /// `DepthLimitExceeded`.
    pub max_depth: usize,
    pub record_layout: RecordLayout,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            record_layout: RecordLayout::default(),
        }
    }
}

/// Reads [`Value`]s from a [`ByteSource`], checking them against a plan.
pub struct Decoder<S> {
    source: S,
    options: DecoderOptions,
}

impl<S: ByteSource> Decoder<S> {
    pub fn new(source: S) -> Self {
        Self::with_options(source, DecoderOptions::default())
    }

    pub fn with_options(source: S, options: DecoderOptions) -> Self {
        Self { source, options }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn into_source(self) -> S {
        self.source
    }

    /// Reads one value shaped by `plan`. Bytes after it are left unread.
    pub fn decode(&mut self, plan: &CodecPlan) -> Result<Value> {
        let marker = self.next_marker()?;
        self.read_value(plan, marker, 0)
    }

    /// Reads one value of any shape.
    pub fn read_any(&mut self) -> Result<Value> {
        let marker = self.next_marker()?;
        self.read_any_at(marker, 0)
    }

    fn next_marker(&mut self) -> Result<Marker> {
        Ok(Marker::from_u8(self.source.read_u8()?))
    }

    fn enter(&self, depth: usize) -> Result<()> {
        if depth > self.options.max_depth {
            return Err(CodecError::DepthLimitExceeded(self.options.max_depth));
        }
        Ok(())
    }

    fn read_value(&mut self, plan: &CodecPlan, marker: Marker, depth: usize) -> Result<Value> {
        self.enter(depth)?;
        let descriptor = plan.descriptor()?;
        let kind = marker.kind();

        match (descriptor, kind) {
            (TypeDescriptor::Alias(inner), _) => self.read_value(inner, marker, depth),
            (TypeDescriptor::Optional(_), WireKind::Nil) => Ok(Value::Nil),
            (TypeDescriptor::Optional(inner), _) => self.read_value(inner, marker, depth),
            (TypeDescriptor::Dynamic, _) => self.read_any_at(marker, depth),
            (_, WireKind::Reserved | WireKind::Ext) => self.read_scalar(plan, descriptor, marker),
            (TypeDescriptor::Sequence(elem), WireKind::Array) => {
                self.read_sequence(elem, marker, depth)
            }
            (TypeDescriptor::Map { key, value }, WireKind::Map) => {
                self.read_map(key, value, marker, depth)
            }
            (TypeDescriptor::Record(fields), _) => self.read_record(plan, fields, marker, depth),
            _ => self.read_scalar(plan, descriptor, marker),
        }
    }

    /// Leaf values of a typed plan. Kept out of [`read_value`](Self::read_value)
    /// so the recursive path carries no scalar locals.
    #[inline(never)]
    fn read_scalar(
        &mut self,
        plan: &CodecPlan,
        descriptor: &TypeDescriptor,
        marker: Marker,
    ) -> Result<Value> {
        let kind = marker.kind();
        match (descriptor, kind) {
            (_, WireKind::Reserved) => Err(CodecError::InvalidMarker(marker.to_u8())),
            (TypeDescriptor::Nil, WireKind::Nil) => Ok(Value::Nil),
            (TypeDescriptor::Bool, WireKind::Bool) => Ok(Value::Bool(marker == Marker::True)),
            (TypeDescriptor::Int(int), WireKind::Integer) => {
                let n = self.read_int(marker)?;
                if !int.contains(n) {
                    return Err(CodecError::schema_mismatch(int.name(), format!("integer {n}")));
                }
                Ok(Value::from_i128(n))
            }
            (TypeDescriptor::Float(FloatKind::F32), WireKind::Float32) => {
                Ok(Value::F32(f32::from_be_bytes(self.read_array()?)))
            }
            (TypeDescriptor::Float(FloatKind::F64), WireKind::Float32) => {
                Ok(Value::F64(f32::from_be_bytes(self.read_array()?) as f64))
            }
            (TypeDescriptor::Float(FloatKind::F64), WireKind::Float64) => {
                Ok(Value::F64(f64::from_be_bytes(self.read_array()?)))
            }
            (TypeDescriptor::Str, WireKind::Str) => {
                let len = self.read_len(marker)?;
                Ok(Value::Str(self.source.read_string(len)?))
            }
            (TypeDescriptor::Bin, WireKind::Bin) => {
                let len = self.read_len(marker)?;
                Ok(Value::Bin(self.source.read_vec(len)?))
            }
            (TypeDescriptor::Timestamp, WireKind::Ext) => {
                let len = self.read_len(marker)?;
                let ty = self.source.read_u8()? as i8;
                if ty != TIMESTAMP_EXT {
                    return Err(CodecError::UnsupportedExtension(ty));
                }
                let payload = self.source.read_vec(len)?;
                Timestamp::from_ext_payload(&payload)?;
                Ok(Value::Ext(ty, payload))
            }
            (_, WireKind::Ext) => {
                self.read_len(marker)?;
                let ty = self.source.read_u8()? as i8;
                Err(CodecError::UnsupportedExtension(ty))
            }
            (descriptor, _) => Err(CodecError::schema_mismatch(
                format!("{} for `{}`", descriptor.summary(), plan.type_name()),
                kind.name(),
            )),
        }
    }

    #[inline(never)]
    fn read_sequence(&mut self, elem: &CodecPlan, marker: Marker, depth: usize) -> Result<Value> {
        let len = self.read_len(marker)?;
        let mut items = Vec::with_capacity(self.capacity_for(len));
        for _ in 0..len {
            let marker = self.next_marker()?;
            items.push(self.read_value(elem, marker, depth + 1)?);
        }
        Ok(Value::Array(items))
    }

    #[inline(never)]
    fn read_map(
        &mut self,
        key: &CodecPlan,
        value: &CodecPlan,
        marker: Marker,
        depth: usize,
    ) -> Result<Value> {
        let len = self.read_len(marker)?;
        let mut pairs = Vec::with_capacity(self.capacity_for(len));
        for _ in 0..len {
            let marker = self.next_marker()?;
            let k = self.read_value(key, marker, depth + 1)?;
            let marker = self.next_marker()?;
            let v = self.read_value(value, marker, depth + 1)?;
            pairs.push((k, v));
        }
        Ok(Value::Map(pairs))
    }

    #[inline(never)]
    fn read_record(
        &mut self,
        plan: &CodecPlan,
        fields: &[crate::descriptor::Field],
        marker: Marker,
        depth: usize,
    ) -> Result<Value> {
        let expected = match self.options.record_layout {
            RecordLayout::Array => WireKind::Array,
            RecordLayout::Map => WireKind::Map,
        };
        if marker.kind() != expected {
            return Err(CodecError::schema_mismatch(
                format!("record `{}` as {}", plan.type_name(), expected.name()),
                marker.kind().name(),
            ));
        }
        let len = self.read_len(marker)?;
        if len != fields.len() {
            return Err(CodecError::schema_mismatch(
                format!("{} fields for `{}`", fields.len(), plan.type_name()),
                format!("{len} fields"),
            ));
        }

        if expected == WireKind::Array {
            let mut items = Vec::with_capacity(len);
            for field in fields {
                let marker = self.next_marker()?;
                items.push(self.read_value(&field.plan, marker, depth + 1)?);
            }
            return Ok(Value::Array(items));
        }

        let mut slots: Vec<Option<Value>> = vec![None; len];
        for _ in 0..len {
            let marker = self.next_marker()?;
            let name = match self.read_any_at(marker, depth + 1)? {
                Value::Str(name) => name,
                other => {
                    return Err(CodecError::schema_mismatch("field name", other.kind_name()));
                }
            };
            let index = fields
                .iter()
                .position(|f| f.name == name)
                .ok_or_else(|| {
                    CodecError::schema_mismatch(
                        format!("a field of `{}`", plan.type_name()),
                        format!("unknown field `{name}`"),
                    )
                })?;
            if slots[index].is_some() {
                return Err(CodecError::schema_mismatch(
                    "distinct field names",
                    format!("duplicate field `{name}`"),
                ));
            }
            let marker = self.next_marker()?;
            slots[index] = Some(self.read_value(&fields[index].plan, marker, depth + 1)?);
        }
        // Counts match and names are distinct, so every slot is filled.
        Ok(Value::Array(slots.into_iter().flatten().collect()))
    }

    fn read_any_at(&mut self, marker: Marker, depth: usize) -> Result<Value> {
        self.enter(depth)?;
        match marker.kind() {
            WireKind::Array => self.read_any_array(marker, depth),
            WireKind::Map => self.read_any_map(marker, depth),
            _ => self.read_any_scalar(marker),
        }
    }

    /// Everything but containers, which [`read_any_at`](Self::read_any_at)
    /// dispatches itself.
    #[inline(never)]
    fn read_any_scalar(&mut self, marker: Marker) -> Result<Value> {
        Ok(match marker.kind() {
            WireKind::Nil => Value::Nil,
            WireKind::Bool => Value::Bool(marker == Marker::True),
            WireKind::Integer => Value::from_i128(self.read_int(marker)?),
            WireKind::Float32 => Value::F32(f32::from_be_bytes(self.read_array()?)),
            WireKind::Float64 => Value::F64(f64::from_be_bytes(self.read_array()?)),
            WireKind::Str => {
                let len = self.read_len(marker)?;
                Value::Str(self.source.read_string(len)?)
            }
            WireKind::Bin => {
                let len = self.read_len(marker)?;
                Value::Bin(self.source.read_vec(len)?)
            }
            WireKind::Ext => {
                let len = self.read_len(marker)?;
                let ty = self.source.read_u8()? as i8;
                Value::Ext(ty, self.source.read_vec(len)?)
            }
            WireKind::Array | WireKind::Map | WireKind::Reserved => {
                return Err(CodecError::InvalidMarker(marker.to_u8()));
            }
        })
    }

    #[inline(never)]
    fn read_any_array(&mut self, marker: Marker, depth: usize) -> Result<Value> {
        let len = self.read_len(marker)?;
        let mut items = Vec::with_capacity(self.capacity_for(len));
        for _ in 0..len {
            let marker = self.next_marker()?;
            items.push(self.read_any_at(marker, depth + 1)?);
        }
        Ok(Value::Array(items))
    }

    #[inline(never)]
    fn read_any_map(&mut self, marker: Marker, depth: usize) -> Result<Value> {
        let len = self.read_len(marker)?;
        let mut pairs = Vec::with_capacity(self.capacity_for(len));
        for _ in 0..len {
            let marker = self.next_marker()?;
            let k = self.read_any_at(marker, depth + 1)?;
            let marker = self.next_marker()?;
            let v = self.read_any_at(marker, depth + 1)?;
            pairs.push((k, v));
        }
        Ok(Value::Map(pairs))
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut bytes = [0u8; N];
        self.source.read_exact(&mut bytes)?;
        Ok(bytes)
    }

    /// Integer payload of an integer marker, widened to `i128`.
    fn read_int(&mut self, marker: Marker) -> Result<i128> {
        Ok(match marker {
            Marker::PositiveFixInt(n) => n as i128,
            Marker::NegativeFixInt(n) => n as i128,
            Marker::UInt8 => self.source.read_u8()? as i128,
            Marker::UInt16 => u16::from_be_bytes(self.read_array()?) as i128,
            Marker::UInt32 => u32::from_be_bytes(self.read_array()?) as i128,
            Marker::UInt64 => u64::from_be_bytes(self.read_array()?) as i128,
            Marker::Int8 => self.source.read_u8()? as i8 as i128,
            Marker::Int16 => i16::from_be_bytes(self.read_array()?) as i128,
            Marker::Int32 => i32::from_be_bytes(self.read_array()?) as i128,
            Marker::Int64 => i64::from_be_bytes(self.read_array()?) as i128,
            other => {
                return Err(CodecError::schema_mismatch("integer", other.kind().name()));
            }
        })
    }

    /// Length carried by a marker: inline, fixed by the tag, or in the
    /// length field that follows it.
    fn read_len(&mut self, marker: Marker) -> Result<usize> {
        Ok(match marker.header() {
            Header::None => 0,
            Header::Inline(n) | Header::Fixed(n) => n as usize,
            Header::Follows(1) => self.source.read_u8()? as usize,
            Header::Follows(2) => u16::from_be_bytes(self.read_array()?) as usize,
            Header::Follows(_) => u32::from_be_bytes(self.read_array()?) as usize,
        })
    }

    /// Every element takes at least one byte, so a declared count larger
    /// than what the source still holds is never worth allocating for.
    fn capacity_for(&self, len: usize) -> usize {
        match self.source.remaining_hint() {
            Some(remaining) => len.min(remaining),
            None => len.min(STREAM_PREALLOC_LIMIT),
        }
    }
}
