//! Plan-driven MessagePack encoder.

use std::io::Write;

use msgpack_formatting_buffers::Writer;

use crate::descriptor::{CodecPlan, FloatKind, RecordLayout, TypeDescriptor};
use crate::error::{CodecError, Result};
use crate::marker::{Header, Marker};
use crate::timestamp::TIMESTAMP_EXT;
use crate::value::Value;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncoderOptions {
    pub record_layout: RecordLayout,
}

/// Writes [`Value`]s into a [`Writer`], checking each one against a plan.
///
/// Always picks the most compact tag for a value. A failed top-level write
/// leaves the writer as it was before the call.
pub struct Encoder {
    pub writer: Writer,
    options: EncoderOptions,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder {
    pub fn new() -> Self {
        Self::with_options(EncoderOptions::default())
    }

    pub fn with_options(options: EncoderOptions) -> Self {
        Self {
            writer: Writer::new(),
            options,
        }
    }

    pub fn with_capacity(capacity: usize, options: EncoderOptions) -> Self {
        Self {
            writer: Writer::with_capacity(capacity),
            options,
        }
    }

    pub fn options(&self) -> EncoderOptions {
        self.options
    }

    /// Encodes one value and returns its bytes.
    pub fn encode(&mut self, value: &Value, plan: &CodecPlan) -> Result<Vec<u8>> {
        self.writer.clear();
        self.write(value, plan)?;
        Ok(self.writer.flush())
    }

    /// Encodes one value into `sink`. Nothing reaches the sink unless the
    /// whole value encoded. Returns the number of bytes written.
    pub fn encode_to<W: Write>(
        &mut self,
        value: &Value,
        plan: &CodecPlan,
        sink: &mut W,
    ) -> Result<usize> {
        self.writer.clear();
        self.write(value, plan)?;
        let written = self.writer.len();
        let result = sink.write_all(self.writer.as_slice());
        self.writer.clear();
        result.map_err(CodecError::Io)?;
        Ok(written)
    }

    /// Appends one value to the writer, rolling back on failure.
    pub fn write(&mut self, value: &Value, plan: &CodecPlan) -> Result<()> {
        let mark = self.writer.mark();
        let result = self.write_planned(value, plan);
        if result.is_err() {
            self.writer.rollback(mark);
        }
        result
    }

    fn write_planned(&mut self, value: &Value, plan: &CodecPlan) -> Result<()> {
        let descriptor = plan.descriptor()?;
        match (descriptor, value) {
            (TypeDescriptor::Alias(inner), _) => self.write_planned(value, inner),
            (TypeDescriptor::Optional(_), Value::Nil) => {
                self.write_nil();
                Ok(())
            }
            (TypeDescriptor::Optional(inner), _) => self.write_planned(value, inner),
            (TypeDescriptor::Dynamic, _) => self.write_any(value),
            (TypeDescriptor::Nil, Value::Nil) => {
                self.write_nil();
                Ok(())
            }
            (TypeDescriptor::Bool, Value::Bool(b)) => {
                self.write_bool(*b);
                Ok(())
            }
            (TypeDescriptor::Int(kind), Value::Int(_) | Value::UInt(_)) => {
                let n = value.as_i128().unwrap_or_default();
                if !kind.contains(n) {
                    return Err(CodecError::type_mismatch(
                        kind.name(),
                        format!("integer {n}"),
                    ));
                }
                self.write_int(value);
                Ok(())
            }
            (TypeDescriptor::Float(FloatKind::F32), Value::F32(f)) => {
                self.write_f32(*f);
                Ok(())
            }
            (TypeDescriptor::Float(FloatKind::F64), Value::F64(f)) => {
                self.write_f64(*f);
                Ok(())
            }
            (TypeDescriptor::Str, Value::Str(s)) => self.write_str(s),
            (TypeDescriptor::Bin, Value::Bin(b)) => self.write_bin(b),
            (TypeDescriptor::Timestamp, Value::Ext(TIMESTAMP_EXT, payload)) => {
                self.write_ext(TIMESTAMP_EXT, payload)
            }
            (TypeDescriptor::Sequence(elem), Value::Array(items)) => {
                self.write_arr_hdr(items.len())?;
                for item in items {
                    self.write_planned(item, elem)?;
                }
                Ok(())
            }
            (TypeDescriptor::Map { key, value: val }, Value::Map(pairs)) => {
                self.write_map_hdr(pairs.len())?;
                for (k, v) in pairs {
                    self.write_planned(k, key)?;
                    self.write_planned(v, val)?;
                }
                Ok(())
            }
            (TypeDescriptor::Record(fields), Value::Array(items)) => {
                if items.len() != fields.len() {
                    return Err(CodecError::type_mismatch(
                        format!("{} record fields", fields.len()),
                        format!("{} values", items.len()),
                    ));
                }
                match self.options.record_layout {
                    RecordLayout::Array => {
                        self.write_arr_hdr(fields.len())?;
                        for (field, item) in fields.iter().zip(items) {
                            self.write_planned(item, &field.plan)?;
                        }
                    }
                    RecordLayout::Map => {
                        self.write_map_hdr(fields.len())?;
                        for (field, item) in fields.iter().zip(items) {
                            self.write_str(field.name)?;
                            self.write_planned(item, &field.plan)?;
                        }
                    }
                }
                Ok(())
            }
            (descriptor, value) => Err(CodecError::type_mismatch(
                format!("{} for `{}`", descriptor.summary(), plan.type_name()),
                value.kind_name(),
            )),
        }
    }

    /// Writes any value without a plan.
    pub fn write_any(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Nil => self.write_nil(),
            Value::Bool(b) => self.write_bool(*b),
            Value::Int(_) | Value::UInt(_) => self.write_int(value),
            Value::F32(f) => self.write_f32(*f),
            Value::F64(f) => self.write_f64(*f),
            Value::Str(s) => return self.write_str(s),
            Value::Bin(b) => return self.write_bin(b),
            Value::Array(items) => {
                self.write_arr_hdr(items.len())?;
                for item in items {
                    self.write_any(item)?;
                }
            }
            Value::Map(pairs) => {
                self.write_map_hdr(pairs.len())?;
                for (k, v) in pairs {
                    self.write_any(k)?;
                    self.write_any(v)?;
                }
            }
            Value::Ext(ty, payload) => return self.write_ext(*ty, payload),
        }
        Ok(())
    }

    pub fn write_nil(&mut self) {
        self.writer.u8(Marker::Nil.to_u8());
    }

    pub fn write_bool(&mut self, b: bool) {
        let marker = if b { Marker::True } else { Marker::False };
        self.writer.u8(marker.to_u8());
    }

    fn write_int(&mut self, value: &Value) {
        match *value {
            Value::UInt(n) => self.write_u64(n),
            Value::Int(n) => self.write_i64(n),
            _ => {}
        }
    }

    pub fn write_u64(&mut self, n: u64) {
        let marker = Marker::for_uint(n);
        let tag = marker.to_u8();
        match marker {
            Marker::PositiveFixInt(b) => self.writer.u8(b),
            Marker::UInt8 => {
                self.writer.u8(tag);
                self.writer.u8(n as u8);
            }
            Marker::UInt16 => self.writer.u8u16(tag, n as u16),
            Marker::UInt32 => self.writer.u8u32(tag, n as u32),
            _ => self.writer.u8u64(tag, n),
        }
    }

    pub fn write_i64(&mut self, n: i64) {
        if n >= 0 {
            return self.write_u64(n as u64);
        }
        let marker = Marker::for_int(n);
        let tag = marker.to_u8();
        match marker {
            Marker::NegativeFixInt(b) => self.writer.i8(b),
            Marker::Int8 => {
                self.writer.u8(tag);
                self.writer.i8(n as i8);
            }
            Marker::Int16 => self.writer.u8u16(tag, n as i16 as u16),
            Marker::Int32 => self.writer.u8u32(tag, n as i32 as u32),
            _ => self.writer.u8u64(tag, n as u64),
        }
    }

    pub fn write_f32(&mut self, f: f32) {
        self.writer.u8f32(Marker::Float32.to_u8(), f);
    }

    pub fn write_f64(&mut self, f: f64) {
        self.writer.u8f64(Marker::Float64.to_u8(), f);
    }

    pub fn write_str(&mut self, s: &str) -> Result<()> {
        self.write_hdr(Marker::for_str_len(s.len())?, s.len());
        self.writer.utf8(s);
        Ok(())
    }

    pub fn write_bin(&mut self, b: &[u8]) -> Result<()> {
        self.write_hdr(Marker::for_bin_len(b.len())?, b.len());
        self.writer.buf(b);
        Ok(())
    }

    pub fn write_arr_hdr(&mut self, len: usize) -> Result<()> {
        self.write_hdr(Marker::for_array_len(len)?, len);
        Ok(())
    }

    pub fn write_map_hdr(&mut self, len: usize) -> Result<()> {
        self.write_hdr(Marker::for_map_len(len)?, len);
        Ok(())
    }

    pub fn write_ext(&mut self, ty: i8, payload: &[u8]) -> Result<()> {
        self.write_hdr(Marker::for_ext_len(payload.len())?, payload.len());
        self.writer.i8(ty);
        self.writer.buf(payload);
        Ok(())
    }

    /// Tag byte plus the length field, if the tag has one. `len` has already
    /// been checked against the tag by the `Marker::for_*` selection.
    fn write_hdr(&mut self, marker: Marker, len: usize) {
        let tag = marker.to_u8();
        match marker.header() {
            Header::Follows(1) => {
                self.writer.u8(tag);
                self.writer.u8(len as u8);
            }
            Header::Follows(2) => self.writer.u8u16(tag, len as u16),
            Header::Follows(_) => self.writer.u8u32(tag, len as u32),
            Header::None | Header::Inline(_) | Header::Fixed(_) => self.writer.u8(tag),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SchemaCache;

    fn encode_any(value: &Value) -> Vec<u8> {
        let mut encoder = Encoder::new();
        encoder.write_any(value).unwrap();
        encoder.writer.flush()
    }

    #[test]
    fn integers_use_minimal_tags() {
        assert_eq!(encode_any(&Value::Int(127)), [0x7f]);
        assert_eq!(encode_any(&Value::Int(128)), [0xcc, 0x80]);
        assert_eq!(encode_any(&Value::Int(-1)), [0xff]);
        assert_eq!(encode_any(&Value::Int(-33)), [0xd0, 0xdf]);
        assert_eq!(encode_any(&Value::Int(-129)), [0xd1, 0xff, 0x7f]);
        assert_eq!(
            encode_any(&Value::UInt(u64::MAX)),
            [0xcf, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]
        );
    }

    #[test]
    fn ext_headers() {
        assert_eq!(encode_any(&Value::Ext(-1, vec![0; 4])), [0xd6, 0xff, 0, 0, 0, 0]);
        let long = encode_any(&Value::Ext(3, vec![7; 12]));
        assert_eq!(&long[..3], &[0xc7, 12, 3]);
        assert_eq!(long.len(), 15);
    }

    #[test]
    fn failed_write_is_rolled_back() {
        let cache = SchemaCache::new();
        let plan = cache.resolve::<Vec<u8>>().unwrap();
        let mut encoder = Encoder::new();
        encoder.writer.u8(0xc0);
        let bad = Value::Array(vec![Value::Int(1), Value::Int(300)]);
        let err = encoder.write(&bad, &plan).unwrap_err();
        assert!(matches!(err, CodecError::TypeMismatch { .. }), "{err}");
        assert_eq!(encoder.writer.as_slice(), [0xc0]);
    }

    #[test]
    fn mismatched_shape_is_a_type_mismatch() {
        let cache = SchemaCache::new();
        let plan = cache.resolve::<String>().unwrap();
        let err = Encoder::new().encode(&Value::Int(1), &plan).unwrap_err();
        assert!(matches!(err, CodecError::TypeMismatch { .. }), "{err}");
    }
}
