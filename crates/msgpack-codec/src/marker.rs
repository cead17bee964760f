//! MessagePack wire format model.
//!
//! Pure format knowledge: which tag byte encodes which kind of value, what
//! follows the tag, and which tag is the most compact one for a given value
//! or length. Nothing here touches a buffer.

use crate::error::CodecError;

/// Every MessagePack tag byte, with inline payloads decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// `0x00..=0x7f`
    PositiveFixInt(u8),
    /// `0x80..=0x8f`, pair count inline.
    FixMap(u8),
    /// `0x90..=0x9f`, element count inline.
    FixArray(u8),
    /// `0xa0..=0xbf`, byte length inline.
    FixStr(u8),
    Nil,
    /// `0xc1` is never used by the format.
    Reserved,
    False,
    True,
    Bin8,
    Bin16,
    Bin32,
    Ext8,
    Ext16,
    Ext32,
    Float32,
    Float64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Int8,
    Int16,
    Int32,
    Int64,
    FixExt1,
    FixExt2,
    FixExt4,
    FixExt8,
    FixExt16,
    Str8,
    Str16,
    Str32,
    Array16,
    Array32,
    Map16,
    Map32,
    /// `0xe0..=0xff`
    NegativeFixInt(i8),
}

/// Wire category of a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireKind {
    Nil,
    Bool,
    Integer,
    Float32,
    Float64,
    Str,
    Bin,
    Array,
    Map,
    Ext,
    Reserved,
}

impl WireKind {
    pub fn name(self) -> &'static str {
        match self {
            WireKind::Nil => "nil",
            WireKind::Bool => "bool",
            WireKind::Integer => "integer",
            WireKind::Float32 => "float32",
            WireKind::Float64 => "float64",
            WireKind::Str => "str",
            WireKind::Bin => "bin",
            WireKind::Array => "array",
            WireKind::Map => "map",
            WireKind::Ext => "ext",
            WireKind::Reserved => "reserved",
        }
    }
}

/// What follows a tag byte on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Header {
    /// Nothing: the tag is the whole value.
    None,
    /// Count or length is carried by the tag itself.
    Inline(u32),
    /// A payload of exactly this many bytes follows. For `fixext` the
    /// extension type byte precedes the payload.
    Fixed(u32),
    /// A big-endian length field of this many bytes (1, 2 or 4) follows.
    Follows(u8),
}

impl Marker {
    pub fn from_u8(byte: u8) -> Marker {
        match byte {
            0x00..=0x7f => Marker::PositiveFixInt(byte),
            0x80..=0x8f => Marker::FixMap(byte & 0x0f),
            0x90..=0x9f => Marker::FixArray(byte & 0x0f),
            0xa0..=0xbf => Marker::FixStr(byte & 0x1f),
            0xc0 => Marker::Nil,
            0xc1 => Marker::Reserved,
            0xc2 => Marker::False,
            0xc3 => Marker::True,
            0xc4 => Marker::Bin8,
            0xc5 => Marker::Bin16,
            0xc6 => Marker::Bin32,
            0xc7 => Marker::Ext8,
            0xc8 => Marker::Ext16,
            0xc9 => Marker::Ext32,
            0xca => Marker::Float32,
            0xcb => Marker::Float64,
            0xcc => Marker::UInt8,
            0xcd => Marker::UInt16,
            0xce => Marker::UInt32,
            0xcf => Marker::UInt64,
            0xd0 => Marker::Int8,
            0xd1 => Marker::Int16,
            0xd2 => Marker::Int32,
            0xd3 => Marker::Int64,
            0xd4 => Marker::FixExt1,
            0xd5 => Marker::FixExt2,
            0xd6 => Marker::FixExt4,
            0xd7 => Marker::FixExt8,
            0xd8 => Marker::FixExt16,
            0xd9 => Marker::Str8,
            0xda => Marker::Str16,
            0xdb => Marker::Str32,
            0xdc => Marker::Array16,
            0xdd => Marker::Array32,
            0xde => Marker::Map16,
            0xdf => Marker::Map32,
            0xe0..=0xff => Marker::NegativeFixInt(byte as i8),
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            Marker::PositiveFixInt(n) => n & 0x7f,
            Marker::FixMap(n) => 0x80 | (n & 0x0f),
            Marker::FixArray(n) => 0x90 | (n & 0x0f),
            Marker::FixStr(n) => 0xa0 | (n & 0x1f),
            Marker::Nil => 0xc0,
            Marker::Reserved => 0xc1,
            Marker::False => 0xc2,
            Marker::True => 0xc3,
            Marker::Bin8 => 0xc4,
            Marker::Bin16 => 0xc5,
            Marker::Bin32 => 0xc6,
            Marker::Ext8 => 0xc7,
            Marker::Ext16 => 0xc8,
            Marker::Ext32 => 0xc9,
            Marker::Float32 => 0xca,
            Marker::Float64 => 0xcb,
            Marker::UInt8 => 0xcc,
            Marker::UInt16 => 0xcd,
            Marker::UInt32 => 0xce,
            Marker::UInt64 => 0xcf,
            Marker::Int8 => 0xd0,
            Marker::Int16 => 0xd1,
            Marker::Int32 => 0xd2,
            Marker::Int64 => 0xd3,
            Marker::FixExt1 => 0xd4,
            Marker::FixExt2 => 0xd5,
            Marker::FixExt4 => 0xd6,
            Marker::FixExt8 => 0xd7,
            Marker::FixExt16 => 0xd8,
            Marker::Str8 => 0xd9,
            Marker::Str16 => 0xda,
            Marker::Str32 => 0xdb,
            Marker::Array16 => 0xdc,
            Marker::Array32 => 0xdd,
            Marker::Map16 => 0xde,
            Marker::Map32 => 0xdf,
            Marker::NegativeFixInt(n) => n as u8,
        }
    }

    pub fn kind(self) -> WireKind {
        match self {
            Marker::Nil => WireKind::Nil,
            Marker::Reserved => WireKind::Reserved,
            Marker::False | Marker::True => WireKind::Bool,
            Marker::PositiveFixInt(_)
            | Marker::NegativeFixInt(_)
            | Marker::UInt8
            | Marker::UInt16
            | Marker::UInt32
            | Marker::UInt64
            | Marker::Int8
            | Marker::Int16
            | Marker::Int32
            | Marker::Int64 => WireKind::Integer,
            Marker::Float32 => WireKind::Float32,
            Marker::Float64 => WireKind::Float64,
            Marker::FixStr(_) | Marker::Str8 | Marker::Str16 | Marker::Str32 => WireKind::Str,
            Marker::Bin8 | Marker::Bin16 | Marker::Bin32 => WireKind::Bin,
            Marker::FixArray(_) | Marker::Array16 | Marker::Array32 => WireKind::Array,
            Marker::FixMap(_) | Marker::Map16 | Marker::Map32 => WireKind::Map,
            Marker::FixExt1
            | Marker::FixExt2
            | Marker::FixExt4
            | Marker::FixExt8
            | Marker::FixExt16
            | Marker::Ext8
            | Marker::Ext16
            | Marker::Ext32 => WireKind::Ext,
        }
    }

    pub fn header(self) -> Header {
        match self {
            Marker::PositiveFixInt(_)
            | Marker::NegativeFixInt(_)
            | Marker::Nil
            | Marker::Reserved
            | Marker::False
            | Marker::True => Header::None,
            Marker::FixMap(n) | Marker::FixArray(n) | Marker::FixStr(n) => Header::Inline(n as u32),
            Marker::UInt8 | Marker::Int8 => Header::Fixed(1),
            Marker::UInt16 | Marker::Int16 => Header::Fixed(2),
            Marker::UInt32 | Marker::Int32 | Marker::Float32 => Header::Fixed(4),
            Marker::UInt64 | Marker::Int64 | Marker::Float64 => Header::Fixed(8),
            Marker::FixExt1 => Header::Fixed(1),
            Marker::FixExt2 => Header::Fixed(2),
            Marker::FixExt4 => Header::Fixed(4),
            Marker::FixExt8 => Header::Fixed(8),
            Marker::FixExt16 => Header::Fixed(16),
            Marker::Bin8 | Marker::Str8 | Marker::Ext8 => Header::Follows(1),
            Marker::Bin16 | Marker::Str16 | Marker::Ext16 | Marker::Array16 | Marker::Map16 => {
                Header::Follows(2)
            }
            Marker::Bin32 | Marker::Str32 | Marker::Ext32 | Marker::Array32 | Marker::Map32 => {
                Header::Follows(4)
            }
        }
    }

    /// Smallest tag able to carry a non-negative integer.
    pub fn for_uint(n: u64) -> Marker {
        if n <= 0x7f {
            Marker::PositiveFixInt(n as u8)
        } else if n <= u8::MAX as u64 {
            Marker::UInt8
        } else if n <= u16::MAX as u64 {
            Marker::UInt16
        } else if n <= u32::MAX as u64 {
            Marker::UInt32
        } else {
            Marker::UInt64
        }
    }

    /// Smallest tag able to carry a signed integer. Non-negative values use
    /// the unsigned family.
    pub fn for_int(n: i64) -> Marker {
        if n >= 0 {
            Marker::for_uint(n as u64)
        } else if n >= -32 {
            Marker::NegativeFixInt(n as i8)
        } else if n >= i8::MIN as i64 {
            Marker::Int8
        } else if n >= i16::MIN as i64 {
            Marker::Int16
        } else if n >= i32::MIN as i64 {
            Marker::Int32
        } else {
            Marker::Int64
        }
    }

    pub fn for_str_len(len: usize) -> Result<Marker, CodecError> {
        Ok(match checked_len(len)? {
            0..=0x1f => Marker::FixStr(len as u8),
            0x20..=0xff => Marker::Str8,
            0x100..=0xffff => Marker::Str16,
            _ => Marker::Str32,
        })
    }

    pub fn for_bin_len(len: usize) -> Result<Marker, CodecError> {
        Ok(match checked_len(len)? {
            0..=0xff => Marker::Bin8,
            0x100..=0xffff => Marker::Bin16,
            _ => Marker::Bin32,
        })
    }

    pub fn for_array_len(len: usize) -> Result<Marker, CodecError> {
        Ok(match checked_len(len)? {
            0..=0x0f => Marker::FixArray(len as u8),
            0x10..=0xffff => Marker::Array16,
            _ => Marker::Array32,
        })
    }

    pub fn for_map_len(len: usize) -> Result<Marker, CodecError> {
        Ok(match checked_len(len)? {
            0..=0x0f => Marker::FixMap(len as u8),
            0x10..=0xffff => Marker::Map16,
            _ => Marker::Map32,
        })
    }

    /// Extension payloads of 1, 2, 4, 8 or 16 bytes get a `fixext` tag.
    pub fn for_ext_len(len: usize) -> Result<Marker, CodecError> {
        Ok(match checked_len(len)? {
            1 => Marker::FixExt1,
            2 => Marker::FixExt2,
            4 => Marker::FixExt4,
            8 => Marker::FixExt8,
            16 => Marker::FixExt16,
            0..=0xff => Marker::Ext8,
            0x100..=0xffff => Marker::Ext16,
            _ => Marker::Ext32,
        })
    }
}

fn checked_len(len: usize) -> Result<u32, CodecError> {
    u32::try_from(len).map_err(|_| CodecError::LengthOverflow(len))
}

impl From<u8> for Marker {
    fn from(byte: u8) -> Self {
        Marker::from_u8(byte)
    }
}

impl From<Marker> for u8 {
    fn from(marker: Marker) -> Self {
        marker.to_u8()
    }
}
