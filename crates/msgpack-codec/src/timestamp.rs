//! The MessagePack timestamp extension (type -1).
//!
//! Three payload widths exist; encoding always picks the smallest one that
//! can carry the instant:
//!
//! - 4 bytes: unsigned seconds, no nanoseconds.
//! - 8 bytes: 30-bit nanoseconds and 34-bit unsigned seconds.
//! - 12 bytes: 32-bit nanoseconds and signed 64-bit seconds.

use time::OffsetDateTime;

use crate::cache::Describer;
use crate::descriptor::TypeDescriptor;
use crate::error::{CodecError, Result};
use crate::types::MsgPackType;
use crate::value::Value;

pub const TIMESTAMP_EXT: i8 = -1;

const NANOS_PER_SECOND: u32 = 1_000_000_000;

/// Seconds and nanoseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp {
    seconds: i64,
    nanos: u32,
}

impl Timestamp {
    pub const UNIX_EPOCH: Timestamp = Timestamp {
        seconds: 0,
        nanos: 0,
    };

    /// Fails when `nanos` is not below one second.
    pub fn new(seconds: i64, nanos: u32) -> Result<Self> {
        if nanos >= NANOS_PER_SECOND {
            return Err(CodecError::schema_mismatch(
                "nanoseconds below 1000000000",
                nanos.to_string(),
            ));
        }
        Ok(Self { seconds, nanos })
    }

    pub fn from_seconds(seconds: i64) -> Self {
        Self { seconds, nanos: 0 }
    }

    pub fn seconds(&self) -> i64 {
        self.seconds
    }

    pub fn nanos(&self) -> u32 {
        self.nanos
    }

    pub fn to_ext_payload(&self) -> Vec<u8> {
        if self.seconds >= 0 && self.seconds >> 34 == 0 {
            let secs = self.seconds as u64;
            if self.nanos == 0 && secs <= u32::MAX as u64 {
                return (secs as u32).to_be_bytes().to_vec();
            }
            let data = ((self.nanos as u64) << 34) | secs;
            return data.to_be_bytes().to_vec();
        }
        let mut out = Vec::with_capacity(12);
        out.extend_from_slice(&self.nanos.to_be_bytes());
        out.extend_from_slice(&self.seconds.to_be_bytes());
        out
    }

    pub fn from_ext_payload(payload: &[u8]) -> Result<Self> {
        match *payload {
            [a, b, c, d] => Ok(Self::from_seconds(u32::from_be_bytes([a, b, c, d]) as i64)),
            [a, b, c, d, e, f, g, h] => {
                let data = u64::from_be_bytes([a, b, c, d, e, f, g, h]);
                Self::new((data & 0x3_ffff_ffff) as i64, (data >> 34) as u32)
            }
            [a, b, c, d, ref rest @ ..] if rest.len() == 8 => {
                let nanos = u32::from_be_bytes([a, b, c, d]);
                let mut secs = [0u8; 8];
                secs.copy_from_slice(rest);
                Self::new(i64::from_be_bytes(secs), nanos)
            }
            _ => Err(CodecError::schema_mismatch(
                "timestamp payload of 4, 8 or 12 bytes",
                format!("{} bytes", payload.len()),
            )),
        }
    }

    pub(crate) fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Ext(TIMESTAMP_EXT, payload) => Self::from_ext_payload(&payload),
            Value::Ext(other, _) => Err(CodecError::UnsupportedExtension(other)),
            other => Err(CodecError::schema_mismatch("timestamp", other.kind_name())),
        }
    }
}

impl From<OffsetDateTime> for Timestamp {
    fn from(dt: OffsetDateTime) -> Self {
        Self {
            seconds: dt.unix_timestamp(),
            nanos: dt.nanosecond(),
        }
    }
}

impl TryFrom<Timestamp> for OffsetDateTime {
    type Error = CodecError;

    fn try_from(ts: Timestamp) -> Result<Self> {
        let nanos = ts.seconds as i128 * NANOS_PER_SECOND as i128 + ts.nanos as i128;
        OffsetDateTime::from_unix_timestamp_nanos(nanos).map_err(|_| {
            CodecError::schema_mismatch(
                "timestamp within the supported date range",
                format!("{} seconds", ts.seconds),
            )
        })
    }
}

impl MsgPackType for Timestamp {
    fn describe(_: &mut Describer<'_>) -> Result<TypeDescriptor> {
        Ok(TypeDescriptor::Timestamp)
    }

    fn to_value(&self) -> Value {
        Value::Ext(TIMESTAMP_EXT, self.to_ext_payload())
    }

    fn from_value(value: Value) -> Result<Self> {
        Timestamp::from_value(value)
    }

    fn zero_value() -> Option<Self> {
        Some(Timestamp::UNIX_EPOCH)
    }
}

/// Carried as a UTC instant; the offset is not preserved.
impl MsgPackType for OffsetDateTime {
    fn describe(_: &mut Describer<'_>) -> Result<TypeDescriptor> {
        Ok(TypeDescriptor::Timestamp)
    }

    fn to_value(&self) -> Value {
        Timestamp::from(*self).to_value()
    }

    fn from_value(value: Value) -> Result<Self> {
        Timestamp::from_value(value)?.try_into()
    }

    fn zero_value() -> Option<Self> {
        Some(OffsetDateTime::UNIX_EPOCH)
    }
}
