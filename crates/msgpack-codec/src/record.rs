//! Record support: the [`msgpack_record!`](crate::msgpack_record) macro and
//! the field cursor its generated code uses.

use std::vec;

use crate::error::{CodecError, Result};
use crate::types::MsgPackType;
use crate::value::Value;

/// Consumes a record's field values in declaration order.
///
/// Records are projected to a [`Value::Array`] of their field values; the
/// wire layout (array or name-keyed map) is the encoder's business.
pub struct RecordFields {
    items: vec::IntoIter<Value>,
}

impl RecordFields {
    /// Fails unless `value` is an array of exactly `expected` items.
    pub fn new(value: Value, expected: usize) -> Result<Self> {
        match value {
            Value::Array(items) if items.len() == expected => Ok(Self {
                items: items.into_iter(),
            }),
            Value::Array(items) => Err(CodecError::schema_mismatch(
                format!("record with {expected} fields"),
                format!("{} fields", items.len()),
            )),
            other => Err(CodecError::schema_mismatch("record", other.kind_name())),
        }
    }

    pub fn next<T: MsgPackType>(&mut self) -> Result<T> {
        let value = self
            .items
            .next()
            .ok_or_else(|| CodecError::schema_mismatch("another record field", "end of record"))?;
        T::from_value(value)
    }
}

/// Implements [`MsgPackType`](crate::MsgPackType) for a struct whose fields
/// are all `MsgPackType`s.
///
/// Fields are listed once, in wire order, each with the name used by the
/// map layout:
///
/// ```
/// use msgpack_formatting_codec::msgpack_record;
///
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// msgpack_record!(Point {
///     x: i32 => "X",
///     y: i32 => "Y",
/// });
/// ```
#[macro_export]
macro_rules! msgpack_record {
    (@count) => { 0usize };
    (@count $head:ident $($tail:ident)*) => {
        1usize + $crate::msgpack_record!(@count $($tail)*)
    };
    ($ty:ty { $($field:ident : $fty:ty => $name:literal),* $(,)? }) => {
        impl $crate::MsgPackType for $ty {
            #[allow(unused_variables)]
            fn describe(
                cx: &mut $crate::Describer<'_>,
            ) -> $crate::Result<$crate::TypeDescriptor> {
                ::std::result::Result::Ok($crate::TypeDescriptor::Record(::std::vec![
                    $(cx.field::<$fty>($name)?,)*
                ]))
            }

            fn to_value(&self) -> $crate::Value {
                $crate::Value::Array(::std::vec![
                    $($crate::MsgPackType::to_value(&self.$field),)*
                ])
            }

            #[allow(unused_mut, unused_variables)]
            fn from_value(value: $crate::Value) -> $crate::Result<Self> {
                let mut fields = $crate::RecordFields::new(
                    value,
                    $crate::msgpack_record!(@count $($field)*),
                )?;
                ::std::result::Result::Ok(Self {
                    $($field: fields.next::<$fty>()?,)*
                })
            }
        }
    };
}
