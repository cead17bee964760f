//! [`MsgPackType`] for standard library types.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::hash::Hash;
use std::ops::{Deref, DerefMut};

use crate::cache::Describer;
use crate::descriptor::{CodecPlan, FloatKind, IntKind, TypeDescriptor};
use crate::error::{CodecError, Result};
use crate::types::{MsgPackType, TypeKind};
use crate::value::Value;

fn expect_kind(expected: &str, value: &Value) -> CodecError {
    CodecError::schema_mismatch(expected, value.kind_name())
}

macro_rules! int_impl {
    ($($ty:ty => $kind:ident),* $(,)?) => {$(
        impl MsgPackType for $ty {
            fn describe(_: &mut Describer<'_>) -> Result<TypeDescriptor> {
                Ok(TypeDescriptor::Int(IntKind::$kind))
            }

            fn to_value(&self) -> Value {
                Value::from_i128(*self as i128)
            }

            fn from_value(value: Value) -> Result<Self> {
                let n = value
                    .as_i128()
                    .ok_or_else(|| expect_kind(IntKind::$kind.name(), &value))?;
                <$ty>::try_from(n).map_err(|_| {
                    CodecError::schema_mismatch(IntKind::$kind.name(), format!("integer {n}"))
                })
            }

            fn zero_value() -> Option<Self> {
                Some(0)
            }
        }
    )*};
}

int_impl!(
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    isize => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    usize => U64,
);

impl MsgPackType for () {
    fn describe(_: &mut Describer<'_>) -> Result<TypeDescriptor> {
        Ok(TypeDescriptor::Nil)
    }

    fn to_value(&self) -> Value {
        Value::Nil
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Nil => Ok(()),
            other => Err(expect_kind("nil", &other)),
        }
    }

    fn zero_value() -> Option<Self> {
        Some(())
    }
}

impl MsgPackType for bool {
    fn describe(_: &mut Describer<'_>) -> Result<TypeDescriptor> {
        Ok(TypeDescriptor::Bool)
    }

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(expect_kind("bool", &other)),
        }
    }

    fn zero_value() -> Option<Self> {
        Some(false)
    }
}

impl MsgPackType for f32 {
    fn describe(_: &mut Describer<'_>) -> Result<TypeDescriptor> {
        Ok(TypeDescriptor::Float(FloatKind::F32))
    }

    fn to_value(&self) -> Value {
        Value::F32(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::F32(f) => Ok(f),
            other => Err(expect_kind("float32", &other)),
        }
    }

    fn zero_value() -> Option<Self> {
        Some(0.0)
    }
}

impl MsgPackType for f64 {
    fn describe(_: &mut Describer<'_>) -> Result<TypeDescriptor> {
        Ok(TypeDescriptor::Float(FloatKind::F64))
    }

    fn to_value(&self) -> Value {
        Value::F64(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::F64(f) => Ok(f),
            Value::F32(f) => Ok(f as f64),
            other => Err(expect_kind("float64", &other)),
        }
    }

    fn zero_value() -> Option<Self> {
        Some(0.0)
    }
}

impl MsgPackType for String {
    fn describe(_: &mut Describer<'_>) -> Result<TypeDescriptor> {
        Ok(TypeDescriptor::Str)
    }

    fn to_value(&self) -> Value {
        Value::Str(self.clone())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Str(s) => Ok(s),
            other => Err(expect_kind("str", &other)),
        }
    }
}

/// Carried as a one-character string.
impl MsgPackType for char {
    fn describe(_: &mut Describer<'_>) -> Result<TypeDescriptor> {
        Ok(TypeDescriptor::Str)
    }

    fn to_value(&self) -> Value {
        Value::Str(self.to_string())
    }

    fn from_value(value: Value) -> Result<Self> {
        let s = String::from_value(value)?;
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(CodecError::schema_mismatch(
                "single character",
                format!("string of {} characters", s.chars().count()),
            )),
        }
    }
}

/// Binary payload, carried as `bin` rather than an array of integers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Bytes(pub Vec<u8>);

impl Deref for Bytes {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        &self.0
    }
}

impl DerefMut for Bytes {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.0
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(bytes: Vec<u8>) -> Self {
        Bytes(bytes)
    }
}

impl MsgPackType for Bytes {
    fn describe(_: &mut Describer<'_>) -> Result<TypeDescriptor> {
        Ok(TypeDescriptor::Bin)
    }

    fn to_value(&self) -> Value {
        Value::Bin(self.0.clone())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bin(b) => Ok(Bytes(b)),
            other => Err(expect_kind("bin", &other)),
        }
    }
}

impl MsgPackType for Value {
    fn describe(_: &mut Describer<'_>) -> Result<TypeDescriptor> {
        Ok(TypeDescriptor::Dynamic)
    }

    fn to_value(&self) -> Value {
        self.clone()
    }

    fn from_value(value: Value) -> Result<Self> {
        Ok(value)
    }

    fn zero_value() -> Option<Self> {
        Some(Value::Nil)
    }
}

/// True when nil is already a valid encoding of the plan's type. A plan
/// still being built is a record or container, so it never is.
fn encodes_nil(plan: &CodecPlan) -> bool {
    match plan.descriptor() {
        Ok(TypeDescriptor::Nil | TypeDescriptor::Optional(_) | TypeDescriptor::Dynamic) => true,
        Ok(TypeDescriptor::Alias(inner)) => encodes_nil(inner),
        _ => false,
    }
}

/// `None` is nil on the wire, so `T` itself must never encode as nil.
/// `Option<Option<_>>`, `Option<()>` and `Option<Value>` are rejected.
impl<T: MsgPackType> MsgPackType for Option<T> {
    fn describe(cx: &mut Describer<'_>) -> Result<TypeDescriptor> {
        let inner = cx.resolve::<T>()?;
        if encodes_nil(&inner) {
            return Err(CodecError::unsupported::<Self>(
                "inner type already encodes nil, so `None` would be ambiguous",
            ));
        }
        Ok(TypeDescriptor::Optional(inner))
    }

    fn to_value(&self) -> Value {
        match self {
            Some(inner) => inner.to_value(),
            None => Value::Nil,
        }
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Nil => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }

    fn zero_value() -> Option<Self> {
        Some(None)
    }
}

/// Same wire shape as `T`; exists so recursive types can be spelled.
impl<T: MsgPackType> MsgPackType for Box<T> {
    fn describe(cx: &mut Describer<'_>) -> Result<TypeDescriptor> {
        Ok(TypeDescriptor::Alias(cx.resolve::<T>()?))
    }

    fn to_value(&self) -> Value {
        (**self).to_value()
    }

    fn from_value(value: Value) -> Result<Self> {
        T::from_value(value).map(Box::new)
    }

    fn zero_value() -> Option<Self> {
        T::zero_value().map(Box::new)
    }
}

fn array_items(value: Value) -> Result<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(expect_kind("array", &other)),
    }
}

fn map_pairs(value: Value) -> Result<Vec<(Value, Value)>> {
    match value {
        Value::Map(pairs) => Ok(pairs),
        other => Err(expect_kind("map", &other)),
    }
}

macro_rules! seq_impl {
    ($seq:ident < T $(: $bound:path)? >) => {
        impl<T: MsgPackType $(+ $bound)?> MsgPackType for $seq<T> {
            const KIND: TypeKind = TypeKind::Sequence;

            fn describe(cx: &mut Describer<'_>) -> Result<TypeDescriptor> {
                Ok(TypeDescriptor::Sequence(cx.resolve::<T>()?))
            }

            fn to_value(&self) -> Value {
                Value::Array(self.iter().map(MsgPackType::to_value).collect())
            }

            fn from_value(value: Value) -> Result<Self> {
                array_items(value)?.into_iter().map(T::from_value).collect()
            }

            fn zero_value() -> Option<Self> {
                Some($seq::new())
            }
        }
    };
}

seq_impl!(Vec<T>);
seq_impl!(VecDeque<T>);
seq_impl!(BTreeSet<T: Ord>);

impl<K, V> MsgPackType for HashMap<K, V>
where
    K: MsgPackType + Eq + Hash,
    V: MsgPackType,
{
    fn describe(cx: &mut Describer<'_>) -> Result<TypeDescriptor> {
        Ok(TypeDescriptor::Map {
            key: cx.resolve::<K>()?,
            value: cx.resolve::<V>()?,
        })
    }

    fn to_value(&self) -> Value {
        Value::Map(
            self.iter()
                .map(|(k, v)| (k.to_value(), v.to_value()))
                .collect(),
        )
    }

    fn from_value(value: Value) -> Result<Self> {
        map_pairs(value)?
            .into_iter()
            .map(|(k, v)| -> Result<(K, V)> { Ok((K::from_value(k)?, V::from_value(v)?)) })
            .collect()
    }

    fn zero_value() -> Option<Self> {
        Some(HashMap::new())
    }
}

impl<K, V> MsgPackType for BTreeMap<K, V>
where
    K: MsgPackType + Ord,
    V: MsgPackType,
{
    fn describe(cx: &mut Describer<'_>) -> Result<TypeDescriptor> {
        Ok(TypeDescriptor::Map {
            key: cx.resolve::<K>()?,
            value: cx.resolve::<V>()?,
        })
    }

    fn to_value(&self) -> Value {
        Value::Map(
            self.iter()
                .map(|(k, v)| (k.to_value(), v.to_value()))
                .collect(),
        )
    }

    fn from_value(value: Value) -> Result<Self> {
        map_pairs(value)?
            .into_iter()
            .map(|(k, v)| -> Result<(K, V)> { Ok((K::from_value(k)?, V::from_value(v)?)) })
            .collect()
    }

    fn zero_value() -> Option<Self> {
        Some(BTreeMap::new())
    }
}
