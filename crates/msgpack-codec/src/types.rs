//! The [`MsgPackType`] registration trait and the runtime [`TypeHandle`].

use std::any::{Any, TypeId};
use std::fmt;

use crate::cache::Describer;
use crate::descriptor::TypeDescriptor;
use crate::error::{CodecError, Result};
use crate::value::Value;

/// Admissibility class of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// A constructible type with a fixed shape.
    Concrete,
    /// Anything sequence-like. Always admissible; element types are checked
    /// when the element plan is resolved.
    Sequence,
    /// An interface-like type with no concrete binding. Never admissible.
    Abstract,
}

/// A Rust type that can be carried as MessagePack.
///
/// Implementations declare the wire shape once ([`describe`](Self::describe))
/// and project values to and from [`Value`]. Records usually get their impl
/// from [`msgpack_record!`](crate::msgpack_record).
pub trait MsgPackType: Any + Send + Sized {
    const KIND: TypeKind = TypeKind::Concrete;

    /// Builds the descriptor. Called at most once per cache.
    fn describe(cx: &mut Describer<'_>) -> Result<TypeDescriptor>;

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> Result<Self>;

    /// Substitute handed back when a decode failure is downgraded to a log
    /// entry. `None` means "no value".
    fn zero_value() -> Option<Self> {
        None
    }
}

/// Type-erased description of a [`MsgPackType`], usable where the type is
/// only known at runtime.
#[derive(Clone, Copy)]
pub struct TypeHandle {
    type_id: TypeId,
    name: &'static str,
    kind: TypeKind,
    describe: fn(&mut Describer<'_>) -> Result<TypeDescriptor>,
    to_value: fn(&dyn Any) -> Option<Value>,
    from_value: fn(Value) -> Result<Box<dyn Any + Send>>,
    zero: fn() -> Option<Box<dyn Any + Send>>,
}

impl TypeHandle {
    pub fn of<T: MsgPackType>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            kind: T::KIND,
            describe: T::describe,
            to_value: erased_to_value::<T>,
            from_value: erased_from_value::<T>,
            zero: erased_zero::<T>,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// Concrete types and sequence-like types are admissible.
    pub fn is_admissible(&self) -> bool {
        matches!(self.kind, TypeKind::Concrete | TypeKind::Sequence)
    }

    pub(crate) fn describe(&self, cx: &mut Describer<'_>) -> Result<TypeDescriptor> {
        (self.describe)(cx)
    }

    /// Projects `value` into a [`Value`]. Fails when `value` is not of this
    /// handle's type.
    pub fn to_value(&self, value: &dyn Any) -> Result<Value> {
        (self.to_value)(value).ok_or_else(|| {
            CodecError::type_mismatch(self.name, "a value of a different runtime type")
        })
    }

    pub fn from_value(&self, value: Value) -> Result<Box<dyn Any + Send>> {
        (self.from_value)(value)
    }

    pub fn zero_value(&self) -> Option<Box<dyn Any + Send>> {
        (self.zero)()
    }
}

impl fmt::Debug for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeHandle")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

impl PartialEq for TypeHandle {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for TypeHandle {}

fn erased_to_value<T: MsgPackType>(value: &dyn Any) -> Option<Value> {
    value.downcast_ref::<T>().map(T::to_value)
}

fn erased_from_value<T: MsgPackType>(value: Value) -> Result<Box<dyn Any + Send>> {
    Ok(Box::new(T::from_value(value)?))
}

fn erased_zero<T: MsgPackType>() -> Option<Box<dyn Any + Send>> {
    T::zero_value().map(|zero| Box::new(zero) as Box<dyn Any + Send>)
}
