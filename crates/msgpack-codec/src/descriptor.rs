//! Type descriptors and codec plans.
//!
//! A [`TypeDescriptor`] says how one Rust type maps onto MessagePack shapes.
//! A [`CodecPlan`] wraps a descriptor with the identity of the type it was
//! built for; plans are built once by the
//! [`SchemaCache`](crate::SchemaCache) and shared read-only afterwards.

use std::any::TypeId;
use std::fmt;
use std::sync::{Arc, OnceLock};

use serde::Deserialize;

use crate::error::{CodecError, Result};

/// Shared handle to a published plan.
pub type PlanRef = Arc<CodecPlan>;

/// Fixed-width integer targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntKind {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
}

impl IntKind {
    pub fn min(self) -> i128 {
        match self {
            IntKind::I8 => i8::MIN as i128,
            IntKind::I16 => i16::MIN as i128,
            IntKind::I32 => i32::MIN as i128,
            IntKind::I64 => i64::MIN as i128,
            IntKind::U8 | IntKind::U16 | IntKind::U32 | IntKind::U64 => 0,
        }
    }

    pub fn max(self) -> i128 {
        match self {
            IntKind::I8 => i8::MAX as i128,
            IntKind::I16 => i16::MAX as i128,
            IntKind::I32 => i32::MAX as i128,
            IntKind::I64 => i64::MAX as i128,
            IntKind::U8 => u8::MAX as i128,
            IntKind::U16 => u16::MAX as i128,
            IntKind::U32 => u32::MAX as i128,
            IntKind::U64 => u64::MAX as i128,
        }
    }

    pub fn contains(self, n: i128) -> bool {
        (self.min()..=self.max()).contains(&n)
    }

    pub fn name(self) -> &'static str {
        match self {
            IntKind::I8 => "i8",
            IntKind::I16 => "i16",
            IntKind::I32 => "i32",
            IntKind::I64 => "i64",
            IntKind::U8 => "u8",
            IntKind::U16 => "u16",
            IntKind::U32 => "u32",
            IntKind::U64 => "u64",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatKind {
    F32,
    F64,
}

/// Coarse classification of a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Primitive,
    String,
    Sequence,
    Map,
    Record,
}

/// One record field: its wire name and the plan of its type.
#[derive(Clone)]
pub struct Field {
    pub name: &'static str,
    pub plan: PlanRef,
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("type", &self.plan.type_name())
            .finish()
    }
}

/// How a Rust type maps onto MessagePack values.
///
/// Nested descriptors are held through [`PlanRef`]s, so a type that refers
/// to itself points back at its own plan instead of recursing.
#[derive(Clone)]
pub enum TypeDescriptor {
    /// Always nil, e.g. `()`.
    Nil,
    Bool,
    Int(IntKind),
    Float(FloatKind),
    Str,
    Bin,
    /// The timestamp extension (type -1).
    Timestamp,
    /// Any wire value, decoded into [`Value`](crate::Value) as-is.
    Dynamic,
    /// Nil, or a value of the inner plan.
    Optional(PlanRef),
    /// Exactly the shape of another plan (`Box<T>`).
    Alias(PlanRef),
    Sequence(PlanRef),
    Map {
        key: PlanRef,
        value: PlanRef,
    },
    /// Fields in declaration order.
    Record(Vec<Field>),
}

impl TypeDescriptor {
    pub fn category(&self) -> Category {
        match self {
            TypeDescriptor::Str => Category::String,
            TypeDescriptor::Sequence(_) => Category::Sequence,
            TypeDescriptor::Map { .. } => Category::Map,
            TypeDescriptor::Record(_) => Category::Record,
            TypeDescriptor::Optional(inner) | TypeDescriptor::Alias(inner) => inner
                .descriptor()
                .map(TypeDescriptor::category)
                .unwrap_or(Category::Primitive),
            _ => Category::Primitive,
        }
    }

    /// Human-readable shape, used in error messages.
    pub fn summary(&self) -> String {
        match self {
            TypeDescriptor::Nil => "nil".to_owned(),
            TypeDescriptor::Bool => "bool".to_owned(),
            TypeDescriptor::Int(kind) => kind.name().to_owned(),
            TypeDescriptor::Float(FloatKind::F32) => "float32".to_owned(),
            TypeDescriptor::Float(FloatKind::F64) => "float64".to_owned(),
            TypeDescriptor::Str => "str".to_owned(),
            TypeDescriptor::Bin => "bin".to_owned(),
            TypeDescriptor::Timestamp => "timestamp".to_owned(),
            TypeDescriptor::Dynamic => "any value".to_owned(),
            TypeDescriptor::Optional(inner) => format!("optional {}", inner.type_name()),
            TypeDescriptor::Alias(inner) => inner.type_name().to_owned(),
            TypeDescriptor::Sequence(elem) => format!("sequence of {}", elem.type_name()),
            TypeDescriptor::Map { key, value } => {
                format!("map of {} to {}", key.type_name(), value.type_name())
            }
            TypeDescriptor::Record(fields) => format!("record with {} fields", fields.len()),
        }
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Record(fields) => f.debug_tuple("Record").field(fields).finish(),
            other => f.write_str(&other.summary()),
        }
    }
}

/// Resolved, immutable strategy for one Rust type.
pub struct CodecPlan {
    type_id: TypeId,
    type_name: &'static str,
    descriptor: OnceLock<TypeDescriptor>,
}

impl CodecPlan {
    /// A plan whose descriptor is still being built. Only the schema cache
    /// hands these out, and never publishes one that stayed empty.
    pub(crate) fn pending(type_id: TypeId, type_name: &'static str) -> Self {
        Self {
            type_id,
            type_name,
            descriptor: OnceLock::new(),
        }
    }

    pub(crate) fn complete(&self, descriptor: TypeDescriptor) {
        // A plan is completed exactly once, by the describer that created it.
        let _ = self.descriptor.set(descriptor);
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn descriptor(&self) -> Result<&TypeDescriptor> {
        self.descriptor.get().ok_or(CodecError::UnsupportedType {
            type_name: self.type_name,
            reason: "plan is still being built",
        })
    }

    pub fn is_complete(&self) -> bool {
        self.descriptor.get().is_some()
    }
}

impl fmt::Debug for CodecPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecPlan")
            .field("type", &self.type_name)
            .field("complete", &self.is_complete())
            .finish()
    }
}

/// Wire layout of records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordLayout {
    /// Field values in declaration order, as an array. Compact, but both
    /// sides must agree on the field order.
    #[default]
    Array,
    /// Field names as string keys. Larger, but self-describing.
    Map,
}
