//! Type-directed MessagePack codec.
//!
//! - [`marker`]: the wire format model (tags, headers, compact selection).
//! - [`MsgPackType`] + [`SchemaCache`]: explicit per-type registration and a
//!   build-once cache of [`CodecPlan`]s keyed by type identity.
//! - [`Encoder`] / [`Decoder`]: plan-driven conversion between [`Value`]s
//!   and bytes.
//! - [`Codec`]: the typed facade over all of the above.

mod cache;
mod codec;
mod decoder;
mod descriptor;
mod encoder;
mod error;
mod impls;
mod record;
mod timestamp;
mod types;
mod value;

pub mod marker;

pub use cache::{Describer, SchemaCache};
pub use codec::{Codec, CodecOptions};
pub use decoder::{ByteSource, Decoder, DecoderOptions, IoSource, DEFAULT_MAX_DEPTH};
pub use descriptor::{
    Category, CodecPlan, Field, FloatKind, IntKind, PlanRef, RecordLayout, TypeDescriptor,
};
pub use encoder::{Encoder, EncoderOptions};
pub use error::{CodecError, Result};
pub use impls::Bytes;
pub use marker::{Header, Marker, WireKind};
pub use record::RecordFields;
pub use timestamp::{Timestamp, TIMESTAMP_EXT};
pub use types::{MsgPackType, TypeHandle, TypeKind};
pub use value::Value;

pub use msgpack_formatting_buffers::{Reader, Writer};
