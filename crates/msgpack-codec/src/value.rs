//! [`Value`]: a materialized MessagePack wire value.
//!
//! Typed values are projected into a `Value` tree before encoding and
//! rebuilt from one after decoding. `Value` is also a codec type in its own
//! right (the dynamic descriptor), so schemaless payloads round-trip too.

/// One MessagePack value.
///
/// Integers have a single canonical form: [`Value::Int`] for everything that
/// fits in an `i64`, [`Value::UInt`] only above `i64::MAX`. The `From`
/// conversions and the decoder both produce the canonical form.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    UInt(u64),
    F32(f32),
    F64(f64),
    Str(String),
    Bin(Vec<u8>),
    Array(Vec<Value>),
    /// Pairs in wire order; keys may be any value.
    Map(Vec<(Value, Value)>),
    /// Extension type byte and payload.
    Ext(i8, Vec<u8>),
}

impl Value {
    /// Short name of the wire category, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) | Value::UInt(_) => "integer",
            Value::F32(_) => "float32",
            Value::F64(_) => "float64",
            Value::Str(_) => "str",
            Value::Bin(_) => "bin",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Ext(..) => "ext",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// The integer as `i128`, wide enough for both canonical forms.
    pub fn as_i128(&self) -> Option<i128> {
        match *self {
            Value::Int(n) => Some(n as i128),
            Value::UInt(n) => Some(n as i128),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Builds the canonical integer value for anything in `i64::MIN..=u64::MAX`.
    pub(crate) fn from_i128(n: i128) -> Value {
        if let Ok(signed) = i64::try_from(n) {
            Value::Int(signed)
        } else {
            Value::UInt(n as u64)
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::from_i128(n as i128)
    }
}

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Value::F32(f)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::F64(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Nil,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::UInt(u)
                } else {
                    Value::F64(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(arr) => {
                Value::Array(arr.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(obj) => Value::Map(
                obj.into_iter()
                    .map(|(k, v)| (Value::Str(k), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for serde_json::Value {
    /// Lossy where JSON has no counterpart: binary becomes an array of
    /// octets, extensions become `null`, non-string map keys are rendered
    /// with their JSON text.
    fn from(v: Value) -> Self {
        match v {
            Value::Nil | Value::Ext(..) => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Int(i) => serde_json::json!(i),
            Value::UInt(u) => serde_json::json!(u),
            Value::F32(f) => serde_json::json!(f),
            Value::F64(f) => serde_json::json!(f),
            Value::Str(s) => serde_json::Value::String(s),
            Value::Bin(b) => {
                serde_json::Value::Array(b.into_iter().map(serde_json::Value::from).collect())
            }
            Value::Array(arr) => {
                serde_json::Value::Array(arr.into_iter().map(serde_json::Value::from).collect())
            }
            Value::Map(pairs) => serde_json::Value::Object(
                pairs
                    .into_iter()
                    .map(|(k, v)| {
                        let key = match k {
                            Value::Str(s) => s,
                            other => serde_json::Value::from(other).to_string(),
                        };
                        (key, serde_json::Value::from(v))
                    })
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unsigned_conversion_is_canonical() {
        assert_eq!(Value::from(5u64), Value::Int(5));
        assert_eq!(Value::from(u64::MAX), Value::UInt(u64::MAX));
        assert_eq!(Value::from_i128(-7), Value::Int(-7));
    }

    #[test]
    fn json_roundtrip_keeps_structure() {
        let doc = json!({"a": [1, -2, true, null], "b": "x", "c": 1.5});
        let value = Value::from(doc.clone());
        assert_eq!(
            value.as_array(),
            None,
            "objects map to Value::Map, not arrays"
        );
        assert_eq!(serde_json::Value::from(value), doc);
    }

    #[test]
    fn kind_names_match_wire_categories() {
        assert_eq!(Value::UInt(u64::MAX).kind_name(), "integer");
        assert_eq!(Value::Ext(-1, vec![0; 4]).kind_name(), "ext");
        assert_eq!(Value::Map(Vec::new()).kind_name(), "map");
    }
}
