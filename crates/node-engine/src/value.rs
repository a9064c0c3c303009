//! Dynamic values flowing on node edges
//!
//! The node graph has no static type system, so every message carries a
//! [`Value`] whose discriminant must be checked before it is read. Typed
//! accessors fail with [`NodeError::TypeMismatch`] instead of guessing, and
//! numeric accessors go through [`Numeric`] so that a value is never
//! silently truncated.
//!
//! # Ownership
//!
//! The host lends each message's value as `&Value`; it is only valid while
//! the message is being dispatched. A node that needs the value later (for
//! example while a command waits in the mailbox) takes an owned copy with
//! [`Value::duplicate`]. Owned values are released by `Drop`, exactly once.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{NodeError, Result};
use crate::numeric::Numeric;

/// Discriminant of a [`Value`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    /// Valueless signal (also used as null)
    Pulse,
    Boolean,
    /// 64-bit signed integer
    Integer,
    /// 64-bit float
    Scalar,
    /// Byte string, UTF-8 not enforced
    String,
    /// Raw byte buffer
    Vector,
    /// Ordered set of uniquely named children
    Tuple,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Pulse => "pulse",
            ValueType::Boolean => "boolean",
            ValueType::Integer => "integer",
            ValueType::Scalar => "scalar",
            ValueType::String => "string",
            ValueType::Vector => "vector",
            ValueType::Tuple => "tuple",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tagged union of everything a node can send or receive
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    #[default]
    Pulse,
    Boolean(bool),
    Integer(i64),
    Scalar(f64),
    String(Vec<u8>),
    Vector(Vec<u8>),
    Tuple(Tuple),
}

impl Value {
    /// Create a string value from UTF-8 text
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into().into_bytes())
    }

    /// Create a vector value from raw bytes
    pub fn vector(bytes: impl Into<Vec<u8>>) -> Self {
        Value::Vector(bytes.into())
    }

    /// Get the discriminant
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Pulse => ValueType::Pulse,
            Value::Boolean(_) => ValueType::Boolean,
            Value::Integer(_) => ValueType::Integer,
            Value::Scalar(_) => ValueType::Scalar,
            Value::String(_) => ValueType::String,
            Value::Vector(_) => ValueType::Vector,
            Value::Tuple(_) => ValueType::Tuple,
        }
    }

    pub fn is_pulse(&self) -> bool {
        matches!(self, Value::Pulse)
    }

    pub fn as_boolean(&self) -> Result<bool> {
        match self {
            Value::Boolean(b) => Ok(*b),
            other => Err(NodeError::type_mismatch("boolean", other.value_type())),
        }
    }

    pub fn as_integer(&self) -> Result<i64> {
        match self {
            Value::Integer(i) => Ok(*i),
            other => Err(NodeError::type_mismatch("integer", other.value_type())),
        }
    }

    pub fn as_scalar(&self) -> Result<f64> {
        match self {
            Value::Scalar(f) => Ok(*f),
            other => Err(NodeError::type_mismatch("scalar", other.value_type())),
        }
    }

    /// Raw bytes of a string value
    pub fn as_string(&self) -> Result<&[u8]> {
        match self {
            Value::String(s) => Ok(s),
            other => Err(NodeError::type_mismatch("string", other.value_type())),
        }
    }

    /// A string value as UTF-8 text
    pub fn as_str(&self) -> Result<&str> {
        std::str::from_utf8(self.as_string()?)
            .map_err(|_| NodeError::validation("string is not valid UTF-8"))
    }

    pub fn as_vector(&self) -> Result<&[u8]> {
        match self {
            Value::Vector(v) => Ok(v),
            other => Err(NodeError::type_mismatch("vector", other.value_type())),
        }
    }

    pub fn as_tuple(&self) -> Result<&Tuple> {
        match self {
            Value::Tuple(t) => Ok(t),
            other => Err(NodeError::type_mismatch("tuple", other.value_type())),
        }
    }

    /// Read an integer and safely cast it to `T`
    pub fn integer<T: Numeric>(&self) -> Result<T> {
        T::from_integer(self.as_integer()?)
    }

    /// Read a scalar and safely cast it to `T`
    pub fn scalar<T: Numeric>(&self) -> Result<T> {
        T::from_scalar(self.as_scalar()?)
    }

    /// Read either numeric representation and safely cast it to `T`
    pub fn integer_or_scalar<T: Numeric>(&self) -> Result<T> {
        match self {
            Value::Integer(i) => T::from_integer(*i),
            Value::Scalar(f) => T::from_scalar(*f),
            other => Err(NodeError::type_mismatch(
                "integer or scalar",
                other.value_type(),
            )),
        }
    }

    /// Byte view of a vector or string value
    pub fn vector_or_string(&self) -> Result<&[u8]> {
        match self {
            Value::Vector(v) => Ok(v),
            Value::String(s) => Ok(s),
            other => Err(NodeError::type_mismatch(
                "vector or string",
                other.value_type(),
            )),
        }
    }

    /// Look up a tuple field by name
    pub fn field(&self, name: &str) -> Result<&Value> {
        self.as_tuple()?.field(name)
    }

    /// Look up a tuple field by name, `None` if absent or not a tuple
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Tuple(t) => t.get(name),
            _ => None,
        }
    }

    pub fn set_pulse(&mut self) {
        *self = Value::Pulse;
    }

    pub fn set_boolean(&mut self, b: bool) {
        *self = Value::Boolean(b);
    }

    pub fn set_integer(&mut self, i: i64) {
        *self = Value::Integer(i);
    }

    pub fn set_scalar(&mut self, f: f64) {
        *self = Value::Scalar(f);
    }

    pub fn set_string(&mut self, bytes: impl Into<Vec<u8>>) {
        *self = Value::String(bytes.into());
    }

    pub fn set_vector(&mut self, bytes: impl Into<Vec<u8>>) {
        *self = Value::Vector(bytes.into());
    }

    /// Turn this value into a tuple with the given field names
    ///
    /// Returns the children, positionally bound to `names` and initialized
    /// to pulses. On a duplicate name the value is left unchanged.
    pub fn set_tuple<S: AsRef<str>>(&mut self, names: &[S]) -> Result<&mut [Value]> {
        let tuple = Tuple::with_names(names)?;
        *self = Value::Tuple(tuple);
        match self {
            Value::Tuple(t) => Ok(t.values_mut()),
            other => Err(NodeError::type_mismatch("tuple", other.value_type())),
        }
    }

    /// Deep copy, used whenever a value must outlive the message carrying it
    pub fn duplicate(&self) -> Value {
        self.clone()
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i.into())
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Scalar(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s.into_bytes())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Vector(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Vector(v.to_vec())
    }
}

impl From<Tuple> for Value {
    fn from(t: Tuple) -> Self {
        Value::Tuple(t)
    }
}

/// Ordered set of uniquely named child values
///
/// Order matters for positional access; lookup by name ignores it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TupleFields")]
pub struct Tuple {
    names: Vec<String>,
    values: Vec<Value>,
}

/// Unchecked wire form of a [`Tuple`]
#[derive(Deserialize)]
struct TupleFields {
    names: Vec<String>,
    values: Vec<Value>,
}

impl TryFrom<TupleFields> for Tuple {
    type Error = NodeError;

    fn try_from(fields: TupleFields) -> Result<Self> {
        if fields.names.len() != fields.values.len() {
            return Err(NodeError::validation(format!(
                "tuple has {} names but {} values",
                fields.names.len(),
                fields.values.len()
            )));
        }
        Tuple::from_fields(fields.names.into_iter().zip(fields.values))
    }
}

impl Tuple {
    /// Create a tuple whose children are all pulses
    pub fn with_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        Self::from_fields(names.iter().map(|n| (n.as_ref(), Value::Pulse)))
    }

    /// Create a tuple from `(name, value)` pairs
    pub fn from_fields<N, I>(fields: I) -> Result<Self>
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, Value)>,
    {
        let mut tuple = Tuple::default();
        for (name, value) in fields {
            let name = name.into();
            if tuple.names.contains(&name) {
                return Err(NodeError::validation(format!(
                    "duplicate tuple field '{}'",
                    name
                )));
            }
            tuple.names.push(name);
            tuple.values.push(value);
        }
        Ok(tuple)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.values[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        let index = self.names.iter().position(|n| n == name)?;
        Some(&mut self.values[index])
    }

    /// Look up a field, failing with `MissingField` if absent
    pub fn field(&self, name: &str) -> Result<&Value> {
        self.get(name)
            .ok_or_else(|| NodeError::MissingField(name.to_string()))
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [Value] {
        &mut self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.names.iter().map(String::as_str).zip(self.values.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_type_query() {
        assert_eq!(Value::Pulse.value_type(), ValueType::Pulse);
        assert_eq!(Value::from(true).value_type(), ValueType::Boolean);
        assert_eq!(Value::from(3i64).value_type(), ValueType::Integer);
        assert_eq!(Value::from(0.5).value_type(), ValueType::Scalar);
        assert_eq!(Value::from("abc").value_type(), ValueType::String);
        assert_eq!(Value::vector(vec![1, 2]).value_type(), ValueType::Vector);
        assert_eq!(Value::from(Tuple::default()).value_type(), ValueType::Tuple);
    }

    #[test]
    fn test_accessor_type_mismatch() {
        let v = Value::from("text");
        let err = v.as_integer().unwrap_err();
        assert!(matches!(
            err,
            NodeError::TypeMismatch {
                expected: "integer",
                found: ValueType::String
            }
        ));
        assert!(v.as_vector().is_err());
        assert!(Value::from(1i64).as_scalar().is_err());
        assert!(Value::Pulse.as_boolean().is_err());
    }

    #[test]
    fn test_integer_or_scalar() {
        assert_eq!(Value::from(42i64).integer_or_scalar::<u8>().unwrap(), 42);
        assert_eq!(Value::from(42.0).integer_or_scalar::<i32>().unwrap(), 42);
        assert!(Value::from(-1i64).integer_or_scalar::<u32>().is_err());
        assert!(Value::from(1e20).integer_or_scalar::<i32>().is_err());
        assert!(Value::from("42").integer_or_scalar::<i32>().is_err());
        assert_eq!(Value::from(7i64).integer_or_scalar::<f64>().unwrap(), 7.0);
    }

    #[test]
    fn test_typed_integer_and_scalar() {
        assert_eq!(Value::from(300i64).integer::<i16>().unwrap(), 300);
        assert!(Value::from(300i64).integer::<i8>().is_err());
        assert!(Value::from(3.0).integer::<i64>().is_err());
        assert_eq!(Value::from(3.0).scalar::<i64>().unwrap(), 3);
    }

    #[test]
    fn test_vector_or_string() {
        assert_eq!(Value::from("ab").vector_or_string().unwrap(), b"ab");
        assert_eq!(Value::vector(vec![9]).vector_or_string().unwrap(), &[9]);
        assert!(Value::from(1i64).vector_or_string().is_err());
    }

    #[test]
    fn test_as_str_rejects_invalid_utf8() {
        let v = Value::String(vec![0xff, 0xfe]);
        assert_eq!(v.as_string().unwrap(), &[0xff, 0xfe]);
        assert!(matches!(v.as_str(), Err(NodeError::Validation(_))));
    }

    #[test]
    fn test_set_tuple_positional_and_lookup() {
        let mut v = Value::Pulse;
        {
            let children = v.set_tuple(&["size", "offset"]).unwrap();
            assert_eq!(children.len(), 2);
            children[0].set_integer(16);
            children[1].set_integer(4);
        }
        assert_eq!(v.field("offset").unwrap().as_integer().unwrap(), 4);
        assert_eq!(v.field("size").unwrap().as_integer().unwrap(), 16);

        let tuple = v.as_tuple().unwrap();
        assert_eq!(tuple.names(), &["size".to_string(), "offset".to_string()]);
        assert!(matches!(
            v.field("buffer"),
            Err(NodeError::MissingField(name)) if name == "buffer"
        ));
    }

    #[test]
    fn test_set_tuple_rejects_duplicate_names() {
        let mut v = Value::from(5i64);
        assert!(v.set_tuple(&["a", "a"]).is_err());
        assert_eq!(v.as_integer().unwrap(), 5);
    }

    #[test]
    fn test_field_on_non_tuple() {
        let v = Value::from(1i64);
        assert!(matches!(v.field("x"), Err(NodeError::TypeMismatch { .. })));
        assert!(v.get("x").is_none());
    }

    #[test]
    fn test_duplicate_is_independent() {
        let original = Value::from(
            Tuple::from_fields([("buffer", Value::from("abc")), ("offset", Value::from(1i64))])
                .unwrap(),
        );
        let mut copy = original.duplicate();
        if let Value::Tuple(t) = &mut copy {
            t.get_mut("buffer").unwrap().set_vector(vec![1, 2, 3]);
        }
        assert_eq!(original.field("buffer").unwrap().as_string().unwrap(), b"abc");
        assert_eq!(copy.field("buffer").unwrap().as_vector().unwrap(), &[1, 2, 3]);
    }

    #[test]
    fn test_serde_shape() {
        let v = Value::from(5i64);
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json, serde_json::json!({"type": "integer", "value": 5}));

        let pulse: Value = serde_json::from_value(serde_json::json!({"type": "pulse"})).unwrap();
        assert!(pulse.is_pulse());
    }

    #[test]
    fn test_tuple_deserialize_round_trip() {
        let tuple = Tuple::from_fields([("size", Value::from(3i64)), ("offset", Value::Pulse)])
            .unwrap();
        let json = serde_json::to_value(Value::from(tuple.clone())).unwrap();
        let back: Value = serde_json::from_value(json).unwrap();
        assert_eq!(back.as_tuple().unwrap(), &tuple);
    }

    #[test]
    fn test_tuple_deserialize_rejects_length_mismatch() {
        let json = serde_json::json!({
            "type": "tuple",
            "value": {"names": ["a", "b"], "values": [{"type": "pulse"}]}
        });
        let err = serde_json::from_value::<Value>(json).unwrap_err();
        assert!(err.to_string().contains("tuple has 2 names but 1 values"));
    }

    #[test]
    fn test_tuple_deserialize_rejects_duplicate_names() {
        let json = serde_json::json!({
            "type": "tuple",
            "value": {"names": ["a", "a"], "values": [{"type": "pulse"}, {"type": "pulse"}]}
        });
        let err = serde_json::from_value::<Value>(json).unwrap_err();
        assert!(err.to_string().contains("duplicate tuple field 'a'"));
    }
}
