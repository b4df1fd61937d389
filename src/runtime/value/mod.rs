//! Runtime value representation
//!
//! [`Value`] is the universal stack element: a closed tagged union over the
//! primitive types (`Null`, `Boolean`, `Integer`, `ByteString`) and the
//! compound types (`Array`, `Struct`, `Map`). Primitives are cloned by value;
//! compound values are shared handles, so cloning one produces a second
//! reference to the same storage.
//!
//! Every value has a canonical byte representation ([`Value::memory`]) which is
//! used for hashing, byte-level comparison and size limits. Containers can
//! share elements but never contain themselves, directly or through others.

mod byte_string;
mod compound;
mod graph;
mod integer;
mod map;

pub use byte_string::ByteString;
pub use compound::{Array, CompoundType, Struct};
pub use integer::Integer;
pub use map::Map;

use crate::parser::limits::{MAX_INTEGER_SIZE, MAX_ITEM_SIZE, MAX_KEY_SIZE};
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Type tag of a stack item, using the byte codes of the instruction set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum StackItemType {
    /// Any type, also the tag of `Null`
    Any = 0x00,
    /// A code pointer
    Pointer = 0x10,
    Boolean = 0x20,
    Integer = 0x21,
    /// An immutable memory block
    ByteString = 0x28,
    /// A mutable memory block
    Buffer = 0x30,
    Array = 0x40,
    Struct = 0x41,
    Map = 0x48,
    /// An object owned by the host
    InteropInterface = 0x60,
}

impl StackItemType {
    /// Look up a type tag by byte code
    pub fn from_u8(byte: u8) -> Option<Self> {
        use StackItemType::*;
        match byte {
            0x00 => Some(Any),
            0x10 => Some(Pointer),
            0x20 => Some(Boolean),
            0x21 => Some(Integer),
            0x28 => Some(ByteString),
            0x30 => Some(Buffer),
            0x40 => Some(Array),
            0x41 => Some(Struct),
            0x48 => Some(Map),
            0x60 => Some(InteropInterface),
            _ => None,
        }
    }

    /// Whether values of this type are primitive (not containers)
    pub fn is_primitive(self) -> bool {
        matches!(
            self,
            StackItemType::Boolean | StackItemType::Integer | StackItemType::ByteString
        )
    }
}

impl fmt::Display for StackItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Errors raised by value projections and container operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueError {
    #[error("Invalid cast from {from} to {to}")]
    InvalidCast { from: StackItemType, to: StackItemType },
    #[error("Integer size {size} exceeds the maximum of {max} bytes", max = MAX_INTEGER_SIZE)]
    IntegerTooLarge { size: usize },
    #[error("Key size {size} exceeds the maximum of {max} bytes", max = MAX_KEY_SIZE)]
    KeyTooLarge { size: usize },
    #[error("Unsupported operation: {0} is read-only")]
    ReadOnly(StackItemType),
    #[error("Index {index} out of range for {count} items")]
    IndexOutOfRange { index: usize, count: usize },
    #[error("Key not found")]
    KeyNotFound,
    #[error("{0} cannot be used as a map key")]
    InvalidKeyType(StackItemType),
    #[error("Byte string is not valid UTF-8")]
    InvalidUtf8,
    #[error("A {0} cannot contain itself")]
    SelfReference(StackItemType),
    #[error("Memory of a compound value exceeds {limit} bytes")]
    MemoryTooLarge { limit: usize },
    #[error("Compound value spans more than {limit} containers")]
    TooManyContainers { limit: usize },
}

/// Runtime representation of a stack item
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(Integer),
    ByteString(ByteString),
    Array(Array),
    Struct(Struct),
    Map(Map),
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

// === Constructors ===

impl Value {
    pub fn from_bool(value: bool) -> Self {
        Value::Boolean(value)
    }

    pub fn from_int(value: i64) -> Self {
        Value::Integer(Integer::from(value))
    }

    pub fn from_integer(value: Integer) -> Self {
        Value::Integer(value)
    }

    /// Build an integer value, failing if its encoding exceeds 32 bytes
    pub fn try_from_bigint(value: BigInt) -> Result<Self, ValueError> {
        Ok(Value::Integer(Integer::new(value)?))
    }

    pub fn from_bytes(bytes: impl Into<std::rc::Rc<[u8]>>) -> Self {
        Value::ByteString(ByteString::new(bytes))
    }

    /// UTF-8 encoded byte string
    pub fn from_string(value: &str) -> Self {
        Value::ByteString(ByteString::from(value))
    }

    pub fn from_array(array: Array) -> Self {
        Value::Array(array)
    }

    pub fn from_struct(value: Struct) -> Self {
        Value::Struct(value)
    }

    pub fn from_map(map: Map) -> Self {
        Value::Map(map)
    }
}

// === Contract ===

impl Value {
    /// The type tag of this value
    pub fn item_type(&self) -> StackItemType {
        match self {
            Value::Null => StackItemType::Any,
            Value::Boolean(_) => StackItemType::Boolean,
            Value::Integer(_) => StackItemType::Integer,
            Value::ByteString(_) => StackItemType::ByteString,
            Value::Array(_) => StackItemType::Array,
            Value::Struct(_) => StackItemType::Struct,
            Value::Map(_) => StackItemType::Map,
        }
    }

    /// Canonical byte representation.
    ///
    /// Integers use minimal little-endian two's complement (empty for zero),
    /// booleans are `[1]`/`[0]`, arrays and structs concatenate their items,
    /// and maps concatenate all keys followed by all values. Only compound
    /// values can fail, when their memory passes [`MAX_ITEM_SIZE`].
    pub fn memory(&self) -> Result<Cow<'_, [u8]>, ValueError> {
        self.memory_within(MAX_ITEM_SIZE)
    }

    /// [`Value::memory`] with compound memory bounded by `limit` bytes
    pub fn memory_within(&self, limit: usize) -> Result<Cow<'_, [u8]>, ValueError> {
        Ok(match self {
            Value::Null => Cow::Borrowed(&[]),
            Value::Boolean(true) => Cow::Borrowed(&[1]),
            Value::Boolean(false) => Cow::Borrowed(&[0]),
            Value::Integer(i) => Cow::Owned(i.to_bytes()),
            Value::ByteString(b) => Cow::Borrowed(b.as_bytes()),
            compound => Cow::Owned(graph::flatten(compound, limit)?),
        })
    }

    /// Size in bytes; integers report the length of their minimal encoding
    pub fn size(&self) -> Result<usize, ValueError> {
        Ok(match self {
            Value::Null => 0,
            Value::Boolean(_) => 1,
            Value::Integer(i) => i.size(),
            Value::ByteString(b) => b.len(),
            _ => self.memory()?.len(),
        })
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether this is an `Array`, `Struct` or `Map`
    pub fn is_compound(&self) -> bool {
        matches!(self, Value::Array(_) | Value::Struct(_) | Value::Map(_))
    }

    /// Truthiness: null is false, compound values are always true, and
    /// integers and byte strings are true when any byte is non-zero.
    pub fn get_boolean(&self) -> Result<bool, ValueError> {
        match self {
            Value::Null => Ok(false),
            Value::Boolean(b) => Ok(*b),
            Value::Integer(i) => Ok(!i.is_zero()),
            Value::ByteString(b) => b.get_boolean(),
            Value::Array(_) | Value::Struct(_) | Value::Map(_) => Ok(true),
        }
    }

    /// Integer projection; fails for null, compound values and byte strings
    /// longer than 32 bytes
    pub fn get_integer(&self) -> Result<BigInt, ValueError> {
        match self {
            Value::Boolean(b) => Ok(BigInt::from(u8::from(*b))),
            Value::Integer(i) => Ok(i.value().clone()),
            Value::ByteString(b) => b.get_integer(),
            other => Err(ValueError::InvalidCast {
                from: other.item_type(),
                to: StackItemType::Integer,
            }),
        }
    }

    pub fn get_span(&self) -> Result<Cow<'_, [u8]>, ValueError> {
        self.memory()
    }

    /// String projection. `None` for null.
    pub fn get_string(&self) -> Result<Option<String>, ValueError> {
        match self {
            Value::Null => Ok(None),
            Value::Boolean(b) => Ok(Some(b.to_string())),
            Value::Integer(i) => Ok(Some(i.value().to_string())),
            other => String::from_utf8(other.memory()?.into_owned())
                .map(Some)
                .map_err(|_| ValueError::InvalidUtf8),
        }
    }

    /// Convert to another item type.
    ///
    /// Primitives convert among themselves through their projections, arrays
    /// and structs convert into each other sharing their elements, and every
    /// value converts to `Boolean`. Null converts to any concrete type and
    /// stays null.
    pub fn convert_to(&self, target: StackItemType) -> Result<Value, ValueError> {
        let invalid = || ValueError::InvalidCast {
            from: self.item_type(),
            to: target,
        };
        if let Value::Null = self {
            return match target {
                StackItemType::Any => Err(invalid()),
                _ => Ok(Value::Null),
            };
        }
        if target == self.item_type() {
            return Ok(self.clone());
        }
        match (self, target) {
            (_, StackItemType::Boolean) => Ok(Value::from_bool(self.get_boolean()?)),
            (Value::Boolean(_) | Value::ByteString(_), StackItemType::Integer) => {
                Value::try_from_bigint(self.get_integer()?)
            }
            (Value::Boolean(_) | Value::Integer(_), StackItemType::ByteString) => {
                Ok(Value::from_bytes(self.memory()?.into_owned()))
            }
            (Value::Array(a), StackItemType::Struct) => Ok(Value::from_struct(Struct::new(a.items()))),
            (Value::Struct(s), StackItemType::Array) => Ok(Value::from_array(Array::new(s.items()))),
            _ => Err(invalid()),
        }
    }
}

// === Accessors ===

impl Value {
    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&Struct> {
        match self {
            Value::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// The compound view of this value, if it is a container
    pub fn as_compound(&self) -> Option<&dyn CompoundType> {
        match self {
            Value::Array(a) => Some(a),
            Value::Struct(s) => Some(s),
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Number of live handles to this value's storage, 1 for primitives
    pub fn reference_count(&self) -> usize {
        match self {
            Value::Array(a) => a.handle_count(),
            Value::Struct(s) => s.handle_count(),
            Value::Map(m) => m.handle_count(),
            _ => 1,
        }
    }

    /// Address of compound storage, used for identity checks
    pub(crate) fn storage_ptr(&self) -> Option<*const ()> {
        match self {
            Value::Array(a) => Some(a.storage_ptr()),
            Value::Struct(s) => Some(s.storage_ptr()),
            Value::Map(m) => Some(m.storage_ptr()),
            _ => None,
        }
    }

    /// Whether both values are handles to the same compound storage
    pub fn same_storage(&self, other: &Value) -> bool {
        match (self.storage_ptr(), other.storage_ptr()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Copy with value semantics: structs are deep-copied, everything else
    /// shares storage
    pub fn value_copy(&self) -> Result<Value, ValueError> {
        match self {
            Value::Struct(s) => Ok(Value::Struct(s.deep_clone()?)),
            other => Ok(other.clone()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        graph::equals(self, other)
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.item_type() as u8).hash(state);
        match self {
            Value::Null => {}
            Value::Boolean(b) => b.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::ByteString(b) => b.hash(state),
            Value::Array(a) => a.hash(state),
            Value::Struct(s) => s.hash(state),
            Value::Map(m) => m.hash(state),
        }
    }
}

/// Nested containers past a fixed depth and elements past a fixed count are
/// elided with `..`
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        graph::display(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn null_contract() {
        let null = Value::Null;
        assert_eq!(null, Value::default());
        assert_eq!(null.item_type(), StackItemType::Any);
        assert_eq!(null.size().unwrap(), 0);
        assert!(null.memory().unwrap().is_empty());
        assert!(null.get_span().unwrap().is_empty());
        assert!(null.is_null());
        assert!(!null.get_boolean().unwrap());
        assert_eq!(null.get_string().unwrap(), None);
        assert_eq!(
            null.get_integer(),
            Err(ValueError::InvalidCast {
                from: StackItemType::Any,
                to: StackItemType::Integer
            })
        );
    }

    #[test]
    fn boolean_contract() {
        let t = Value::from_bool(true);
        let f = Value::from_bool(false);
        assert_eq!(&*t.memory().unwrap(), &[1]);
        assert_eq!(&*f.memory().unwrap(), &[0]);
        assert_eq!(t.size().unwrap(), 1);
        assert_eq!(t.get_integer().unwrap(), BigInt::from(1));
        assert_eq!(f.get_integer().unwrap(), BigInt::from(0));
        assert_eq!(t.get_string().unwrap().as_deref(), Some("true"));
        assert_ne!(t, f);
    }

    #[rstest]
    #[case(Value::from_int(0), false)]
    #[case(Value::from_int(1), true)]
    #[case(Value::from_int(-1), true)]
    #[case(Value::from_int(999), true)]
    #[case(Value::from_bytes(vec![0, 0, 0, 0]), false)]
    #[case(Value::from_bytes(vec![0, 0, 0, 0x80]), true)]
    #[case(Value::from_bytes(Vec::new()), false)]
    #[case(Value::from_array(Array::new(Vec::new())), true)]
    #[case(Value::from_map(Map::new()), true)]
    fn truthiness(#[case] value: Value, #[case] expected: bool) {
        assert_eq!(value.get_boolean().unwrap(), expected);
    }

    #[test]
    fn oversized_byte_string_does_not_coerce() {
        let value = Value::from_bytes(vec![1u8; 33]);
        assert!(value.get_boolean().is_err());
        assert!(value.get_integer().is_err());
    }

    #[test]
    fn compound_values_are_not_integers() {
        let value = Value::from_array(Array::new(vec![Value::from_int(1)]));
        assert_eq!(
            value.get_integer(),
            Err(ValueError::InvalidCast {
                from: StackItemType::Array,
                to: StackItemType::Integer
            })
        );
    }

    #[test]
    fn equality_requires_same_type() {
        assert_ne!(Value::from_int(1), Value::from_bool(true));
        assert_ne!(Value::from_int(1), Value::from_bytes(vec![1]));
        assert_ne!(Value::Null, Value::from_int(0));
    }

    #[test]
    fn array_never_equals_struct() {
        let items = vec![Value::from_int(1), Value::from_int(2)];
        let array = Value::from_array(Array::new(items.clone()));
        let st = Value::from_struct(Struct::new(items));
        assert_ne!(array, st);
    }

    #[test]
    fn get_string_of_integer_is_decimal() {
        assert_eq!(Value::from_int(1).get_string().unwrap().as_deref(), Some("1"));
        assert_eq!(Value::from_int(-42).get_string().unwrap().as_deref(), Some("-42"));
    }

    #[test]
    fn get_string_rejects_invalid_utf8() {
        let value = Value::from_bytes(vec![0xff, 0xfe]);
        assert_eq!(value.get_string(), Err(ValueError::InvalidUtf8));
    }

    #[test]
    fn display() {
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::from_int(-7).to_string(), "-7");
        assert_eq!(Value::from_bytes(vec![0x0a, 0xff]).to_string(), "0x0aff");
        let array = Array::new(vec![Value::from_int(1), Value::from_bool(true)]);
        assert_eq!(Value::from_array(array).to_string(), "[1, true]");
        let map = Map::new();
        map.set(Value::from_int(1), Value::from_string("a")).unwrap();
        assert_eq!(Value::from_map(map).to_string(), "{1: 0x61}");
    }

    #[test]
    fn value_copy_deep_copies_structs_only() {
        let inner = Value::from_struct(Struct::new(vec![Value::from_int(1)]));
        let copy = inner.value_copy().unwrap();
        assert_eq!(inner, copy);
        assert!(!inner.same_storage(&copy));

        let array = Value::from_array(Array::new(Vec::new()));
        assert!(array.same_storage(&array.value_copy().unwrap()));
    }

    #[rstest]
    #[case(Value::from_int(258), StackItemType::ByteString, Value::from_bytes(vec![0x02, 0x01]))]
    #[case(Value::from_bytes(vec![0xff]), StackItemType::Integer, Value::from_int(-1))]
    #[case(Value::from_bool(true), StackItemType::Integer, Value::from_int(1))]
    #[case(Value::from_int(0), StackItemType::Boolean, Value::from_bool(false))]
    #[case(Value::from_map(Map::new()), StackItemType::Boolean, Value::from_bool(true))]
    #[case(Value::Null, StackItemType::Integer, Value::Null)]
    #[case(Value::from_int(5), StackItemType::Integer, Value::from_int(5))]
    fn convert_to(#[case] value: Value, #[case] target: StackItemType, #[case] expected: Value) {
        assert_eq!(value.convert_to(target).unwrap(), expected);
    }

    #[rstest]
    #[case(Value::Null, StackItemType::Any)]
    #[case(Value::from_int(1), StackItemType::Array)]
    #[case(Value::from_map(Map::new()), StackItemType::Array)]
    #[case(Value::from_bytes(vec![1u8; 33]), StackItemType::Integer)]
    #[case(Value::from_int(1), StackItemType::Buffer)]
    fn convert_to_invalid(#[case] value: Value, #[case] target: StackItemType) {
        assert!(matches!(
            value.convert_to(target),
            Err(ValueError::InvalidCast { .. })
        ));
    }

    #[test]
    fn array_struct_conversion_is_shallow() {
        let inner = Value::from_array(Array::new(Vec::new()));
        let array = Value::from_array(Array::new(vec![inner.clone()]));
        let converted = array.convert_to(StackItemType::Struct).unwrap();
        let st = converted.as_struct().unwrap();
        assert_eq!(st.count(), 1);
        assert!(st.get(0).unwrap().same_storage(&inner));
        assert!(!converted.same_storage(&array));
    }

    #[test]
    fn stack_item_type_codes() {
        for t in [
            StackItemType::Any,
            StackItemType::Boolean,
            StackItemType::Integer,
            StackItemType::ByteString,
            StackItemType::Array,
            StackItemType::Struct,
            StackItemType::Map,
        ] {
            assert_eq!(StackItemType::from_u8(t as u8), Some(t));
        }
        assert_eq!(StackItemType::from_u8(0x01), None);
    }
}
