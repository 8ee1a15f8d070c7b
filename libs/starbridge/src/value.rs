use std::fmt;
use std::hash::{Hash, Hasher};

use indexmap::{IndexMap, IndexSet};
use num_bigint::BigInt;

/// Text-keyed dictionary. Insertion-ordered, compared without regard to order.
pub type Dict = IndexMap<String, Value>;

/// Dynamic value exchanged with the scripting side.
///
/// Strategy by kind:
/// - Scalars (None, Bool, Int, Float): plain values
/// - String, Bytes: owned buffers, String is always UTF-8
/// - Dict, List, Tuple, Set: recursive, owned
///
/// Only the hashable kinds (everything except Dict, List and Set, and tuples
/// holding one of those) can be members of a [`Set`].
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    None,
    Bool(bool),
    Bytes(Vec<u8>),
    String(String),
    /// Arbitrary precision, signed.
    Int(BigInt),
    Float(f64),
    Dict(Dict),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Set(Set),
}

impl Value {
    /// Kind name, as shown in conversion errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Bytes(_) => "bytes",
            Value::String(_) => "string",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Dict(_) => "dict",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Set(_) => "set",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn is_hashable(&self) -> bool {
        match self {
            Value::Dict(_) | Value::List(_) | Value::Set(_) => false,
            Value::Tuple(items) => items.iter().all(Value::is_hashable),
            _ => true,
        }
    }

    /// Member lookup on a Dict. `None` for other kinds.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Dict(dict) => dict.get(key),
            _ => None,
        }
    }

    /// Member assignment on a Dict. Hands the value back for other kinds.
    pub fn set_key(&mut self, key: impl Into<String>, value: Value) -> Result<(), Value> {
        match self {
            Value::Dict(dict) => {
                dict.insert(key.into(), value);
                Ok(())
            }
            _ => Err(value),
        }
    }

    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Value::Dict(dict) => Some(dict),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<&BigInt> {
        match self {
            Value::Int(i) => Some(i),
            _ => None,
        }
    }

    /// Number of members of a container kind.
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::Dict(dict) => Some(dict.len()),
            Value::List(items) | Value::Tuple(items) => Some(items.len()),
            Value::Set(set) => Some(set.len()),
            Value::Bytes(bytes) => Some(bytes.len()),
            Value::String(s) => Some(s.len()),
            _ => None,
        }
    }

    /// Iterates the members of a List, Tuple or Set, in order.
    pub fn elements(&self) -> Option<Elements<'_>> {
        match self {
            Value::List(items) | Value::Tuple(items) => Some(Elements::Slice(items.iter())),
            Value::Set(set) => Some(Elements::Set(set.0.iter())),
            _ => None,
        }
    }
}

/// Iterator over the members of a sequence-like [`Value`].
pub enum Elements<'a> {
    Slice(std::slice::Iter<'a, Value>),
    Set(indexmap::set::Iter<'a, Value>),
}

impl<'a> Iterator for Elements<'a> {
    type Item = &'a Value;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Elements::Slice(it) => it.next(),
            Elements::Set(it) => it.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            Elements::Slice(it) => it.size_hint(),
            Elements::Set(it) => it.size_hint(),
        }
    }
}

impl ExactSizeIterator for Elements<'_> {}

// Floats compare by value, except that NaN equals NaN so that Set membership
// stays consistent with Hash.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::Dict(a), Value::Dict(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) => a == b,
            (Value::Set(a), Value::Set(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Bool(b) => b.hash(state),
            Value::Bytes(b) => b.hash(state),
            Value::String(s) => s.hash(state),
            Value::Int(i) => i.hash(state),
            Value::Float(f) => float_bits(*f).hash(state),
            Value::Tuple(items) => items.hash(state),
            // unhashable kinds never reach a Set
            Value::None | Value::Dict(_) | Value::List(_) | Value::Set(_) => {}
        }
    }
}

fn float_bits(f: f64) -> u64 {
    if f == 0.0 {
        0.0f64.to_bits()
    } else if f.is_nan() {
        f64::NAN.to_bits()
    } else {
        f.to_bits()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Bytes(bytes) => write!(f, "b\"{}\"", bytes.escape_ascii()),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Dict(dict) => {
                f.write_str("{")?;
                for (i, (k, v)) in dict.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k:?}: {v}")?;
                }
                f.write_str("}")
            }
            Value::List(items) => {
                f.write_str("[")?;
                write_items(f, items.iter())?;
                f.write_str("]")
            }
            Value::Tuple(items) => {
                f.write_str("(")?;
                write_items(f, items.iter())?;
                if items.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
            Value::Set(set) => {
                f.write_str("set([")?;
                write_items(f, set.iter())?;
                f.write_str("])")
            }
        }
    }
}

fn write_items<'a>(
    f: &mut fmt::Formatter<'_>,
    items: impl Iterator<Item = &'a Value>,
) -> fmt::Result {
    for (i, item) in items.enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<BigInt> for Value {
    fn from(i: BigInt) -> Self {
        Value::Int(i)
    }
}

impl From<Dict> for Value {
    fn from(dict: Dict) -> Self {
        Value::Dict(dict)
    }
}

impl From<Set> for Value {
    fn from(set: Set) -> Self {
        Value::Set(set)
    }
}

macro_rules! from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(i: $ty) -> Self {
                    Value::Int(BigInt::from(i))
                }
            }
        )*
    };
}

from_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

/// Error returned when inserting an unhashable value into a [`Set`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unhashable type: {0}")]
pub struct UnhashableError(pub &'static str);

/// Insertion-ordered collection of distinct hashable values.
///
/// Equality ignores order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Set(IndexSet<Value>);

impl Set {
    pub fn new() -> Self {
        Self(IndexSet::new())
    }

    pub fn with_capacity(n: usize) -> Self {
        Self(IndexSet::with_capacity(n))
    }

    /// Adds a member. Returns whether it was newly inserted.
    pub fn insert(&mut self, value: Value) -> Result<bool, UnhashableError> {
        if !value.is_hashable() {
            return Err(UnhashableError(unhashable_kind(&value)));
        }
        Ok(self.0.insert(value))
    }

    pub fn contains(&self, value: &Value) -> bool {
        value.is_hashable() && self.0.contains(value)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> indexmap::set::Iter<'_, Value> {
        self.0.iter()
    }
}

// For a tuple, names the first unhashable member kind found.
fn unhashable_kind(value: &Value) -> &'static str {
    match value {
        Value::Tuple(items) => items
            .iter()
            .find(|v| !v.is_hashable())
            .map(unhashable_kind)
            .unwrap_or("tuple"),
        other => other.type_name(),
    }
}

impl TryFrom<Vec<Value>> for Set {
    type Error = UnhashableError;

    fn try_from(values: Vec<Value>) -> Result<Self, Self::Error> {
        let mut set = Set::with_capacity(values.len());
        for value in values {
            set.insert(value)?;
        }
        Ok(set)
    }
}

impl<'a> IntoIterator for &'a Set {
    type Item = &'a Value;
    type IntoIter = indexmap::set::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
