//! Descriptor-driven access to statically typed values.
//!
//! Every type that can appear in a record field implements [`Reflect`]. The
//! encoder reads through [`Peek`], the decoder writes through [`Poke`]; both
//! dispatch on the static [`Shape`] of the field, never on runtime type
//! identity.

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::time::{Duration, SystemTime};

use num_bigint::BigInt;

use crate::numeric::{FloatMut, IntMut};
use crate::record::Record;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntWidth {
    I8,
    I16,
    I32,
    I64,
    I128,
    Isize,
    U8,
    U16,
    U32,
    U64,
    U128,
    Usize,
}

impl IntWidth {
    pub fn name(self) -> &'static str {
        match self {
            IntWidth::I8 => "i8",
            IntWidth::I16 => "i16",
            IntWidth::I32 => "i32",
            IntWidth::I64 => "i64",
            IntWidth::I128 => "i128",
            IntWidth::Isize => "isize",
            IntWidth::U8 => "u8",
            IntWidth::U16 => "u16",
            IntWidth::U32 => "u32",
            IntWidth::U64 => "u64",
            IntWidth::U128 => "u128",
            IntWidth::Usize => "usize",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatWidth {
    F32,
    F64,
}

/// Static description of a field type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    Bool,
    Int(IntWidth),
    Float(FloatWidth),
    Str,
    /// `Vec<u8>`.
    Bytes,
    /// `Vec<T>` for any other element type.
    Seq(Box<Shape>),
    /// A mapping to `bool`, treated as a membership set.
    SetMap { map: &'static str, key: Box<Shape> },
    Record(&'static str),
    /// One level of "may be absent".
    Optional(Box<Shape>),
    /// A dynamic [`Value`], passed through as-is.
    Value,
    /// A type with no built-in conversion. Only custom converters handle it.
    Opaque(&'static str),
}

impl Shape {
    /// Nested optionality is the only shape that can be built but not converted.
    pub fn is_valid(&self) -> bool {
        !matches!(self, Shape::Optional(inner) if matches!(**inner, Shape::Optional(_)))
    }

    /// The shape behind one level of optionality, or `self`.
    pub fn unwrap_optional(&self) -> &Shape {
        match self {
            Shape::Optional(inner) => inner,
            other => other,
        }
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, Shape::Seq(_) | Shape::Bytes)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Bool => f.write_str("bool"),
            Shape::Int(width) => f.write_str(width.name()),
            Shape::Float(FloatWidth::F32) => f.write_str("f32"),
            Shape::Float(FloatWidth::F64) => f.write_str("f64"),
            Shape::Str => f.write_str("String"),
            Shape::Bytes => f.write_str("Vec<u8>"),
            Shape::Seq(elem) => write!(f, "Vec<{elem}>"),
            Shape::SetMap { map, key } => write!(f, "{map}<{key}, bool>"),
            Shape::Record(name) | Shape::Opaque(name) => f.write_str(name),
            Shape::Optional(inner) => write!(f, "Option<{inner}>"),
            Shape::Value => f.write_str("Value"),
        }
    }
}

/// Read view of a value, by shape.
pub enum Peek<'a> {
    Bool(bool),
    Int(BigInt),
    /// Both float widths; `f32` widens exactly.
    Float(f64),
    Str(&'a str),
    Bytes(&'a [u8]),
    Seq(&'a dyn Sequence),
    SetMap(&'a dyn SetMap),
    Record(&'a dyn Record),
    Optional(Option<&'a dyn Reflect>),
    Value(&'a Value),
    Opaque,
}

/// Write view of a value, by shape.
pub enum Poke<'a> {
    Bool(&'a mut bool),
    Int(IntMut<'a>),
    Float(FloatMut<'a>),
    Str(&'a mut String),
    Bytes(&'a mut Vec<u8>),
    Seq(&'a mut dyn Sequence),
    SetMap(&'a mut dyn SetMap),
    Record(&'a mut dyn Record),
    Optional(&'a mut dyn Optional),
    Value(&'a mut Value),
    Opaque,
}

/// Upcasts to [`Any`], for custom converters that match on concrete types.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// A type that can appear in a record field.
///
/// Use `#[derive(Record)]` for structs and [`opaque!`](crate::opaque) for
/// types only a custom converter understands.
pub trait Reflect: AsAny + fmt::Debug {
    fn static_shape() -> Shape
    where
        Self: Sized;

    fn shape(&self) -> Shape;

    fn peek(&self) -> Peek<'_>;

    fn poke(&mut self) -> Poke<'_>;
}

impl dyn Reflect {
    pub fn downcast_ref<T: Reflect>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }

    pub fn downcast_mut<T: Reflect>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut()
    }

    pub fn is<T: Reflect>(&self) -> bool {
        self.as_any().is::<T>()
    }
}

/// Generic sequence access (`Vec<T>`).
pub trait Sequence {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn element(&self, index: usize) -> Option<&dyn Reflect>;

    /// Empties the sequence ahead of `len` pushes. A zero length replaces it
    /// with a fresh empty sequence; otherwise the buffer is reused when its
    /// capacity suffices.
    fn reset(&mut self, len: usize);

    /// Appends a default element and returns it for population.
    fn push_default(&mut self) -> &mut dyn Reflect;
}

/// Set-shaped map access (`HashMap<K, bool>`, `BTreeMap<K, bool>`).
pub trait SetMap {
    /// Keys mapped to `true`.
    fn members(&self) -> Vec<&dyn Reflect>;

    fn clear(&mut self);

    /// A default key, to be populated and handed to [`SetMap::insert_member`].
    fn new_key(&self) -> Box<dyn Reflect>;

    fn insert_member(&mut self, key: Box<dyn Reflect>);
}

/// The optionality wrapper (`Option<T>`).
pub trait Optional {
    fn is_none(&self) -> bool;

    fn set_none(&mut self);

    fn get_or_insert_default(&mut self) -> &mut dyn Reflect;
}

macro_rules! reflect_int {
    ($($ty:ty => $width:ident),* $(,)?) => {
        $(
            impl Reflect for $ty {
                fn static_shape() -> Shape {
                    Shape::Int(IntWidth::$width)
                }

                fn shape(&self) -> Shape {
                    Self::static_shape()
                }

                fn peek(&self) -> Peek<'_> {
                    Peek::Int(BigInt::from(*self))
                }

                fn poke(&mut self) -> Poke<'_> {
                    Poke::Int(IntMut::$width(self))
                }
            }
        )*
    };
}

reflect_int!(
    i8 => I8, i16 => I16, i32 => I32, i64 => I64, i128 => I128, isize => Isize,
    u8 => U8, u16 => U16, u32 => U32, u64 => U64, u128 => U128, usize => Usize,
);

impl Reflect for f32 {
    fn static_shape() -> Shape {
        Shape::Float(FloatWidth::F32)
    }

    fn shape(&self) -> Shape {
        Self::static_shape()
    }

    fn peek(&self) -> Peek<'_> {
        Peek::Float(f64::from(*self))
    }

    fn poke(&mut self) -> Poke<'_> {
        Poke::Float(FloatMut::F32(self))
    }
}

impl Reflect for f64 {
    fn static_shape() -> Shape {
        Shape::Float(FloatWidth::F64)
    }

    fn shape(&self) -> Shape {
        Self::static_shape()
    }

    fn peek(&self) -> Peek<'_> {
        Peek::Float(*self)
    }

    fn poke(&mut self) -> Poke<'_> {
        Poke::Float(FloatMut::F64(self))
    }
}

impl Reflect for bool {
    fn static_shape() -> Shape {
        Shape::Bool
    }

    fn shape(&self) -> Shape {
        Self::static_shape()
    }

    fn peek(&self) -> Peek<'_> {
        Peek::Bool(*self)
    }

    fn poke(&mut self) -> Poke<'_> {
        Poke::Bool(self)
    }
}

impl Reflect for String {
    fn static_shape() -> Shape {
        Shape::Str
    }

    fn shape(&self) -> Shape {
        Self::static_shape()
    }

    fn peek(&self) -> Peek<'_> {
        Peek::Str(self)
    }

    fn poke(&mut self) -> Poke<'_> {
        Poke::Str(self)
    }
}

impl Reflect for Value {
    fn static_shape() -> Shape {
        Shape::Value
    }

    fn shape(&self) -> Shape {
        Self::static_shape()
    }

    fn peek(&self) -> Peek<'_> {
        Peek::Value(self)
    }

    fn poke(&mut self) -> Poke<'_> {
        Poke::Value(self)
    }
}

fn is_byte<T: 'static>() -> bool {
    TypeId::of::<T>() == TypeId::of::<u8>()
}

impl<T: Reflect + Default> Reflect for Vec<T> {
    fn static_shape() -> Shape {
        if is_byte::<T>() {
            Shape::Bytes
        } else {
            Shape::Seq(Box::new(T::static_shape()))
        }
    }

    fn shape(&self) -> Shape {
        Self::static_shape()
    }

    fn peek(&self) -> Peek<'_> {
        let any: &dyn Any = self;
        match any.downcast_ref::<Vec<u8>>() {
            Some(bytes) => Peek::Bytes(bytes),
            None => Peek::Seq(self),
        }
    }

    fn poke(&mut self) -> Poke<'_> {
        if is_byte::<T>() {
            let any: &mut dyn Any = self;
            match any.downcast_mut::<Vec<u8>>() {
                Some(bytes) => Poke::Bytes(bytes),
                None => Poke::Opaque,
            }
        } else {
            Poke::Seq(self)
        }
    }
}

impl<T: Reflect + Default> Sequence for Vec<T> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn element(&self, index: usize) -> Option<&dyn Reflect> {
        self.get(index).map(|v| v as &dyn Reflect)
    }

    fn reset(&mut self, len: usize) {
        if len == 0 {
            *self = Vec::new();
        } else if len > self.capacity() {
            *self = Vec::with_capacity(len);
        } else {
            self.clear();
        }
    }

    fn push_default(&mut self) -> &mut dyn Reflect {
        let index = Vec::len(self);
        self.push(T::default());
        &mut self[index]
    }
}

impl<T: Reflect + Default> Reflect for Option<T> {
    fn static_shape() -> Shape {
        Shape::Optional(Box::new(T::static_shape()))
    }

    fn shape(&self) -> Shape {
        Self::static_shape()
    }

    fn peek(&self) -> Peek<'_> {
        Peek::Optional(self.as_ref().map(|v| v as &dyn Reflect))
    }

    fn poke(&mut self) -> Poke<'_> {
        Poke::Optional(self)
    }
}

impl<T: Reflect + Default> Optional for Option<T> {
    fn is_none(&self) -> bool {
        Option::is_none(self)
    }

    fn set_none(&mut self) {
        *self = None;
    }

    fn get_or_insert_default(&mut self) -> &mut dyn Reflect {
        self.get_or_insert_with(T::default)
    }
}

impl<K, S> Reflect for HashMap<K, bool, S>
where
    K: Reflect + Default + Eq + Hash,
    S: BuildHasher + Default + 'static,
{
    fn static_shape() -> Shape {
        Shape::SetMap {
            map: "HashMap",
            key: Box::new(K::static_shape()),
        }
    }

    fn shape(&self) -> Shape {
        Self::static_shape()
    }

    fn peek(&self) -> Peek<'_> {
        Peek::SetMap(self)
    }

    fn poke(&mut self) -> Poke<'_> {
        Poke::SetMap(self)
    }
}

impl<K, S> SetMap for HashMap<K, bool, S>
where
    K: Reflect + Default + Eq + Hash,
    S: BuildHasher + Default + 'static,
{
    fn members(&self) -> Vec<&dyn Reflect> {
        self.iter()
            .filter(|(_, member)| **member)
            .map(|(k, _)| k as &dyn Reflect)
            .collect()
    }

    fn clear(&mut self) {
        HashMap::clear(self);
    }

    fn new_key(&self) -> Box<dyn Reflect> {
        Box::new(K::default())
    }

    fn insert_member(&mut self, key: Box<dyn Reflect>) {
        if let Ok(key) = key.into_any().downcast::<K>() {
            self.insert(*key, true);
        }
    }
}

impl<K> Reflect for BTreeMap<K, bool>
where
    K: Reflect + Default + Ord,
{
    fn static_shape() -> Shape {
        Shape::SetMap {
            map: "BTreeMap",
            key: Box::new(K::static_shape()),
        }
    }

    fn shape(&self) -> Shape {
        Self::static_shape()
    }

    fn peek(&self) -> Peek<'_> {
        Peek::SetMap(self)
    }

    fn poke(&mut self) -> Poke<'_> {
        Poke::SetMap(self)
    }
}

impl<K> SetMap for BTreeMap<K, bool>
where
    K: Reflect + Default + Ord,
{
    fn members(&self) -> Vec<&dyn Reflect> {
        self.iter()
            .filter(|(_, member)| **member)
            .map(|(k, _)| k as &dyn Reflect)
            .collect()
    }

    fn clear(&mut self) {
        BTreeMap::clear(self);
    }

    fn new_key(&self) -> Box<dyn Reflect> {
        Box::new(K::default())
    }

    fn insert_member(&mut self, key: Box<dyn Reflect>) {
        if let Ok(key) = key.into_any().downcast::<K>() {
            self.insert(*key, true);
        }
    }
}

/// Implements [`Reflect`] for types with no built-in conversion.
///
/// Such fields report a type error unless a custom converter handles them.
///
/// ```ignore
/// #[derive(Debug, Default)]
/// struct Celsius(f64);
/// starbridge::opaque!(Celsius);
/// ```
#[macro_export]
macro_rules! opaque {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::Reflect for $ty {
                fn static_shape() -> $crate::Shape {
                    $crate::Shape::Opaque(stringify!($ty))
                }

                fn shape(&self) -> $crate::Shape {
                    <Self as $crate::Reflect>::static_shape()
                }

                fn peek(&self) -> $crate::Peek<'_> {
                    $crate::Peek::Opaque
                }

                fn poke(&mut self) -> $crate::Poke<'_> {
                    $crate::Poke::Opaque
                }
            }
        )*
    };
}

opaque!(Duration, SystemTime, char, ());
