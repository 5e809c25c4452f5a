use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::hash::{BuildHasher, Hash};

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use indexmap::IndexMap;

use crate::error::ConvertError;
use crate::record::RecordValues;
use crate::schema::{SetKind, TemporalKind, TypeDescriptor};
use crate::types::{Bytes, FrozenSet};
use crate::value::Value;

/// Typed field value: the engine-side representation of a Rust field.
///
/// Inbound hooks produce it from a tree `Value`; outbound hooks consume it.
/// Its shape mirrors the field's `TypeDescriptor`: a `Vec<T>` field is a
/// `Seq`, a union is a `Variant` tagged with the arm index, a nested record
/// is a `Record`.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    /// Wide enough for every Rust integer up to `u64`/`i64`.
    Int(i128),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    DateTime(DateTime<FixedOffset>),
    Seq(Vec<FieldValue>),
    Map(Vec<(FieldValue, FieldValue)>),
    Tuple(Vec<FieldValue>),
    Set(Vec<FieldValue>),
    Record(RecordValues),
    Variant {
        index: usize,
        value: Box<FieldValue>,
    },
    Any(Value),
}

impl FieldValue {
    /// Short name of the variant, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Bool(_) => "bool",
            FieldValue::Int(_) => "int",
            FieldValue::Float(_) => "float",
            FieldValue::Str(_) => "string",
            FieldValue::Bytes(_) => "bytes",
            FieldValue::Date(_) => "date",
            FieldValue::DateTime(_) => "datetime",
            FieldValue::Seq(_) => "sequence",
            FieldValue::Map(_) => "map",
            FieldValue::Tuple(_) => "tuple",
            FieldValue::Set(_) => "set",
            FieldValue::Record(_) => "record",
            FieldValue::Variant { .. } => "variant",
            FieldValue::Any(_) => "any",
        }
    }

    /// Elements of any sequence-like variant.
    pub fn items(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::Seq(items) | FieldValue::Tuple(items) | FieldValue::Set(items) => {
                Some(items)
            }
            _ => None,
        }
    }
}

pub(crate) fn mismatch(expected: &str, found: &FieldValue) -> ConvertError {
    ConvertError::shape(format!("expected {expected}, found {}", found.kind_name()))
}

/// A Rust type that can appear as a record field.
///
/// `descriptor()` is the one-time introspection hook the plan builder walks;
/// the two value methods move between the Rust value and its `FieldValue`.
/// `from_field_value` is strict: coercion already happened in the plan.
pub trait Field: Sized {
    fn descriptor() -> TypeDescriptor;
    fn to_field_value(&self) -> FieldValue;
    fn from_field_value(value: FieldValue) -> Result<Self, ConvertError>;
}

// ---------------------------------------------------------------------------
// Primitives
// ---------------------------------------------------------------------------

macro_rules! impl_int_field {
    ($($ty:ty),*) => {$(
        impl Field for $ty {
            fn descriptor() -> TypeDescriptor {
                TypeDescriptor::Primitive(stringify!($ty))
            }

            fn to_field_value(&self) -> FieldValue {
                FieldValue::Int(*self as i128)
            }

            fn from_field_value(value: FieldValue) -> Result<Self, ConvertError> {
                match value {
                    FieldValue::Int(v) => <$ty>::try_from(v).map_err(|_| {
                        ConvertError::coercion(format!(
                            "{v} is out of range for {}",
                            stringify!($ty)
                        ))
                    }),
                    other => Err(mismatch("int", &other)),
                }
            }
        }
    )*};
}

impl_int_field!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl Field for f64 {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Primitive("f64")
    }

    fn to_field_value(&self) -> FieldValue {
        FieldValue::Float(*self)
    }

    fn from_field_value(value: FieldValue) -> Result<Self, ConvertError> {
        match value {
            FieldValue::Float(v) => Ok(v),
            other => Err(mismatch("float", &other)),
        }
    }
}

impl Field for f32 {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Primitive("f32")
    }

    fn to_field_value(&self) -> FieldValue {
        FieldValue::Float(f64::from(*self))
    }

    fn from_field_value(value: FieldValue) -> Result<Self, ConvertError> {
        match value {
            FieldValue::Float(v) if v.is_finite() && v.abs() > f64::from(f32::MAX) => {
                Err(ConvertError::coercion(format!("{v} is out of range for f32")))
            }
            FieldValue::Float(v) => Ok(v as f32),
            other => Err(mismatch("float", &other)),
        }
    }
}

impl Field for bool {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Primitive("bool")
    }

    fn to_field_value(&self) -> FieldValue {
        FieldValue::Bool(*self)
    }

    fn from_field_value(value: FieldValue) -> Result<Self, ConvertError> {
        match value {
            FieldValue::Bool(v) => Ok(v),
            other => Err(mismatch("bool", &other)),
        }
    }
}

impl Field for String {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Primitive("String")
    }

    fn to_field_value(&self) -> FieldValue {
        FieldValue::Str(self.clone())
    }

    fn from_field_value(value: FieldValue) -> Result<Self, ConvertError> {
        match value {
            FieldValue::Str(v) => Ok(v),
            other => Err(mismatch("string", &other)),
        }
    }
}

impl Field for Bytes {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Primitive("Bytes")
    }

    fn to_field_value(&self) -> FieldValue {
        FieldValue::Bytes(self.0.clone())
    }

    fn from_field_value(value: FieldValue) -> Result<Self, ConvertError> {
        match value {
            FieldValue::Bytes(v) => Ok(Bytes(v)),
            other => Err(mismatch("bytes", &other)),
        }
    }
}

/// A `Value` field is `Any`: passed through untouched in both directions.
impl Field for Value {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Any
    }

    fn to_field_value(&self) -> FieldValue {
        FieldValue::Any(self.clone())
    }

    fn from_field_value(value: FieldValue) -> Result<Self, ConvertError> {
        match value {
            FieldValue::Any(v) => Ok(v),
            other => Err(mismatch("any", &other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Temporal
// ---------------------------------------------------------------------------

impl Field for NaiveDate {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Temporal(TemporalKind::Date)
    }

    fn to_field_value(&self) -> FieldValue {
        FieldValue::Date(*self)
    }

    fn from_field_value(value: FieldValue) -> Result<Self, ConvertError> {
        match value {
            FieldValue::Date(v) => Ok(v),
            other => Err(mismatch("date", &other)),
        }
    }
}

impl Field for DateTime<FixedOffset> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Temporal(TemporalKind::DateTime)
    }

    fn to_field_value(&self) -> FieldValue {
        FieldValue::DateTime(*self)
    }

    fn from_field_value(value: FieldValue) -> Result<Self, ConvertError> {
        match value {
            FieldValue::DateTime(v) => Ok(v),
            other => Err(mismatch("datetime", &other)),
        }
    }
}

impl Field for DateTime<Utc> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Temporal(TemporalKind::DateTimeUtc)
    }

    fn to_field_value(&self) -> FieldValue {
        FieldValue::DateTime(self.fixed_offset())
    }

    fn from_field_value(value: FieldValue) -> Result<Self, ConvertError> {
        match value {
            FieldValue::DateTime(v) => Ok(v.with_timezone(&Utc)),
            other => Err(mismatch("datetime", &other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Wrappers
// ---------------------------------------------------------------------------

impl<T: Field> Field for Option<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Optional(Box::new(T::descriptor()))
    }

    fn to_field_value(&self) -> FieldValue {
        match self {
            Some(v) => v.to_field_value(),
            None => FieldValue::Null,
        }
    }

    fn from_field_value(value: FieldValue) -> Result<Self, ConvertError> {
        match value {
            FieldValue::Null => Ok(None),
            other => T::from_field_value(other).map(Some),
        }
    }
}

/// Transparent; lets records refer to themselves.
impl<T: Field> Field for Box<T> {
    fn descriptor() -> TypeDescriptor {
        T::descriptor()
    }

    fn to_field_value(&self) -> FieldValue {
        self.as_ref().to_field_value()
    }

    fn from_field_value(value: FieldValue) -> Result<Self, ConvertError> {
        T::from_field_value(value).map(Box::new)
    }
}

// ---------------------------------------------------------------------------
// Containers
// ---------------------------------------------------------------------------

fn collect_items<T, C>(value: FieldValue, expected: &str) -> Result<C, ConvertError>
where
    T: Field,
    C: FromIterator<T>,
{
    match value {
        FieldValue::Seq(items) | FieldValue::Set(items) | FieldValue::Tuple(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| T::from_field_value(item).map_err(|e| e.at_index(i)))
            .collect(),
        other => Err(mismatch(expected, &other)),
    }
}

fn collect_entries<K, V, C>(value: FieldValue) -> Result<C, ConvertError>
where
    K: Field,
    V: Field,
    C: FromIterator<(K, V)>,
{
    match value {
        FieldValue::Map(entries) => entries
            .into_iter()
            .enumerate()
            .map(|(i, (k, v))| {
                let key = K::from_field_value(k).map_err(|e| e.at_index(i))?;
                let value = V::from_field_value(v).map_err(|e| e.at_index(i))?;
                Ok((key, value))
            })
            .collect(),
        other => Err(mismatch("map", &other)),
    }
}

macro_rules! impl_sequence_field {
    ($container:ident, $name:literal) => {
        impl<T: Field> Field for $container<T> {
            fn descriptor() -> TypeDescriptor {
                TypeDescriptor::Sequence {
                    container: $name,
                    inner: Box::new(T::descriptor()),
                }
            }

            fn to_field_value(&self) -> FieldValue {
                FieldValue::Seq(self.iter().map(Field::to_field_value).collect())
            }

            fn from_field_value(value: FieldValue) -> Result<Self, ConvertError> {
                collect_items(value, "sequence")
            }
        }
    };
}

impl_sequence_field!(Vec, "Vec");
impl_sequence_field!(VecDeque, "VecDeque");

impl<K, V, S> Field for HashMap<K, V, S>
where
    K: Field + Eq + Hash,
    V: Field,
    S: BuildHasher + Default,
{
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Mapping {
            container: "HashMap",
            key: Box::new(K::descriptor()),
            value: Box::new(V::descriptor()),
        }
    }

    fn to_field_value(&self) -> FieldValue {
        FieldValue::Map(
            self.iter()
                .map(|(k, v)| (k.to_field_value(), v.to_field_value()))
                .collect(),
        )
    }

    fn from_field_value(value: FieldValue) -> Result<Self, ConvertError> {
        collect_entries(value)
    }
}

impl<K, V> Field for BTreeMap<K, V>
where
    K: Field + Ord,
    V: Field,
{
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Mapping {
            container: "BTreeMap",
            key: Box::new(K::descriptor()),
            value: Box::new(V::descriptor()),
        }
    }

    fn to_field_value(&self) -> FieldValue {
        FieldValue::Map(
            self.iter()
                .map(|(k, v)| (k.to_field_value(), v.to_field_value()))
                .collect(),
        )
    }

    fn from_field_value(value: FieldValue) -> Result<Self, ConvertError> {
        collect_entries(value)
    }
}

/// Insertion-ordered; unstructures in insertion order.
impl<K, V, S> Field for IndexMap<K, V, S>
where
    K: Field + Eq + Hash,
    V: Field,
    S: BuildHasher + Default,
{
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Mapping {
            container: "IndexMap",
            key: Box::new(K::descriptor()),
            value: Box::new(V::descriptor()),
        }
    }

    fn to_field_value(&self) -> FieldValue {
        FieldValue::Map(
            self.iter()
                .map(|(k, v)| (k.to_field_value(), v.to_field_value()))
                .collect(),
        )
    }

    fn from_field_value(value: FieldValue) -> Result<Self, ConvertError> {
        collect_entries(value)
    }
}

impl<T, S> Field for HashSet<T, S>
where
    T: Field + Eq + Hash,
    S: BuildHasher + Default,
{
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::SetLike {
            container: "HashSet",
            kind: SetKind::Set,
            inner: Box::new(T::descriptor()),
        }
    }

    fn to_field_value(&self) -> FieldValue {
        FieldValue::Set(self.iter().map(Field::to_field_value).collect())
    }

    fn from_field_value(value: FieldValue) -> Result<Self, ConvertError> {
        collect_items(value, "set")
    }
}

impl<T: Field + Ord> Field for BTreeSet<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::SetLike {
            container: "BTreeSet",
            kind: SetKind::Set,
            inner: Box::new(T::descriptor()),
        }
    }

    fn to_field_value(&self) -> FieldValue {
        FieldValue::Set(self.iter().map(Field::to_field_value).collect())
    }

    fn from_field_value(value: FieldValue) -> Result<Self, ConvertError> {
        collect_items(value, "set")
    }
}

impl<T: Field + Ord> Field for FrozenSet<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::SetLike {
            container: "FrozenSet",
            kind: SetKind::FrozenSet,
            inner: Box::new(T::descriptor()),
        }
    }

    fn to_field_value(&self) -> FieldValue {
        FieldValue::Set(self.iter().map(Field::to_field_value).collect())
    }

    fn from_field_value(value: FieldValue) -> Result<Self, ConvertError> {
        collect_items(value, "set")
    }
}

// ---------------------------------------------------------------------------
// Fixed-arity tuples
// ---------------------------------------------------------------------------

macro_rules! impl_tuple_field {
    ($len:literal => $($name:ident $idx:tt),+) => {
        impl<$($name: Field),+> Field for ($($name,)+) {
            fn descriptor() -> TypeDescriptor {
                TypeDescriptor::FixedTuple(vec![$($name::descriptor()),+])
            }

            fn to_field_value(&self) -> FieldValue {
                FieldValue::Tuple(vec![$(self.$idx.to_field_value()),+])
            }

            fn from_field_value(value: FieldValue) -> Result<Self, ConvertError> {
                let items = match value {
                    FieldValue::Tuple(items) | FieldValue::Seq(items) => items,
                    other => return Err(mismatch("tuple", &other)),
                };
                if items.len() != $len {
                    return Err(ConvertError::arity($len, items.len()));
                }
                let mut items = items.into_iter();
                Ok(($(
                    {
                        let item = items.next().ok_or_else(|| ConvertError::arity($len, $idx))?;
                        $name::from_field_value(item).map_err(|e| e.at_index($idx))?
                    },
                )+))
            }
        }
    };
}

impl_tuple_field!(1 => A 0);
impl_tuple_field!(2 => A 0, B 1);
impl_tuple_field!(3 => A 0, B 1, C 2);
impl_tuple_field!(4 => A 0, B 1, C 2, D 3);
impl_tuple_field!(5 => A 0, B 1, C 2, D 3, E 4);
impl_tuple_field!(6 => A 0, B 1, C 2, D 3, E 4, F 5);
impl_tuple_field!(7 => A 0, B 1, C 2, D 3, E 4, F 5, G 6);
impl_tuple_field!(8 => A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn f32_rejects_finite_values_beyond_its_range() {
        assert_eq!(f32::from_field_value(FieldValue::Float(1.5)).unwrap(), 1.5);
        let err = f32::from_field_value(FieldValue::Float(1e300)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Coercion);
        assert!(f32::from_field_value(FieldValue::Float(f64::INFINITY)).unwrap().is_infinite());
    }

    #[test]
    fn integers_are_range_checked_on_materialization() {
        assert_eq!(u8::from_field_value(FieldValue::Int(255)).unwrap(), 255);
        let err = u8::from_field_value(FieldValue::Int(256)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Coercion);
        assert_eq!(
            u64::from_field_value(u64::MAX.to_field_value()).unwrap(),
            u64::MAX
        );
    }

    #[test]
    fn option_maps_null_to_none() {
        assert_eq!(Option::<i64>::from_field_value(FieldValue::Null).unwrap(), None);
        assert_eq!(Some(3i64).to_field_value(), FieldValue::Int(3));
    }

    #[test]
    fn sets_collapse_duplicates() {
        let value = FieldValue::Seq(vec![FieldValue::Int(1), FieldValue::Int(1), FieldValue::Int(2)]);
        let set = HashSet::<i64>::from_field_value(value).unwrap();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn tuple_checks_arity() {
        let value = FieldValue::Seq(vec![FieldValue::Int(1)]);
        let err = <(i64, String)>::from_field_value(value).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Arity);
    }

    #[test]
    fn shape_mismatch_names_both_sides() {
        let err = Vec::<i64>::from_field_value(FieldValue::Str("x".into())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Shape);
        assert_eq!(err.message(), "expected sequence, found string");
    }

    #[test]
    fn element_errors_carry_their_index() {
        let value = FieldValue::Seq(vec![FieldValue::Int(1), FieldValue::Str("x".into())]);
        let err = Vec::<i64>::from_field_value(value).unwrap_err();
        assert_eq!(err.path(), "[1]");
    }
}
