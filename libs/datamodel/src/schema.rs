use std::any::TypeId;
use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use crate::field::{Field, FieldValue};
use crate::options::RecordOptions;

/// Canonical key for a declared type, rendered in Rust type syntax:
/// `i64`, `Vec<String>`, `HashMap<String, Vec<Simple>>`, `Option<i64>`,
/// `Union<i64, String>`, `(i64, String)`, `Page<i64>`.
///
/// Derived deterministically from a `TypeDescriptor`, so structurally
/// identical types always share a signature. Used as the hook-registry key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeSignature(Arc<str>);

impl TypeSignature {
    pub fn new(signature: impl AsRef<str>) -> Self {
        Self(Arc::from(signature.as_ref()))
    }

    /// Signature of a Rust type.
    pub fn of<T: Field>() -> Self {
        T::descriptor().signature()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for TypeSignature {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TypeSignature {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TypeSignature {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetKind {
    Set,
    FrozenSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalKind {
    /// `chrono::NaiveDate`.
    Date,
    /// `chrono::DateTime<FixedOffset>`.
    DateTime,
    /// `chrono::DateTime<Utc>`.
    DateTimeUtc,
}

impl TemporalKind {
    pub fn signature(self) -> &'static str {
        match self {
            TemporalKind::Date => "NaiveDate",
            TemporalKind::DateTime => "DateTime<FixedOffset>",
            TemporalKind::DateTimeUtc => "DateTime<Utc>",
        }
    }
}

/// Whether a nested record has its own cached plan and generated methods
/// (`#[derive(Datamodel)]`) or is a plain record (`#[derive(Record)]`)
/// whose plan is owned by the enclosing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Datamodel,
    Plain,
}

/// Identity and introspection entry point of a record type.
#[derive(Clone)]
pub struct RecordRef {
    type_id: TypeId,
    name: &'static str,
    kind: RecordKind,
    type_args: Vec<TypeDescriptor>,
    declaration: fn() -> RecordDeclaration,
}

impl RecordRef {
    pub fn new<T: 'static>(
        name: &'static str,
        kind: RecordKind,
        type_args: Vec<TypeDescriptor>,
        declaration: fn() -> RecordDeclaration,
    ) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name,
            kind,
            type_args,
            declaration,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn type_args(&self) -> &[TypeDescriptor] {
        &self.type_args
    }

    pub fn declaration(&self) -> RecordDeclaration {
        (self.declaration)()
    }
}

impl PartialEq for RecordRef {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl fmt::Debug for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordRef")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("type_args", &self.type_args)
            .finish()
    }
}

/// Parsed shape of a declared field type.
///
/// Produced by `Field::descriptor()` and walked once per plan build.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDescriptor {
    /// Scalar with a coercive default hook (`i64`, `String`, `bool`, `Bytes`, ...).
    Primitive(&'static str),
    /// Pass-through `Value`.
    Any,
    /// `Option<T>`: a union of `T` and null.
    Optional(Box<TypeDescriptor>),
    /// Ordered arms, tried first to last.
    Union(Vec<TypeDescriptor>),
    Sequence {
        container: &'static str,
        inner: Box<TypeDescriptor>,
    },
    Mapping {
        container: &'static str,
        key: Box<TypeDescriptor>,
        value: Box<TypeDescriptor>,
    },
    FixedTuple(Vec<TypeDescriptor>),
    SetLike {
        container: &'static str,
        kind: SetKind,
        inner: Box<TypeDescriptor>,
    },
    NestedRecord(RecordRef),
    Temporal(TemporalKind),
    /// Opaque type converted only through registered hooks.
    Custom(&'static str),
}

impl TypeDescriptor {
    pub fn signature(&self) -> TypeSignature {
        TypeSignature::from(self.to_string())
    }

    fn write_list(f: &mut fmt::Formatter<'_>, items: &[TypeDescriptor]) -> fmt::Result {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{item}")?;
        }
        Ok(())
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Primitive(name) | TypeDescriptor::Custom(name) => f.write_str(name),
            TypeDescriptor::Any => f.write_str("Any"),
            TypeDescriptor::Optional(inner) => write!(f, "Option<{inner}>"),
            TypeDescriptor::Union(arms) => {
                f.write_str("Union<")?;
                Self::write_list(f, arms)?;
                f.write_str(">")
            }
            TypeDescriptor::Sequence { container, inner }
            | TypeDescriptor::SetLike {
                container, inner, ..
            } => write!(f, "{container}<{inner}>"),
            TypeDescriptor::Mapping {
                container,
                key,
                value,
            } => write!(f, "{container}<{key}, {value}>"),
            TypeDescriptor::FixedTuple(items) => {
                f.write_str("(")?;
                Self::write_list(f, items)?;
                if items.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
            TypeDescriptor::NestedRecord(record) => {
                f.write_str(record.name)?;
                if !record.type_args.is_empty() {
                    f.write_str("<")?;
                    Self::write_list(f, &record.type_args)?;
                    f.write_str(">")?;
                }
                Ok(())
            }
            TypeDescriptor::Temporal(kind) => f.write_str(kind.signature()),
        }
    }
}

/// A single declared field.
#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: &'static str,
    pub descriptor: TypeDescriptor,
    /// Default factory; `None` makes the field required.
    pub default: Option<fn() -> FieldValue>,
    /// `false` → never read from input, always defaulted.
    pub init: bool,
}

/// What the derive macros tell the engine about a record type.
#[derive(Debug, Clone)]
pub struct RecordDeclaration {
    pub name: &'static str,
    pub type_args: Vec<TypeDescriptor>,
    /// Options given explicitly on the declaration (`#[datamodel(frozen = false)]`).
    pub options: RecordOptions,
    /// Declaration order is conversion order.
    pub fields: Vec<FieldDecl>,
}

impl RecordDeclaration {
    pub fn signature(&self) -> TypeSignature {
        let mut out = self.name.to_string();
        if !self.type_args.is_empty() {
            let args: Vec<String> = self.type_args.iter().map(ToString::to_string).collect();
            out.push('<');
            out.push_str(&args.join(", "));
            out.push('>');
        }
        TypeSignature::from(out)
    }

    pub fn field(&self, name: &str) -> Option<&FieldDecl> {
        self.fields.iter().find(|f| f.name == name)
    }
}
