use std::fmt;

use crate::hooks::Direction;
use crate::schema::TypeSignature;
use crate::value::Value;

/// Category of a conversion failure. Lets callers tell apart the
/// identifiable conditions (missing field, arity mismatch, ...) without
/// parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Required field absent from the input and no default declared.
    MissingField,
    /// Primitive coercion failed (`"abc"` into `i64`, out-of-range integer, ...).
    Coercion,
    /// Malformed ISO-8601 date or RFC 3339 timestamp.
    Temporal,
    /// Fixed tuple received the wrong number of elements.
    Arity,
    /// No union arm accepted the value.
    Union,
    /// Value has the wrong shape for the declared type.
    Shape,
    /// Failure reported by a user hook.
    Hook,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::MissingField => f.write_str("missing field"),
            ErrorKind::Coercion => f.write_str("coercion"),
            ErrorKind::Temporal => f.write_str("temporal"),
            ErrorKind::Arity => f.write_str("arity"),
            ErrorKind::Union => f.write_str("union"),
            ErrorKind::Shape => f.write_str("shape"),
            ErrorKind::Hook => f.write_str("hook"),
        }
    }
}

/// One step of the path from the record root to the failing value.
#[derive(Debug, Clone, PartialEq)]
pub enum PathSegment {
    Field(String),
    Index(usize),
    Key(String),
}

/// Failure while converting a single value, in either direction.
///
/// Hooks return this type. The plan interpreter prepends path segments while
/// unwinding, so the final error names the offending field (`b[2].x`) and,
/// when known, the raw input value.
#[derive(Clone, PartialEq)]
pub struct ConvertError {
    kind: ErrorKind,
    message: String,
    path: Vec<PathSegment>,
    raw: Option<Value>,
}

impl ConvertError {
    pub fn new(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            message: msg.into(),
            path: Vec::new(),
            raw: None,
        }
    }

    pub fn missing_field(name: &str) -> Self {
        Self::new(ErrorKind::MissingField, "missing required field").at_field(name)
    }

    pub fn coercion(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Coercion, msg)
    }

    pub fn temporal(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Temporal, msg)
    }

    pub fn arity(expected: usize, found: usize) -> Self {
        Self::new(
            ErrorKind::Arity,
            format!("expected {expected} elements, found {found}"),
        )
    }

    pub fn union(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Union, msg)
    }

    pub fn shape(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Shape, msg)
    }

    /// Error raised from a user hook.
    pub fn hook(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Hook, msg)
    }

    /// Attach the offending raw value. The innermost value wins.
    pub fn with_raw(mut self, raw: &Value) -> Self {
        if self.raw.is_none() {
            self.raw = Some(raw.clone());
        }
        self
    }

    /// Add context to the message, preserving kind and path.
    ///
    /// Produces: `"context: original message"`.
    pub fn with_context(self, ctx: impl fmt::Display) -> Self {
        Self {
            message: format!("{ctx}: {}", self.message),
            ..self
        }
    }

    pub fn at_field(mut self, name: &str) -> Self {
        self.path.insert(0, PathSegment::Field(name.to_string()));
        self
    }

    pub fn at_index(mut self, index: usize) -> Self {
        self.path.insert(0, PathSegment::Index(index));
        self
    }

    pub fn at_key(mut self, key: &Value) -> Self {
        let key = key.key_text().unwrap_or_else(|| key.to_string());
        self.path.insert(0, PathSegment::Key(key));
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn raw(&self) -> Option<&Value> {
        self.raw.as_ref()
    }

    pub fn path_segments(&self) -> &[PathSegment] {
        &self.path
    }

    /// Rendered path, e.g. `items[2].tags["a"]`. Empty for the record root.
    pub fn path(&self) -> String {
        let mut out = String::new();
        for segment in &self.path {
            match segment {
                PathSegment::Field(name) => {
                    if !out.is_empty() {
                        out.push('.');
                    }
                    out.push_str(name);
                }
                PathSegment::Index(index) => out.push_str(&format!("[{index}]")),
                PathSegment::Key(key) => out.push_str(&format!("[{key:?}]")),
            }
        }
        out
    }
}

impl fmt::Debug for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {self}", self.kind)
    }
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.path.is_empty() {
            write!(f, "{}: ", self.path())?;
        }
        f.write_str(&self.message)?;
        if let Some(raw) = &self.raw {
            write!(f, " (got {raw})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ConvertError {}

/// Error returned by the public surface: declaration, conversion, text and
/// configuration.
#[derive(Debug, thiserror::Error)]
pub enum DatamodelError {
    #[error("unresolvable type `{signature}` in record `{record}`: no {direction} hook registered")]
    Unresolvable {
        record: String,
        signature: TypeSignature,
        direction: Direction,
    },

    #[error("cannot structure `{record}`: {source}")]
    Structure {
        record: String,
        source: ConvertError,
    },

    #[error("cannot unstructure `{record}`: {source}")]
    Unstructure {
        record: String,
        source: ConvertError,
    },

    #[error("record `{record}` is frozen, field `{field}` cannot be assigned")]
    Frozen { record: String, field: String },

    #[error("record `{record}` has no field `{field}`")]
    UnknownField { record: String, field: String },

    #[error("text error: {0}")]
    Text(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),
}

impl DatamodelError {
    /// Kind of the underlying conversion failure, if this is one.
    pub fn kind(&self) -> Option<ErrorKind> {
        self.convert_error().map(ConvertError::kind)
    }

    pub fn convert_error(&self) -> Option<&ConvertError> {
        match self {
            DatamodelError::Structure { source, .. } | DatamodelError::Unstructure { source, .. } => {
                Some(source)
            }
            _ => None,
        }
    }

    /// Add context to the error.
    ///
    /// For conversion variants, context is added to the inner `ConvertError`.
    /// For `Config`, context is prepended to the message.
    pub fn with_context(self, ctx: impl fmt::Display) -> Self {
        match self {
            DatamodelError::Structure { record, source } => DatamodelError::Structure {
                record,
                source: source.with_context(ctx),
            },
            DatamodelError::Unstructure { record, source } => DatamodelError::Unstructure {
                record,
                source: source.with_context(ctx),
            },
            DatamodelError::Config(msg) => DatamodelError::Config(format!("{ctx}: {msg}")),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_renders_fields_indices_and_keys() {
        let err = ConvertError::coercion("invalid digit")
            .at_field("x")
            .at_key(&Value::from("a"))
            .at_index(2)
            .at_field("items");
        assert_eq!(err.path(), r#"items[2]["a"].x"#);
        assert_eq!(err.to_string(), r#"items[2]["a"].x: invalid digit"#);
    }

    #[test]
    fn innermost_raw_value_is_kept() {
        let err = ConvertError::coercion("bad")
            .with_raw(&Value::from("inner"))
            .with_raw(&Value::from("outer"));
        assert_eq!(err.raw(), Some(&Value::from("inner")));
        assert_eq!(err.to_string(), r#"bad (got "inner")"#);
    }

    #[test]
    fn missing_field_carries_its_name() {
        let err = ConvertError::missing_field("x");
        assert_eq!(err.kind(), ErrorKind::MissingField);
        assert_eq!(err.path(), "x");
    }

    #[test]
    fn context_is_added_to_the_inner_error() {
        let err = DatamodelError::Structure {
            record: "Simple".into(),
            source: ConvertError::arity(2, 3).at_field("pair"),
        }
        .with_context("loading fixture");
        assert_eq!(err.kind(), Some(ErrorKind::Arity));
        assert_eq!(
            err.to_string(),
            "cannot structure `Simple`: pair: loading fixture: expected 2 elements, found 3"
        );
    }
}
