use std::sync::Arc;

use crate::context::{Context, global};
use crate::error::{ConvertError, DatamodelError};
use crate::field::{Field, FieldValue};
use crate::plan::RecordPlan;
use crate::record::RecordValues;
use crate::schema::{RecordDeclaration, RecordRef};
use crate::value::Value;

/// A struct with named fields the engine can introspect.
///
/// Implemented by `#[derive(Record)]` and `#[derive(Datamodel)]`. A plain
/// `Record` can only be converted as part of an enclosing datamodel.
pub trait Record: Field + 'static {
    fn record_ref() -> RecordRef;

    /// Field list, declared options and generic arguments.
    fn declaration() -> RecordDeclaration;

    fn to_fields(&self) -> RecordValues;

    fn from_fields(values: RecordValues) -> Result<Self, ConvertError>;
}

/// A record with its own cached plan and generated conversion methods.
///
/// The plain methods use the process-wide context; the `*_in` variants
/// take an explicit one.
pub trait Datamodel: Record {
    fn to_tree(&self) -> Result<Value, DatamodelError> {
        self.to_tree_in(global())
    }

    fn to_json(&self) -> Result<String, DatamodelError> {
        self.to_json_in(global())
    }

    fn from_tree(value: &Value) -> Result<Self, DatamodelError> {
        Self::from_tree_in(global(), value)
    }

    fn from_json(text: &str) -> Result<Self, DatamodelError> {
        Self::from_json_in(global(), text)
    }

    fn assign(&mut self, field: &str, value: &Value) -> Result<(), DatamodelError> {
        self.assign_in(global(), field, value)
    }

    fn declare() -> Result<Arc<RecordPlan>, DatamodelError> {
        global().declare::<Self>()
    }

    fn to_tree_in(&self, ctx: &Context) -> Result<Value, DatamodelError> {
        ctx.to_tree(self)
    }

    fn to_json_in(&self, ctx: &Context) -> Result<String, DatamodelError> {
        ctx.to_json(self)
    }

    fn from_tree_in(ctx: &Context, value: &Value) -> Result<Self, DatamodelError> {
        ctx.from_tree(value)
    }

    fn from_json_in(ctx: &Context, text: &str) -> Result<Self, DatamodelError> {
        ctx.from_json(text)
    }

    fn assign_in(&mut self, ctx: &Context, field: &str, value: &Value) -> Result<(), DatamodelError> {
        ctx.assign(self, field, value)
    }
}

/// `Field::from_field_value` for records.
pub fn record_from_field_value<T: Record>(value: FieldValue) -> Result<T, ConvertError> {
    match value {
        FieldValue::Record(values) => T::from_fields(values),
        other => Err(crate::field::mismatch("record", &other)),
    }
}
