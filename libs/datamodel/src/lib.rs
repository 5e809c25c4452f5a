//! Type-driven conversion between Rust records and generic trees.
//!
//! `#[derive(Datamodel)]` on a struct with named fields gives it
//! `to_tree` / `from_tree` / `to_json` / `from_json`. On first use the
//! engine walks the field types once, builds a conversion plan from the
//! registered hooks and caches it; every later conversion runs that plan.
//!
//! ```ignore
//! use datamodel::{Datamodel, Value};
//!
//! #[derive(Datamodel, Debug, PartialEq)]
//! struct Simple {
//!     x: i64,
//!     y: Vec<String>,
//! }
//!
//! let s = Simple { x: 1, y: vec!["a".into(), "b".into()] };
//! assert_eq!(s.to_json()?, r#"{"x": 1, "y": ["a", "b"]}"#);
//! ```

extern crate self as datamodel;

mod builder;
pub mod config;
pub mod context;
mod defaults;
pub mod encoder;
pub mod error;
pub mod extension;
pub mod field;
pub mod hooks;
pub mod model;
pub mod options;
pub mod plan;
pub mod record;
pub mod schema;
pub mod temporal;
pub mod types;
pub mod value;

pub use datamodel_derive::{Custom, Datamodel, Record, Union};

pub use config::DatamodelConfig;
pub use context::{Context, global};
pub use encoder::{EncoderStyle, JsonEncoder, TextEncoder};
pub use error::{ConvertError, DatamodelError, ErrorKind};
pub use field::{Field, FieldValue};
pub use model::{Datamodel, Record};
pub use options::{OptionValue, RecordOptions};
pub use schema::{TypeDescriptor, TypeSignature};
pub use types::{Bytes, FrozenSet};
pub use value::Value;

/// Register a structure hook on the global context.
pub fn structure_hook<F>(signature: impl Into<TypeSignature>, hook: F)
where
    F: Fn(&Value) -> Result<FieldValue, ConvertError> + Send + Sync + 'static,
{
    global().register_structure_hook(signature, hook);
}

/// Register an unstructure hook on the global context.
pub fn unstructure_hook<F>(signature: impl Into<TypeSignature>, hook: F)
where
    F: Fn(&FieldValue) -> Result<Value, ConvertError> + Send + Sync + 'static,
{
    global().register_unstructure_hook(signature, hook);
}

/// Register a record-options extension on the global context.
pub fn record_options_extension<F>(extension: F)
where
    F: Fn(RecordOptions) -> RecordOptions + Send + Sync + 'static,
{
    global().register_extension(extension);
}

/// Replace the text encoder of the global context.
pub fn set_text_encoder(encoder: impl TextEncoder + 'static) {
    global().set_text_encoder(encoder);
}
