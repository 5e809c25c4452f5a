use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::builder::PlanBuilder;
use crate::config::DatamodelConfig;
use crate::encoder::{self, JsonEncoder, TextEncoder};
use crate::error::{ConvertError, DatamodelError};
use crate::extension::{self, Extension};
use crate::field::FieldValue;
use crate::hooks::HookRegistry;
use crate::model::Datamodel;
use crate::options::RecordOptions;
use crate::plan::RecordPlan;
use crate::schema::{RecordRef, TypeSignature};
use crate::value::Value;

/// Conversion context: hooks, extensions, the plan cache and the text
/// encoder.
///
/// Uses interior mutability so registrations can happen through a shared
/// reference, including on the process-wide instance returned by
/// `global()`. Plans are built from a snapshot of the hooks and never see
/// later registrations.
pub struct Context {
    hooks: RwLock<HookRegistry>,
    extensions: RwLock<Vec<Extension>>,
    plans: RwLock<HashMap<TypeId, Arc<RecordPlan>>>,
    encoder: RwLock<Arc<dyn TextEncoder>>,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            hooks: RwLock::new(HookRegistry::with_defaults()),
            extensions: RwLock::new(Vec::new()),
            plans: RwLock::new(HashMap::new()),
            encoder: RwLock::new(Arc::new(JsonEncoder::default())),
        }
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("hooks", &*read(&self.hooks, "hook"))
            .field("extensions", &read(&self.extensions, "extension").len())
            .field("plans", &read(&self.plans, "plan cache").len())
            .finish()
    }
}

fn read<'a, T>(lock: &'a RwLock<T>, what: &str) -> RwLockReadGuard<'a, T> {
    match lock.read() {
        Ok(g) => g,
        Err(poisoned) => {
            tracing::warn!(registry = what, "read lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

fn write<'a, T>(lock: &'a RwLock<T>, what: &str) -> RwLockWriteGuard<'a, T> {
    match lock.write() {
        Ok(g) => g,
        Err(poisoned) => {
            tracing::warn!(registry = what, "write lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

impl Context {
    /// Fresh context with the default hooks, no extensions and the spaced
    /// JSON encoder.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &DatamodelConfig) -> Self {
        let context = Self::new();
        context.set_text_encoder(JsonEncoder::new(config.encoder.style));
        if config.extensions.frozen_by_default {
            context.enable_frozen_by_default();
        }
        context
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    pub fn register_structure_hook<F>(&self, signature: impl Into<TypeSignature>, hook: F)
    where
        F: Fn(&Value) -> Result<FieldValue, ConvertError> + Send + Sync + 'static,
    {
        write(&self.hooks, "hook").register_inbound(signature, Arc::new(hook));
    }

    pub fn register_unstructure_hook<F>(&self, signature: impl Into<TypeSignature>, hook: F)
    where
        F: Fn(&FieldValue) -> Result<Value, ConvertError> + Send + Sync + 'static,
    {
        write(&self.hooks, "hook").register_outbound(signature, Arc::new(hook));
    }

    pub fn register_hooks<I, O>(&self, signature: impl Into<TypeSignature>, inbound: I, outbound: O)
    where
        I: Fn(&Value) -> Result<FieldValue, ConvertError> + Send + Sync + 'static,
        O: Fn(&FieldValue) -> Result<Value, ConvertError> + Send + Sync + 'static,
    {
        write(&self.hooks, "hook").register(signature, Arc::new(inbound), Arc::new(outbound));
    }

    /// Snapshot of the current hook table.
    pub fn hooks(&self) -> HookRegistry {
        read(&self.hooks, "hook").clone()
    }

    pub fn register_extension<F>(&self, extension: F)
    where
        F: Fn(RecordOptions) -> RecordOptions + Send + Sync + 'static,
    {
        write(&self.extensions, "extension").push(Arc::new(extension));
    }

    /// Register `extension::frozen_by_default`.
    pub fn enable_frozen_by_default(&self) {
        self.register_extension(extension::frozen_by_default);
    }

    pub(crate) fn extensions(&self) -> Vec<Extension> {
        read(&self.extensions, "extension").clone()
    }

    pub fn set_text_encoder(&self, encoder: impl TextEncoder + 'static) {
        *write(&self.encoder, "encoder") = Arc::new(encoder);
    }

    pub fn text_encoder(&self) -> Arc<dyn TextEncoder> {
        Arc::clone(&read(&self.encoder, "encoder"))
    }

    // -----------------------------------------------------------------------
    // Plans
    // -----------------------------------------------------------------------

    /// Build and cache the plan of `T`, or return the cached one.
    ///
    /// Fails when a field type has no hook in some direction.
    pub fn declare<T: Datamodel>(&self) -> Result<Arc<RecordPlan>, DatamodelError> {
        self.plan_for(&T::record_ref())
    }

    /// Rebuild the plan of `T` with the current hooks and extensions,
    /// replacing any cached plan.
    pub fn redeclare<T: Datamodel>(&self) -> Result<Arc<RecordPlan>, DatamodelError> {
        let record = T::record_ref();
        let built = PlanBuilder::new(self).build(&record)?;
        self.publish(built.staged);
        write(&self.plans, "plan cache").insert(record.type_id(), Arc::clone(&built.root));
        Ok(built.root)
    }

    pub fn cached_plan(&self, type_id: TypeId) -> Option<Arc<RecordPlan>> {
        read(&self.plans, "plan cache").get(&type_id).cloned()
    }

    pub(crate) fn plan_for(&self, record: &RecordRef) -> Result<Arc<RecordPlan>, DatamodelError> {
        if let Some(plan) = self.cached_plan(record.type_id()) {
            return Ok(plan);
        }
        let built = PlanBuilder::new(self).build(record)?;
        let mut plans = write(&self.plans, "plan cache");
        for (type_id, plan) in built.staged {
            plans.entry(type_id).or_insert(plan);
        }
        // Another thread may have published first; its plan wins.
        Ok(Arc::clone(
            plans.entry(record.type_id()).or_insert(built.root),
        ))
    }

    /// Cache nested datamodel plans, keeping any already published.
    pub(crate) fn publish(&self, staged: Vec<(TypeId, Arc<RecordPlan>)>) {
        if staged.is_empty() {
            return;
        }
        let mut plans = write(&self.plans, "plan cache");
        for (type_id, plan) in staged {
            plans.entry(type_id).or_insert(plan);
        }
    }

    // -----------------------------------------------------------------------
    // Conversions
    // -----------------------------------------------------------------------

    pub fn to_tree<T: Datamodel>(&self, record: &T) -> Result<Value, DatamodelError> {
        let plan = self.declare::<T>()?;
        plan.unstructure_values(self, &record.to_fields())
            .map_err(|source| DatamodelError::Unstructure {
                record: plan.signature().to_string(),
                source,
            })
    }

    pub fn to_json<T: Datamodel>(&self, record: &T) -> Result<String, DatamodelError> {
        let tree = self.to_tree(record)?;
        self.text_encoder().encode(&tree)
    }

    pub fn from_tree<T: Datamodel>(&self, value: &Value) -> Result<T, DatamodelError> {
        let plan = self.declare::<T>()?;
        plan.structure_values(self, value)
            .and_then(T::from_fields)
            .map_err(|source| DatamodelError::Structure {
                record: plan.signature().to_string(),
                source,
            })
    }

    pub fn from_json<T: Datamodel>(&self, text: &str) -> Result<T, DatamodelError> {
        let tree = encoder::parse_text(text)?;
        self.from_tree(&tree)
    }

    /// Structure `value` as field `field` of `record` and store it.
    ///
    /// Fails on frozen records and on undeclared field names; on any error
    /// the record is left unchanged.
    pub fn assign<T: Datamodel>(&self, record: &mut T, field: &str, value: &Value) -> Result<(), DatamodelError> {
        let plan = self.declare::<T>()?;
        let record_name = || plan.signature().to_string();

        let field_plan = plan
            .field(field)
            .ok_or_else(|| DatamodelError::UnknownField {
                record: record_name(),
                field: field.to_string(),
            })?;
        if plan.options().frozen() {
            return Err(DatamodelError::Frozen {
                record: record_name(),
                field: field.to_string(),
            });
        }

        let structure_err = |source| DatamodelError::Structure {
            record: record_name(),
            source,
        };
        let field_value = field_plan
            .inbound
            .run(self, value)
            .map_err(|e| structure_err(e.at_field(field)))?;
        let mut values = record.to_fields();
        values.set(field_plan.name(), field_value);
        *record = T::from_fields(values).map_err(structure_err)?;
        Ok(())
    }
}

static GLOBAL: LazyLock<Context> = LazyLock::new(Context::new);

/// The process-wide context used by the `Datamodel` trait methods and the
/// free registration functions.
pub fn global() -> &'static Context {
    &GLOBAL
}
