//! Immutable conversion plans and their interpreter.
//!
//! A `RecordPlan` is built once per record type (see `builder`) and then
//! run for every conversion. Each field carries one node tree per
//! direction; nodes either call a hook or recurse structurally.

use std::sync::{Arc, OnceLock, Weak};

use crate::builder::PlanBuilder;
use crate::context::Context;
use crate::error::{ConvertError, DatamodelError};
use crate::extension::Extension;
use crate::field::{FieldValue, mismatch};
use crate::hooks::{HookRegistry, InboundHook, OutboundHook};
use crate::options::RecordOptions;
use crate::record::RecordValues;
use crate::schema::{RecordKind, RecordRef, TypeSignature};
use crate::value::Value;

pub struct RecordPlan {
    pub(crate) signature: TypeSignature,
    pub(crate) kind: RecordKind,
    pub(crate) options: RecordOptions,
    pub(crate) fields: Vec<FieldPlan>,
}

pub struct FieldPlan {
    pub(crate) name: &'static str,
    pub(crate) signature: TypeSignature,
    pub(crate) inbound: InboundNode,
    pub(crate) outbound: OutboundNode,
    pub(crate) default: Option<fn() -> FieldValue>,
    pub(crate) init: bool,
}

pub enum InboundNode {
    Hook {
        signature: TypeSignature,
        hook: InboundHook,
    },
    Optional(Box<InboundNode>),
    Union {
        signature: TypeSignature,
        arms: Vec<InboundNode>,
    },
    Sequence(Box<InboundNode>),
    Mapping {
        key: Box<InboundNode>,
        value: Box<InboundNode>,
    },
    Tuple(Vec<InboundNode>),
    Set(Box<InboundNode>),
    Record(RecordLink),
}

pub enum OutboundNode {
    Hook {
        signature: TypeSignature,
        hook: OutboundHook,
    },
    Optional(Box<OutboundNode>),
    Union {
        signature: TypeSignature,
        arms: Vec<OutboundNode>,
    },
    Sequence(Box<OutboundNode>),
    Mapping {
        key: Box<OutboundNode>,
        value: Box<OutboundNode>,
    },
    Tuple(Vec<OutboundNode>),
    Set(Box<OutboundNode>),
    Record(RecordLink),
}

/// How a field reaches the plan of a nested record.
#[derive(Clone)]
pub enum RecordLink {
    /// Plan known at build time.
    Shared(Arc<RecordPlan>),
    /// Datamodel record that was still being built when linked.
    /// Looked up in the context's plan cache when run.
    Deferred(RecordRef),
    /// Plain record reached through a cycle. Its plan is derived on first
    /// use and kept.
    Lazy(Arc<LazyPlan>),
    /// Back edge from a lazily derived plan to the link that owns it.
    Cycle(Weak<LazyPlan>),
}

impl RecordLink {
    fn resolve(&self, ctx: &Context) -> Result<Arc<RecordPlan>, ConvertError> {
        let resolved = match self {
            RecordLink::Shared(plan) => return Ok(Arc::clone(plan)),
            RecordLink::Deferred(record) => ctx.plan_for(record),
            RecordLink::Lazy(link) => link.resolve(ctx),
            RecordLink::Cycle(link) => match link.upgrade() {
                Some(link) => link.resolve(ctx),
                None => return Err(ConvertError::shape("recursive record plan was dropped")),
            },
        };
        resolved.map_err(|e| ConvertError::shape(format!("cannot resolve nested record plan: {e}")))
    }
}

/// Plan of a plain record that recurses into itself.
///
/// Holds the hooks and extensions of the build that created it, so the
/// plan it derives matches the rest of the enclosing plan no matter what
/// was registered since.
pub struct LazyPlan {
    pub(crate) record: RecordRef,
    pub(crate) hooks: Arc<HookRegistry>,
    pub(crate) extensions: Arc<[Extension]>,
    plan: OnceLock<Arc<RecordPlan>>,
}

impl LazyPlan {
    pub(crate) fn new(record: RecordRef, hooks: Arc<HookRegistry>, extensions: Arc<[Extension]>) -> Self {
        Self {
            record,
            hooks,
            extensions,
            plan: OnceLock::new(),
        }
    }

    fn resolve(self: &Arc<Self>, ctx: &Context) -> Result<Arc<RecordPlan>, DatamodelError> {
        if let Some(plan) = self.plan.get() {
            return Ok(Arc::clone(plan));
        }
        let built = PlanBuilder::resuming(ctx, self).build(&self.record)?;
        ctx.publish(built.staged);
        // Racing threads build equal plans; the first one stored is kept.
        Ok(Arc::clone(self.plan.get_or_init(|| built.root)))
    }
}

// ---------------------------------------------------------------------------
// RecordPlan
// ---------------------------------------------------------------------------

impl RecordPlan {
    pub fn signature(&self) -> &TypeSignature {
        &self.signature
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Finalized declaration options.
    pub fn options(&self) -> &RecordOptions {
        &self.options
    }

    pub fn fields(&self) -> &[FieldPlan] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldPlan> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Tree → field values. Missing keys fall back to defaults; unknown
    /// keys are ignored.
    pub fn structure_values(&self, ctx: &Context, value: &Value) -> Result<RecordValues, ConvertError> {
        let Value::Map(entries) = value else {
            return Err(ConvertError::shape(format!(
                "expected map for record `{}`, found {}",
                self.signature,
                value.kind_name()
            ))
            .with_raw(value));
        };

        let mut values = RecordValues::with_capacity(self.fields.len());
        for field in &self.fields {
            let field_value = match value.get(field.name) {
                Some(raw) if field.init => field
                    .inbound
                    .run(ctx, raw)
                    .map_err(|e| e.at_field(field.name))?,
                _ => field.default_value()?,
            };
            values.push(field.name, field_value);
        }

        let unknown = entries
            .iter()
            .filter(|(k, _)| k.as_str().is_none_or(|k| self.field(k).is_none()))
            .count();
        if unknown > 0 {
            tracing::trace!(record = %self.signature, unknown, "ignored unknown input keys");
        }
        Ok(values)
    }

    /// Field values → tree map, in declaration order.
    pub fn unstructure_values(&self, ctx: &Context, values: &RecordValues) -> Result<Value, ConvertError> {
        let mut entries = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            let field_value = values
                .get(field.name)
                .ok_or_else(|| ConvertError::missing_field(field.name))?;
            let out = field
                .outbound
                .run(ctx, field_value)
                .map_err(|e| e.at_field(field.name))?;
            entries.push((Value::Str(field.name.to_string()), out));
        }
        Ok(Value::Map(entries))
    }
}

impl std::fmt::Debug for RecordPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordPlan")
            .field("signature", &self.signature)
            .field("kind", &self.kind)
            .field("options", &self.options)
            .field("fields", &self.fields)
            .finish()
    }
}

impl FieldPlan {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn signature(&self) -> &TypeSignature {
        &self.signature
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    pub fn init(&self) -> bool {
        self.init
    }

    fn default_value(&self) -> Result<FieldValue, ConvertError> {
        self.default
            .map(|factory| factory())
            .ok_or_else(|| ConvertError::missing_field(self.name))
    }
}

impl std::fmt::Debug for FieldPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldPlan")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .field("has_default", &self.default.is_some())
            .field("init", &self.init)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Interpreter
// ---------------------------------------------------------------------------

fn expect_seq<'v>(value: &'v Value, expected: &str) -> Result<&'v [Value], ConvertError> {
    value.as_seq().ok_or_else(|| {
        ConvertError::shape(format!("expected {expected}, found {}", value.kind_name())).with_raw(value)
    })
}

impl InboundNode {
    pub fn run(&self, ctx: &Context, value: &Value) -> Result<FieldValue, ConvertError> {
        match self {
            InboundNode::Hook { hook, .. } => hook(value),
            InboundNode::Optional(inner) => match value {
                Value::Null => Ok(FieldValue::Null),
                other => inner.run(ctx, other),
            },
            InboundNode::Union { signature, arms } => {
                for (index, arm) in arms.iter().enumerate() {
                    if let Ok(v) = arm.run(ctx, value) {
                        return Ok(FieldValue::Variant {
                            index,
                            value: Box::new(v),
                        });
                    }
                }
                Err(ConvertError::union(format!("unstructurable union `{signature}`")).with_raw(value))
            }
            InboundNode::Sequence(inner) => {
                let items = expect_seq(value, "sequence")?;
                Self::run_items(ctx, inner, items).map(FieldValue::Seq)
            }
            InboundNode::Set(inner) => {
                let items = expect_seq(value, "sequence for a set")?;
                Self::run_items(ctx, inner, items).map(FieldValue::Set)
            }
            InboundNode::Tuple(items) => {
                let elems = expect_seq(value, "sequence for a tuple")?;
                if elems.len() != items.len() {
                    return Err(ConvertError::arity(items.len(), elems.len()).with_raw(value));
                }
                items
                    .iter()
                    .zip(elems)
                    .enumerate()
                    .map(|(i, (node, elem))| node.run(ctx, elem).map_err(|e| e.at_index(i)))
                    .collect::<Result<Vec<_>, _>>()
                    .map(FieldValue::Tuple)
            }
            InboundNode::Mapping { key, value: val } => match value {
                Value::Map(entries) => entries
                    .iter()
                    .map(|(k, v)| {
                        let out_key = key.run(ctx, k).map_err(|e| e.at_key(k))?;
                        let out_val = val.run(ctx, v).map_err(|e| e.at_key(k))?;
                        Ok((out_key, out_val))
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(FieldValue::Map),
                Value::Seq(pairs) => pairs
                    .iter()
                    .enumerate()
                    .map(|(i, pair)| match pair.as_seq() {
                        Some([k, v]) => {
                            let out_key = key.run(ctx, k).map_err(|e| e.at_index(i))?;
                            let out_val = val.run(ctx, v).map_err(|e| e.at_key(k).at_index(i))?;
                            Ok((out_key, out_val))
                        }
                        _ => Err(ConvertError::shape("expected a [key, value] pair")
                            .with_raw(pair)
                            .at_index(i)),
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(FieldValue::Map),
                other => Err(ConvertError::shape(format!("expected map, found {}", other.kind_name()))
                    .with_raw(other)),
            },
            InboundNode::Record(link) => {
                let plan = link.resolve(ctx)?;
                plan.structure_values(ctx, value).map(FieldValue::Record)
            }
        }
    }

    fn run_items(ctx: &Context, inner: &InboundNode, items: &[Value]) -> Result<Vec<FieldValue>, ConvertError> {
        items
            .iter()
            .enumerate()
            .map(|(i, item)| inner.run(ctx, item).map_err(|e| e.at_index(i)))
            .collect()
    }
}

impl OutboundNode {
    pub fn run(&self, ctx: &Context, value: &FieldValue) -> Result<Value, ConvertError> {
        match self {
            OutboundNode::Hook { hook, .. } => hook(value),
            OutboundNode::Optional(inner) => match value {
                FieldValue::Null => Ok(Value::Null),
                other => inner.run(ctx, other),
            },
            OutboundNode::Union { signature, arms } => match value {
                FieldValue::Variant { index, value } => match arms.get(*index) {
                    Some(arm) => arm.run(ctx, value),
                    None => Err(ConvertError::union(format!("`{signature}` has no arm {index}"))),
                },
                // Untagged values come from user hooks: first arm that accepts wins.
                untagged => arms
                    .iter()
                    .find_map(|arm| arm.run(ctx, untagged).ok())
                    .ok_or_else(|| {
                        ConvertError::union(format!("no arm of `{signature}` accepts a {}", untagged.kind_name()))
                    }),
            },
            OutboundNode::Sequence(inner) | OutboundNode::Set(inner) => {
                let items = value.items().ok_or_else(|| mismatch("sequence", value))?;
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| inner.run(ctx, item).map_err(|e| e.at_index(i)))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Seq)
            }
            OutboundNode::Tuple(nodes) => {
                let items = value.items().ok_or_else(|| mismatch("tuple", value))?;
                if items.len() != nodes.len() {
                    return Err(ConvertError::arity(nodes.len(), items.len()));
                }
                nodes
                    .iter()
                    .zip(items)
                    .enumerate()
                    .map(|(i, (node, item))| node.run(ctx, item).map_err(|e| e.at_index(i)))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Seq)
            }
            OutboundNode::Mapping { key, value: val } => match value {
                FieldValue::Map(entries) => entries
                    .iter()
                    .map(|(k, v)| {
                        let out_key = key.run(ctx, k)?;
                        let out_val = val.run(ctx, v).map_err(|e| e.at_key(&out_key))?;
                        Ok((out_key, out_val))
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Map),
                other => Err(mismatch("map", other)),
            },
            OutboundNode::Record(link) => match value {
                FieldValue::Record(values) => link.resolve(ctx)?.unstructure_values(ctx, values),
                other => Err(mismatch("record", other)),
            },
        }
    }
}
