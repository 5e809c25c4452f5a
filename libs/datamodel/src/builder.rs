use std::any::TypeId;
use std::sync::{Arc, Weak};

use crate::context::Context;
use crate::error::DatamodelError;
use crate::extension::{self, Extension};
use crate::hooks::{Direction, HookRegistry};
use crate::plan::{FieldPlan, InboundNode, LazyPlan, OutboundNode, RecordLink, RecordPlan};
use crate::schema::{RecordDeclaration, RecordKind, RecordRef, TypeDescriptor, TypeSignature};

/// Plans produced by one build.
pub(crate) struct Built {
    pub(crate) root: Arc<RecordPlan>,
    /// Nested datamodel plans, to be published with the root.
    pub(crate) staged: Vec<(TypeId, Arc<RecordPlan>)>,
}

/// Walks record declarations and derives their conversion plans.
///
/// Works on a snapshot of the context's hooks and extensions. Nothing is
/// published while building; the caller publishes `Built` only when the
/// whole build succeeded.
pub(crate) struct PlanBuilder<'a> {
    context: &'a Context,
    hooks: Arc<HookRegistry>,
    extensions: Arc<[Extension]>,
    in_progress: Vec<TypeId>,
    staged: Vec<(TypeId, Arc<RecordPlan>)>,
    /// Plain record plans finished during this build.
    plain: Vec<(TypeId, Arc<RecordPlan>)>,
    /// Lazy links created during this build, one per plain record type.
    lazy: Vec<(TypeId, Arc<LazyPlan>)>,
    /// The lazy link whose plan this build produces, if any.
    resuming: Option<(TypeId, Weak<LazyPlan>)>,
}

impl<'a> PlanBuilder<'a> {
    pub(crate) fn new(context: &'a Context) -> Self {
        Self::with_snapshot(context, Arc::new(context.hooks()), context.extensions().into(), None)
    }

    /// Builder for the plan behind `link`, using the hooks and extensions
    /// captured when the link was created.
    pub(crate) fn resuming(context: &'a Context, link: &Arc<LazyPlan>) -> Self {
        Self::with_snapshot(
            context,
            Arc::clone(&link.hooks),
            Arc::clone(&link.extensions),
            Some((link.record.type_id(), Arc::downgrade(link))),
        )
    }

    fn with_snapshot(
        context: &'a Context,
        hooks: Arc<HookRegistry>,
        extensions: Arc<[Extension]>,
        resuming: Option<(TypeId, Weak<LazyPlan>)>,
    ) -> Self {
        Self {
            context,
            hooks,
            extensions,
            in_progress: Vec::new(),
            staged: Vec::new(),
            plain: Vec::new(),
            lazy: Vec::new(),
            resuming,
        }
    }

    pub(crate) fn build(mut self, record: &RecordRef) -> Result<Built, DatamodelError> {
        let root = self.build_record(record)?;
        Ok(Built {
            root,
            staged: self.staged,
        })
    }

    fn build_record(&mut self, record: &RecordRef) -> Result<Arc<RecordPlan>, DatamodelError> {
        let declaration = record.declaration();
        let signature = declaration.signature();
        let options = extension::apply(&self.extensions, &declaration.options)
            .retain_recognised(signature.as_str());

        self.in_progress.push(record.type_id());
        let fields = self.build_fields(&declaration, &signature);
        self.in_progress.pop();
        let fields = fields?;

        tracing::info!(
            record = %signature,
            kind = ?record.kind(),
            fields = fields.len(),
            frozen = options.frozen(),
            "record plan built"
        );

        Ok(Arc::new(RecordPlan {
            signature,
            kind: record.kind(),
            options,
            fields,
        }))
    }

    fn build_fields(
        &mut self,
        declaration: &RecordDeclaration,
        owner: &TypeSignature,
    ) -> Result<Vec<FieldPlan>, DatamodelError> {
        declaration
            .fields
            .iter()
            .map(|decl| {
                let inbound = self.inbound(&decl.descriptor, owner)?;
                let outbound = self.outbound(&decl.descriptor, owner)?;
                Ok(FieldPlan {
                    name: decl.name,
                    signature: decl.descriptor.signature(),
                    inbound,
                    outbound,
                    default: decl.default,
                    init: decl.init,
                })
            })
            .collect()
    }

    /// Inbound node for one descriptor. A registered hook wins over the
    /// structural rule; below a hook nothing is walked.
    fn inbound(&mut self, desc: &TypeDescriptor, owner: &TypeSignature) -> Result<InboundNode, DatamodelError> {
        let signature = desc.signature();
        if let Some(hook) = self.hooks.lookup_inbound(signature.as_str()) {
            return Ok(InboundNode::Hook { signature, hook });
        }

        let node = match desc {
            TypeDescriptor::Optional(inner) => InboundNode::Optional(Box::new(self.inbound(inner, owner)?)),
            TypeDescriptor::Union(arms) => InboundNode::Union {
                arms: arms
                    .iter()
                    .map(|arm| self.inbound(arm, owner))
                    .collect::<Result<_, _>>()?,
                signature,
            },
            TypeDescriptor::Sequence { inner, .. } => InboundNode::Sequence(Box::new(self.inbound(inner, owner)?)),
            TypeDescriptor::SetLike { inner, .. } => InboundNode::Set(Box::new(self.inbound(inner, owner)?)),
            TypeDescriptor::Mapping { key, value, .. } => InboundNode::Mapping {
                key: Box::new(self.inbound(key, owner)?),
                value: Box::new(self.inbound(value, owner)?),
            },
            TypeDescriptor::FixedTuple(items) => InboundNode::Tuple(
                items
                    .iter()
                    .map(|item| self.inbound(item, owner))
                    .collect::<Result<_, _>>()?,
            ),
            TypeDescriptor::NestedRecord(record) => InboundNode::Record(self.record_link(record)?),
            TypeDescriptor::Primitive(_)
            | TypeDescriptor::Any
            | TypeDescriptor::Temporal(_)
            | TypeDescriptor::Custom(_) => return Err(unresolvable(owner, signature, Direction::Inbound)),
        };
        Ok(node)
    }

    /// Outbound counterpart of `inbound`.
    fn outbound(&mut self, desc: &TypeDescriptor, owner: &TypeSignature) -> Result<OutboundNode, DatamodelError> {
        let signature = desc.signature();
        if let Some(hook) = self.hooks.lookup_outbound(signature.as_str()) {
            return Ok(OutboundNode::Hook { signature, hook });
        }

        let node = match desc {
            TypeDescriptor::Optional(inner) => OutboundNode::Optional(Box::new(self.outbound(inner, owner)?)),
            TypeDescriptor::Union(arms) => OutboundNode::Union {
                arms: arms
                    .iter()
                    .map(|arm| self.outbound(arm, owner))
                    .collect::<Result<_, _>>()?,
                signature,
            },
            TypeDescriptor::Sequence { inner, .. } => OutboundNode::Sequence(Box::new(self.outbound(inner, owner)?)),
            TypeDescriptor::SetLike { inner, .. } => OutboundNode::Set(Box::new(self.outbound(inner, owner)?)),
            TypeDescriptor::Mapping { key, value, .. } => OutboundNode::Mapping {
                key: Box::new(self.outbound(key, owner)?),
                value: Box::new(self.outbound(value, owner)?),
            },
            TypeDescriptor::FixedTuple(items) => OutboundNode::Tuple(
                items
                    .iter()
                    .map(|item| self.outbound(item, owner))
                    .collect::<Result<_, _>>()?,
            ),
            TypeDescriptor::NestedRecord(record) => OutboundNode::Record(self.record_link(record)?),
            TypeDescriptor::Primitive(_)
            | TypeDescriptor::Any
            | TypeDescriptor::Temporal(_)
            | TypeDescriptor::Custom(_) => return Err(unresolvable(owner, signature, Direction::Outbound)),
        };
        Ok(node)
    }

    fn record_link(&mut self, record: &RecordRef) -> Result<RecordLink, DatamodelError> {
        let type_id = record.type_id();
        if self.in_progress.contains(&type_id) {
            return Ok(match record.kind() {
                RecordKind::Datamodel => RecordLink::Deferred(record.clone()),
                RecordKind::Plain => self.lazy_link(record),
            });
        }

        match record.kind() {
            RecordKind::Datamodel => {
                if let Some((_, plan)) = self.staged.iter().find(|(id, _)| *id == type_id) {
                    return Ok(RecordLink::Shared(Arc::clone(plan)));
                }
                if let Some(plan) = self.context.cached_plan(type_id) {
                    return Ok(RecordLink::Shared(plan));
                }
                let plan = self.build_record(record)?;
                self.staged.push((type_id, Arc::clone(&plan)));
                Ok(RecordLink::Shared(plan))
            }
            RecordKind::Plain => {
                if let Some((_, plan)) = self.plain.iter().find(|(id, _)| *id == type_id) {
                    return Ok(RecordLink::Shared(Arc::clone(plan)));
                }
                let plan = self.build_record(record)?;
                self.plain.push((type_id, Arc::clone(&plan)));
                Ok(RecordLink::Shared(plan))
            }
        }
    }

    /// Link to a plain record that is still being built. The plan behind
    /// it is derived on first use from this build's snapshot.
    fn lazy_link(&mut self, record: &RecordRef) -> RecordLink {
        let type_id = record.type_id();
        if let Some((_, link)) = self.resuming.as_ref().filter(|(id, _)| *id == type_id) {
            return RecordLink::Cycle(Weak::clone(link));
        }
        if let Some((_, link)) = self.lazy.iter().find(|(id, _)| *id == type_id) {
            return RecordLink::Lazy(Arc::clone(link));
        }
        let link = Arc::new(LazyPlan::new(
            record.clone(),
            Arc::clone(&self.hooks),
            Arc::clone(&self.extensions),
        ));
        self.lazy.push((type_id, Arc::clone(&link)));
        RecordLink::Lazy(link)
    }
}

fn unresolvable(owner: &TypeSignature, signature: TypeSignature, direction: Direction) -> DatamodelError {
    DatamodelError::Unresolvable {
        record: owner.to_string(),
        signature,
        direction,
    }
}
